// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hotels with their owned room categories and rooms.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for [`Hotel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotelError {
    #[error("duplicate category short code `{0}`")]
    DuplicateShortCode(String),

    #[error("room `{room}` references unknown category `{category}`")]
    UnknownCategory { room: String, category: String },
}

/// Information shared by a set of rooms. The short code is unique within its
/// hotel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCategory {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "rev", default)]
    pub revision: i64,
    pub short_code: String,
    pub name: String,
}

impl RoomCategory {
    pub fn new(short_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: 0, revision: 0, short_code: short_code.into(), name: name.into() }
    }
}

/// A single room, referencing its category by short code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelRoom {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "rev", default)]
    pub revision: i64,
    /// Short code of a category of the same hotel.
    #[serde(rename = "category_id")]
    pub category: String,
    pub name: String,
}

impl HotelRoom {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self { id: 0, revision: 0, category: category.into(), name: name.into() }
    }
}

/// A hotel owning an ordered list of categories and rooms.
///
/// Invariants checked by [`validate`](Hotel::validate): category short codes
/// are unique within the hotel, and every room's category exists in the same
/// hotel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "rev", default)]
    pub revision: i64,
    pub name: String,
    pub categories: Vec<RoomCategory>,
    pub rooms: Vec<HotelRoom>,
}

impl Hotel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: 0, revision: 0, name: name.into(), categories: Vec::new(), rooms: Vec::new() }
    }

    pub fn with_category(mut self, short_code: &str, name: &str) -> Self {
        self.categories.push(RoomCategory::new(short_code, name));
        self
    }

    pub fn with_room(mut self, name: &str, category: &str) -> Self {
        self.rooms.push(HotelRoom::new(name, category));
        self
    }

    pub fn category_by_short_code(&self, short_code: &str) -> Option<&RoomCategory> {
        self.categories.iter().find(|category| category.short_code == short_code)
    }

    pub fn validate(&self) -> Result<(), HotelError> {
        for (index, category) in self.categories.iter().enumerate() {
            let duplicate = self.categories[..index]
                .iter()
                .any(|other| other.short_code == category.short_code);
            if duplicate {
                return Err(HotelError::DuplicateShortCode(category.short_code.clone()));
            }
        }
        for room in &self.rooms {
            if self.category_by_short_code(&room.category).is_none() {
                return Err(HotelError::UnknownCategory {
                    room: room.name.clone(),
                    category: room.category.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "hotel_tests.rs"]
mod tests;
