// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reservations: a non-empty contiguous sequence of (room, date-range) atoms.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for [`Reservation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error("reservation has no atoms")]
    NoAtoms,

    #[error("atom date range [{from}, {to}) is empty")]
    EmptyDateRange { from: NaiveDate, to: NaiveDate },

    #[error("atoms are not contiguous at {expected} (found {found})")]
    NotContiguous { expected: NaiveDate, found: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Unknown,
    /// Used for temporary selections in the planning board; never persisted;
    /// the store coerces it to `New`.
    Temporary,
    New,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Archived,
}

/// One single reserved room over a given `[from, to)` date period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationAtom {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "rev", default)]
    pub revision: i64,
    pub room_id: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReservationAtom {
    pub fn new(room_id: i64, from: NaiveDate, to: NaiveDate) -> Self {
        Self { id: 0, revision: 0, room_id, from, to }
    }
}

/// A reservation over a date period, possibly changing rooms mid-stay.
///
/// Room changes are represented by multiple atoms whose date ranges form a
/// contiguous sequence: `atoms[i + 1].from == atoms[i].to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "rev", default)]
    pub revision: i64,
    pub description: String,
    pub status: ReservationStatus,
    pub adults: u32,
    pub children: u32,
    pub atoms: Vec<ReservationAtom>,
}

impl Reservation {
    pub fn new(description: impl Into<String>, room_id: i64, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            id: 0,
            revision: 0,
            description: description.into(),
            status: ReservationStatus::Unknown,
            adults: 0,
            children: 0,
            atoms: vec![ReservationAtom::new(room_id, from, to)],
        }
    }

    pub fn with_status(mut self, status: ReservationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_occupancy(mut self, adults: u32, children: u32) -> Self {
        self.adults = adults;
        self.children = children;
        self
    }

    pub fn add_atom(&mut self, room_id: i64, from: NaiveDate, to: NaiveDate) {
        self.atoms.push(ReservationAtom::new(room_id, from, to));
    }

    /// Append an atom continuing from the end of the last one.
    pub fn add_continuation(&mut self, room_id: i64, to: NaiveDate) {
        if let Some(last) = self.atoms.last() {
            let from = last.to;
            self.atoms.push(ReservationAtom::new(room_id, from, to));
        }
    }

    /// The overall `[from, to)` range covered by the atoms.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.atoms.first(), self.atoms.last()) {
            (Some(first), Some(last)) => Some((first.from, last.to)),
            _ => None,
        }
    }

    /// Number of nights covered by the reservation.
    pub fn length(&self) -> i64 {
        self.date_range().map_or(0, |(from, to)| (to - from).num_days())
    }

    pub fn validate(&self) -> Result<(), ReservationError> {
        if self.atoms.is_empty() {
            return Err(ReservationError::NoAtoms);
        }
        for atom in &self.atoms {
            if atom.from >= atom.to {
                return Err(ReservationError::EmptyDateRange { from: atom.from, to: atom.to });
            }
        }
        for pair in self.atoms.windows(2) {
            if pair[1].from != pair[0].to {
                return Err(ReservationError::NotContiguous {
                    expected: pair[0].to,
                    found: pair[1].from,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "reservation_tests.rs"]
mod tests;
