// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged unions over the streamable/storable domain types.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::hotel::Hotel;
use crate::person::Person;
use crate::reservation::Reservation;

/// The entity families operations can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Hotel,
    Reservation,
    Person,
}

/// One entity of any family. Serializes as the bare entity object; the
/// containing message carries the kind tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Hotel(Hotel),
    Reservation(Reservation),
    Person(Person),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Hotel(_) => EntityKind::Hotel,
            Entity::Reservation(_) => EntityKind::Reservation,
            Entity::Person(_) => EntityKind::Person,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Entity::Hotel(hotel) => hotel.id,
            Entity::Reservation(reservation) => reservation.id,
            Entity::Person(person) => person.id,
        }
    }

    pub fn revision(&self) -> i64 {
        match self {
            Entity::Hotel(hotel) => hotel.revision,
            Entity::Reservation(reservation) => reservation.revision,
            Entity::Person(person) => person.revision,
        }
    }

    /// Deserialize an entity of a known kind from its bare JSON object.
    pub fn from_parts(kind: EntityKind, value: &Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EntityKind::Hotel => Entity::Hotel(serde_json::from_value(value.clone())?),
            EntityKind::Reservation => Entity::Reservation(serde_json::from_value(value.clone())?),
            EntityKind::Person => Entity::Person(serde_json::from_value(value.clone())?),
        })
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entity::Hotel(hotel) => hotel.serialize(serializer),
            Entity::Reservation(reservation) => reservation.serialize(serializer),
            Entity::Person(person) => person.serialize(serializer),
        }
    }
}

/// The entity families a data stream can carry.
///
/// On the wire streams are identified by a small integer (`1` = hotel,
/// `2` = reservation; `0` is reserved for the null stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Hotel,
    Reservation,
}

impl StreamKind {
    pub fn to_wire(self) -> i32 {
        match self {
            StreamKind::Hotel => 1,
            StreamKind::Reservation => 2,
        }
    }

    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            1 => Some(StreamKind::Hotel),
            2 => Some(StreamKind::Reservation),
            _ => None,
        }
    }

    pub fn entity_kind(self) -> EntityKind {
        match self {
            StreamKind::Hotel => EntityKind::Hotel,
            StreamKind::Reservation => EntityKind::Reservation,
        }
    }

    /// Service name of the single-id filter for this kind.
    pub fn by_id_service(self) -> &'static str {
        match self {
            StreamKind::Hotel => "hotel.by_id",
            StreamKind::Reservation => "reservation.by_id",
        }
    }
}

/// A homogeneous batch of stream items.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItems {
    Hotels(Vec<Hotel>),
    Reservations(Vec<Reservation>),
}

impl StreamItems {
    pub fn empty(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Hotel => StreamItems::Hotels(Vec::new()),
            StreamKind::Reservation => StreamItems::Reservations(Vec::new()),
        }
    }

    pub fn kind(&self) -> StreamKind {
        match self {
            StreamItems::Hotels(_) => StreamKind::Hotel,
            StreamItems::Reservations(_) => StreamKind::Reservation,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StreamItems::Hotels(hotels) => hotels.len(),
            StreamItems::Reservations(reservations) => reservations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<i64> {
        match self {
            StreamItems::Hotels(hotels) => hotels.iter().map(|hotel| hotel.id).collect(),
            StreamItems::Reservations(reservations) => {
                reservations.iter().map(|reservation| reservation.id).collect()
            }
        }
    }

    /// Keep only items with the given id.
    pub fn retain_id(&mut self, id: i64) {
        match self {
            StreamItems::Hotels(hotels) => hotels.retain(|hotel| hotel.id == id),
            StreamItems::Reservations(reservations) => {
                reservations.retain(|reservation| reservation.id == id)
            }
        }
    }

    /// Serialize each item to its bare JSON object, for the wire.
    pub fn to_values(&self) -> Result<Vec<Value>, serde_json::Error> {
        match self {
            StreamItems::Hotels(hotels) => hotels.iter().map(serde_json::to_value).collect(),
            StreamItems::Reservations(reservations) => {
                reservations.iter().map(serde_json::to_value).collect()
            }
        }
    }

    /// Deserialize a wire item array of a known kind.
    pub fn from_values(kind: StreamKind, values: Vec<Value>) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            StreamKind::Hotel => StreamItems::Hotels(
                values.into_iter().map(serde_json::from_value).collect::<Result<_, _>>()?,
            ),
            StreamKind::Reservation => StreamItems::Reservations(
                values.into_iter().map(serde_json::from_value).collect::<Result<_, _>>()?,
            ),
        })
    }
}

/// Entity types that can flow through typed data streams.
pub trait Streamable: Sized {
    const KIND: StreamKind;

    fn into_items(items: Vec<Self>) -> StreamItems;
    fn from_items(items: &StreamItems) -> Option<&[Self]>;
    fn entity_id(&self) -> i64;
}

impl Streamable for Hotel {
    const KIND: StreamKind = StreamKind::Hotel;

    fn into_items(items: Vec<Self>) -> StreamItems {
        StreamItems::Hotels(items)
    }

    fn from_items(items: &StreamItems) -> Option<&[Self]> {
        match items {
            StreamItems::Hotels(hotels) => Some(hotels),
            StreamItems::Reservations(_) => None,
        }
    }

    fn entity_id(&self) -> i64 {
        self.id
    }
}

impl Streamable for Reservation {
    const KIND: StreamKind = StreamKind::Reservation;

    fn into_items(items: Vec<Self>) -> StreamItems {
        StreamItems::Reservations(items)
    }

    fn from_items(items: &StreamItems) -> Option<&[Self]> {
        match items {
            StreamItems::Hotels(_) => None,
            StreamItems::Reservations(reservations) => Some(reservations),
        }
    }

    fn entity_id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
