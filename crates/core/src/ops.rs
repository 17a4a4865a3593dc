// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation operations and their per-operation outcomes.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;

use crate::entity::{Entity, EntityKind};

/// Failures decoding the operation envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A single mutation request.
///
/// Operations are batched into ordered groups that execute as one
/// transaction: either all apply and all stream deltas publish, or none do.
///
/// The JSON envelope is `{op, t?, o?}` where `op` discriminates the variant
/// and `t` names the entity family for `store`/`update`/`delete`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Drop and recreate the whole store.
    EraseAllData,
    /// Persist a new entity; the store assigns its id and sets revision 1.
    StoreNew(Entity),
    /// Replace an entity; fails without side effect on a revision mismatch.
    Update(Entity),
    /// Remove the entity of the given family and id.
    Delete(EntityKind, i64),
}

impl Operation {
    fn to_value(&self) -> Value {
        match self {
            Operation::EraseAllData => json!({ "op": "erase_all_data" }),
            Operation::StoreNew(entity) => {
                json!({ "op": "store", "t": entity.kind(), "o": entity })
            }
            Operation::Update(entity) => {
                json!({ "op": "update", "t": entity.kind(), "o": entity })
            }
            Operation::Delete(kind, id) => json!({ "op": "delete", "t": kind, "o": id }),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let op = value
            .get("op")
            .and_then(Value::as_str)
            .ok_or(CodecError::MissingField("op"))?;
        match op {
            "erase_all_data" => Ok(Operation::EraseAllData),
            "store" | "update" => {
                let kind = entity_kind(value)?;
                let payload = value.get("o").ok_or(CodecError::MissingField("o"))?;
                let entity = Entity::from_parts(kind, payload)?;
                Ok(match op {
                    "store" => Operation::StoreNew(entity),
                    _ => Operation::Update(entity),
                })
            }
            "delete" => {
                let kind = entity_kind(value)?;
                let id = value
                    .get("o")
                    .and_then(Value::as_i64)
                    .ok_or(CodecError::MissingField("o"))?;
                Ok(Operation::Delete(kind, id))
            }
            other => Err(CodecError::UnknownOperation(other.to_string())),
        }
    }
}

fn entity_kind(value: &Value) -> Result<EntityKind, CodecError> {
    let tag = value.get("t").ok_or(CodecError::MissingField("t"))?;
    Ok(serde_json::from_value(tag.clone())?)
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Operation::from_value(&value).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResultStatus {
    Successful,
    Error,
}

impl TaskResultStatus {
    /// Wire encoding: `0` = successful, `1` = error.
    pub fn to_wire(self) -> i32 {
        match self {
            TaskResultStatus::Successful => 0,
            TaskResultStatus::Error => 1,
        }
    }

    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            0 => Some(TaskResultStatus::Successful),
            1 => Some(TaskResultStatus::Error),
            _ => None,
        }
    }
}

/// Outcome of one operation within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskResultStatus,
    pub payload: Value,
}

impl TaskResult {
    pub fn success(payload: Value) -> Self {
        Self { status: TaskResultStatus::Successful, payload }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            status: TaskResultStatus::Error,
            payload: json!({ "message": message.to_string() }),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == TaskResultStatus::Successful
    }
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
