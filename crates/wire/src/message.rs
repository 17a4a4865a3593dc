// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol messages.
//!
//! `id` fields always reference the client-assigned stream/task id; the
//! server keeps its own ids internally and correlates by the client's.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lodge_core::{EntityKind, Operation, TaskResult, TaskResultStatus};

/// Default TCP port of the lodge server.
pub const DEFAULT_PORT: u16 = 8081;

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateStream {
        id: u64,
        /// Stream type as a wire integer (`1` = hotel, `2` = reservation).
        #[serde(rename = "type")]
        stream_type: i32,
        service: String,
        options: Value,
    },
    RemoveStream {
        id: u64,
    },
    ScheduleOperations {
        id: u64,
        operations: Vec<Operation>,
    },
}

/// Messages sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServerMessage {
    StreamInitialize {
        id: u64,
    },
    StreamAdd {
        id: u64,
        #[serde(rename = "type")]
        kind: EntityKind,
        items: Vec<Value>,
    },
    StreamUpdate {
        id: u64,
        #[serde(rename = "type")]
        kind: EntityKind,
        items: Vec<Value>,
    },
    StreamRemove {
        id: u64,
        items: Vec<i64>,
    },
    StreamClear {
        id: u64,
    },
    TaskResults {
        id: u64,
        results: Vec<WireTaskResult>,
    },
}

/// Task result as encoded on the wire: integer status + payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTaskResult {
    /// `0` = successful, `1` = error.
    pub status: i32,
    pub data: Value,
}

impl From<&TaskResult> for WireTaskResult {
    fn from(result: &TaskResult) -> Self {
        Self { status: result.status.to_wire(), data: result.payload.clone() }
    }
}

impl WireTaskResult {
    /// Decode, treating unknown status codes as errors.
    pub fn into_task_result(self) -> TaskResult {
        TaskResult {
            status: TaskResultStatus::from_wire(self.status).unwrap_or(TaskResultStatus::Error),
            payload: self.data,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
