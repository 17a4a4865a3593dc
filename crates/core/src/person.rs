// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// A physical person. Reserved for future use; the store accepts the shape
/// but does not persist it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "rev", default)]
    pub revision: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self { id: 0, revision: 0, first_name: first_name.into(), last_name: last_name.into() }
    }
}
