// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Authenticated caller identity passed into every ride operation.

use serde::{Deserialize, Serialize};

/// Which side of the marketplace the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Passenger,
    Driver,
}

/// Caller established at the HTTP boundary (see `middleware::auth`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn passenger(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Passenger,
        }
    }

    pub fn driver(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Driver,
        }
    }
}
