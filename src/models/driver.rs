// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Driver availability record.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Whether a driver can be offered rides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DriverAvailability {
    Offline,
    Online,
    OnTrip,
}

impl std::fmt::Display for DriverAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DriverAvailability::Offline => "offline",
            DriverAvailability::Online => "online",
            DriverAvailability::OnTrip => "on_trip",
        })
    }
}

/// One per driver. Keyed by driver ID.
///
/// `current_ride_id` is set while the driver holds an offer (availability
/// Online) and while on a trip (availability OnTrip).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DriverRecord {
    pub driver_id: String,
    pub availability: DriverAvailability,
    pub current_ride_id: Option<String>,
    pub updated_at: String,
}

impl DriverRecord {
    /// Record for a newly provisioned driver.
    pub fn provisioned(driver_id: &str, now: &str) -> Self {
        Self {
            driver_id: driver_id.to_string(),
            availability: DriverAvailability::Offline,
            current_ride_id: None,
            updated_at: now.to_string(),
        }
    }

    /// Whether the driver holds an offer they have not answered yet.
    pub fn has_open_offer(&self) -> bool {
        self.availability == DriverAvailability::Online && self.current_ride_id.is_some()
    }
}
