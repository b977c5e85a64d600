// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ride model and its lifecycle statuses.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Status of a ride along its lifecycle.
///
/// ```text
/// Pending -> Offered -> Accepted -> ArrivedAtPickup -> Ongoing -> Completed
///              |
///              +-> Pending (reject / timeout)
/// any non-terminal -> CancelledByUser | CancelledByDriver
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RideStatus {
    Pending,
    Offered,
    Accepted,
    ArrivedAtPickup,
    Ongoing,
    Completed,
    CancelledByUser,
    CancelledByDriver,
}

impl RideStatus {
    /// Stored string form (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Offered => "offered",
            RideStatus::Accepted => "accepted",
            RideStatus::ArrivedAtPickup => "arrived_at_pickup",
            RideStatus::Ongoing => "ongoing",
            RideStatus::Completed => "completed",
            RideStatus::CancelledByUser => "cancelled_by_user",
            RideStatus::CancelledByDriver => "cancelled_by_driver",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RideStatus::Completed | RideStatus::CancelledByUser | RideStatus::CancelledByDriver
        )
    }

    /// Whether a driver is committed to the ride (availability is OnTrip).
    pub fn is_on_trip(self) -> bool {
        matches!(
            self,
            RideStatus::Accepted | RideStatus::ArrivedAtPickup | RideStatus::Ongoing
        )
    }

    /// Edges of the lifecycle graph. Anything else is rejected by the store.
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        use RideStatus::*;
        match (self, next) {
            (Pending, Offered)
            | (Offered, Accepted)
            | (Offered, Pending)
            | (Accepted, ArrivedAtPickup)
            | (ArrivedAtPickup, Ongoing)
            | (Ongoing, Completed) => true,
            (from, CancelledByUser | CancelledByDriver) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tiered service level chosen by the passenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RideCategory {
    Standard,
    Premium,
    Vip,
}

/// A pickup or dropoff point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Place {
    #[validate(length(min = 1, max = 256))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
}

/// Booking request submitted by a passenger.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRide {
    #[validate(nested)]
    pub pickup: Place,
    #[validate(nested)]
    pub dropoff: Place,
    pub category: RideCategory,
    /// Declared distance in kilometers
    #[validate(range(exclusive_min = 0.0))]
    pub distance_km: f64,
    /// Fare computed by the client-side fare service
    #[validate(range(min = 0.0))]
    pub fare: f64,
    #[validate(range(min = 1, max = 8))]
    pub passengers: u32,
    /// Label of the service screen the booking came from (e.g. "Airport Transfer")
    #[validate(length(max = 100))]
    pub originating_service: Option<String>,
}

/// Stored ride record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Ride {
    /// Ride ID (also used as document ID)
    pub id: String,
    /// Passenger who requested the ride
    pub requester_id: String,
    /// Driver currently holding the ride (offer or trip)
    pub driver_id: Option<String>,
    pub pickup: Place,
    pub dropoff: Place,
    pub category: RideCategory,
    pub distance_km: f64,
    pub fare: f64,
    pub passengers: u32,
    pub originating_service: Option<String>,
    pub status: RideStatus,
    /// When the passenger requested the ride (RFC3339, millisecond precision)
    pub requested_at: String,
    pub updated_at: String,
    pub accepted_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl Ride {
    /// Build a freshly requested ride with a generated ID.
    pub fn pending(requester_id: &str, request: NewRide, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            requester_id: requester_id.to_string(),
            driver_id: None,
            pickup: request.pickup,
            dropoff: request.dropoff,
            category: request.category,
            distance_km: request.distance_km,
            fare: request.fare,
            passengers: request.passengers,
            originating_service: request.originating_service,
            status: RideStatus::Pending,
            requested_at: now.to_string(),
            updated_at: now.to_string(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    /// Whether the caller is the requester or the assigned driver.
    pub fn is_party(&self, caller_id: &str) -> bool {
        self.requester_id == caller_id || self.driver_id.as_deref() == Some(caller_id)
    }
}
