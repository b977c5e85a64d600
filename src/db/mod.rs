// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer for rides and driver availability.
//!
//! Every mutation of a ride goes through [`RideStore::compare_and_swap`],
//! which applies a [`RideTransition`] only if the stored ride still matches
//! its expected status and driver. A transition may carry a [`DriverChange`]
//! that is checked and applied in the same atomic unit.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::{AppError, Result};
use crate::models::{DriverAvailability, DriverRecord, NewRide, Ride, RideStatus};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const RIDES: &str = "rides";
    pub const DRIVERS: &str = "drivers";
}

/// Storage backend for rides and driver availability rows.
#[async_trait]
pub trait RideStore: Send + Sync {
    /// Insert a new ride in `Pending` status with a generated ID.
    async fn create_ride(&self, requester_id: &str, request: NewRide) -> Result<Ride>;

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>>;

    /// Pending rides, oldest request first.
    async fn list_pending(&self, limit: usize) -> Result<Vec<Ride>>;

    /// Most recently requested non-terminal ride of a passenger.
    async fn current_ride_for_passenger(&self, requester_id: &str) -> Result<Option<Ride>>;

    /// Atomically apply `transition` if the stored ride matches its guards.
    ///
    /// Fails with `NotFound` if the ride (or the driver named by the coupled
    /// change) does not exist and with `Conflict` if any guard mismatches. On
    /// failure nothing is written.
    async fn compare_and_swap(&self, transition: RideTransition) -> Result<Ride>;

    /// Insert an availability row. `Conflict` if the driver already has one.
    async fn insert_driver(&self, record: DriverRecord) -> Result<DriverRecord>;

    async fn get_driver(&self, driver_id: &str) -> Result<Option<DriverRecord>>;

    /// Atomically apply a driver-only change (explicit availability toggles).
    async fn update_availability(&self, change: DriverChange) -> Result<DriverRecord>;
}

/// What happens to a ride's driver assignment during a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Keep,
    Assign(String),
    Clear,
}

/// A guarded status change of one ride.
#[derive(Debug, Clone)]
pub struct RideTransition {
    pub ride_id: String,
    /// Status the ride must currently have
    pub from: RideStatus,
    /// Driver the ride must currently be assigned to (`None` = unassigned)
    pub expected_driver: Option<String>,
    pub to: RideStatus,
    pub assignment: Assignment,
    /// Driver row updated in the same atomic unit
    pub driver_change: Option<DriverChange>,
}

impl RideTransition {
    pub fn new(ride_id: &str, from: RideStatus, to: RideStatus) -> Self {
        Self {
            ride_id: ride_id.to_string(),
            from,
            expected_driver: None,
            to,
            assignment: Assignment::Keep,
            driver_change: None,
        }
    }

    pub fn expect_driver(mut self, driver_id: Option<&str>) -> Self {
        self.expected_driver = driver_id.map(str::to_string);
        self
    }

    pub fn assign(mut self, assignment: Assignment) -> Self {
        self.assignment = assignment;
        self
    }

    pub fn with_driver_change(mut self, change: DriverChange) -> Self {
        self.driver_change = Some(change);
        self
    }

    /// Verify the guards against the currently stored ride.
    pub fn check(&self, ride: &Ride) -> Result<()> {
        if !self.from.can_transition_to(self.to) {
            return Err(AppError::Conflict(format!(
                "Illegal ride transition {} -> {}",
                self.from, self.to
            )));
        }
        if ride.status != self.from {
            return Err(AppError::Conflict(format!(
                "Ride {} is {}, expected {}",
                ride.id, ride.status, self.from
            )));
        }
        if ride.driver_id != self.expected_driver {
            return Err(AppError::Conflict(format!(
                "Ride {} is not assigned to the calling driver",
                ride.id
            )));
        }
        Ok(())
    }

    /// Apply the change to a ride that passed [`RideTransition::check`].
    pub fn apply(&self, ride: &mut Ride, now: &str) {
        ride.status = self.to;
        match &self.assignment {
            Assignment::Keep => {}
            Assignment::Assign(driver_id) => ride.driver_id = Some(driver_id.clone()),
            Assignment::Clear => ride.driver_id = None,
        }
        let stamp = Some(now.to_string());
        match self.to {
            RideStatus::Accepted => ride.accepted_at = stamp,
            RideStatus::Ongoing => ride.started_at = stamp,
            RideStatus::Completed => ride.completed_at = stamp,
            RideStatus::CancelledByUser | RideStatus::CancelledByDriver => {
                ride.cancelled_at = stamp
            }
            _ => {}
        }
        ride.updated_at = now.to_string();
    }
}

/// A guarded change of one driver's availability row.
#[derive(Debug, Clone)]
pub struct DriverChange {
    pub driver_id: String,
    /// Availability the driver must currently have
    pub expected: DriverAvailability,
    /// Ride the driver must currently hold (`None` = no ride)
    pub expected_ride: Option<String>,
    pub availability: DriverAvailability,
    pub current_ride_id: Option<String>,
}

impl DriverChange {
    pub fn check(&self, record: &DriverRecord) -> Result<()> {
        if record.availability != self.expected {
            return Err(AppError::Conflict(format!(
                "Driver {} is {}, expected {}",
                record.driver_id, record.availability, self.expected
            )));
        }
        if record.current_ride_id != self.expected_ride {
            return Err(AppError::Conflict(format!(
                "Driver {} holds a different ride",
                record.driver_id
            )));
        }
        Ok(())
    }

    pub fn apply(&self, record: &mut DriverRecord, now: &str) {
        record.availability = self.availability;
        record.current_ride_id = self.current_ride_id.clone();
        record.updated_at = now.to_string();
    }
}
