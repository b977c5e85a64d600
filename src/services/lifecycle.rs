// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride lifecycle transitions driven by the assigned driver.
//!
//! | From            | Event    | To              | Driver row            |
//! |-----------------|----------|-----------------|-----------------------|
//! | Offered         | accept   | Accepted        | Online -> OnTrip      |
//! | Offered         | reject   | Pending         | offer cleared         |
//! | Accepted        | arrive   | ArrivedAtPickup | -                     |
//! | ArrivedAtPickup | start    | Ongoing         | -                     |
//! | Ongoing         | complete | Completed       | OnTrip -> Online      |
//!
//! Every transition is a single compare-and-swap guarded on the current
//! status and the assigned driver. A mismatch is a `Conflict`.

use crate::db::{Assignment, DriverChange, RideStore, RideTransition};
use crate::error::{AppError, Result};
use crate::models::{Caller, DriverAvailability, Ride, RideStatus, Role};
use std::sync::Arc;

#[derive(Clone)]
pub struct RideLifecycle {
    store: Arc<dyn RideStore>,
}

impl RideLifecycle {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Accept an offer. The ride and the driver row change together.
    pub async fn accept(&self, driver_id: &str, ride_id: &str) -> Result<Ride> {
        let transition = RideTransition::new(ride_id, RideStatus::Offered, RideStatus::Accepted)
            .expect_driver(Some(driver_id))
            .with_driver_change(DriverChange {
                driver_id: driver_id.to_string(),
                expected: DriverAvailability::Online,
                expected_ride: Some(ride_id.to_string()),
                availability: DriverAvailability::OnTrip,
                current_ride_id: Some(ride_id.to_string()),
            });

        let ride = self.store.compare_and_swap(transition).await?;
        tracing::info!(ride_id, driver_id, "Ride accepted");
        Ok(ride)
    }

    /// Reject an offer and return the ride to the pending pool.
    ///
    /// `auto` marks a rejection caused by the driver-side countdown expiring.
    /// The state change is identical either way.
    pub async fn reject(&self, driver_id: &str, ride_id: &str, auto: bool) -> Result<Ride> {
        let transition = RideTransition::new(ride_id, RideStatus::Offered, RideStatus::Pending)
            .expect_driver(Some(driver_id))
            .assign(Assignment::Clear)
            .with_driver_change(DriverChange {
                driver_id: driver_id.to_string(),
                expected: DriverAvailability::Online,
                expected_ride: Some(ride_id.to_string()),
                availability: DriverAvailability::Online,
                current_ride_id: None,
            });

        let ride = self.store.compare_and_swap(transition).await?;
        if auto {
            tracing::info!(ride_id, driver_id, "Offer timed out, ride returned to pool");
        } else {
            tracing::info!(ride_id, driver_id, "Offer rejected, ride returned to pool");
        }
        Ok(ride)
    }

    pub async fn mark_arrived(&self, driver_id: &str, ride_id: &str) -> Result<Ride> {
        let transition =
            RideTransition::new(ride_id, RideStatus::Accepted, RideStatus::ArrivedAtPickup)
                .expect_driver(Some(driver_id));

        let ride = self.store.compare_and_swap(transition).await?;
        tracing::info!(ride_id, driver_id, "Driver arrived at pickup");
        Ok(ride)
    }

    pub async fn start(&self, driver_id: &str, ride_id: &str) -> Result<Ride> {
        let transition =
            RideTransition::new(ride_id, RideStatus::ArrivedAtPickup, RideStatus::Ongoing)
                .expect_driver(Some(driver_id));

        let ride = self.store.compare_and_swap(transition).await?;
        tracing::info!(ride_id, driver_id, "Ride started");
        Ok(ride)
    }

    /// Complete the ride and put the driver back Online.
    pub async fn complete(&self, driver_id: &str, ride_id: &str) -> Result<Ride> {
        let transition = RideTransition::new(ride_id, RideStatus::Ongoing, RideStatus::Completed)
            .expect_driver(Some(driver_id))
            .with_driver_change(DriverChange {
                driver_id: driver_id.to_string(),
                expected: DriverAvailability::OnTrip,
                expected_ride: Some(ride_id.to_string()),
                availability: DriverAvailability::Online,
                current_ride_id: None,
            });

        let ride = self.store.compare_and_swap(transition).await?;
        tracing::info!(ride_id, driver_id, "Ride completed");
        Ok(ride)
    }

    /// Cancel a non-terminal ride.
    ///
    /// The requester cancels as `CancelledByUser`, the assigned driver as
    /// `CancelledByDriver`. An attached driver is released back to Online in
    /// the same write.
    pub async fn cancel(&self, caller: &Caller, ride_id: &str) -> Result<Ride> {
        let ride = self
            .store
            .get_ride(ride_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ride {} not found", ride_id)))?;

        let to = match caller.role {
            Role::Passenger if ride.requester_id == caller.id => RideStatus::CancelledByUser,
            Role::Driver if ride.driver_id.as_deref() == Some(caller.id.as_str()) => {
                RideStatus::CancelledByDriver
            }
            _ => {
                return Err(AppError::Forbidden(format!(
                    "Not authorized to cancel ride {}",
                    ride_id
                )))
            }
        };

        if ride.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Ride {} is already {}",
                ride_id, ride.status
            )));
        }

        let mut transition = RideTransition::new(ride_id, ride.status, to)
            .expect_driver(ride.driver_id.as_deref());

        if let Some(driver_id) = ride.driver_id.as_deref() {
            let expected = if ride.status.is_on_trip() {
                DriverAvailability::OnTrip
            } else {
                DriverAvailability::Online
            };
            transition = transition.with_driver_change(DriverChange {
                driver_id: driver_id.to_string(),
                expected,
                expected_ride: Some(ride_id.to_string()),
                availability: DriverAvailability::Online,
                current_ride_id: None,
            });
        }

        let cancelled = self.store.compare_and_swap(transition).await?;
        tracing::info!(
            ride_id,
            caller_id = %caller.id,
            from = %ride.status,
            to = %cancelled.status,
            "Ride cancelled"
        );
        Ok(cancelled)
    }
}
