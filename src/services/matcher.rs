// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offer matching: hand the oldest pending ride to a polling driver.
//!
//! Matching is first-requested-first-served with no proximity weighting.
//! The only correctness-critical step is the compare-and-swap from
//! `Pending` to `Offered`, which also records the ride on the driver's
//! availability row so a driver never holds two offers.

use crate::db::{Assignment, DriverChange, RideStore, RideTransition};
use crate::error::Result;
use crate::models::{DriverAvailability, Ride, RideStatus};
use std::sync::Arc;

/// Selects rides to offer to polling drivers.
#[derive(Clone)]
pub struct OfferMatcher {
    store: Arc<dyn RideStore>,
}

impl OfferMatcher {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Find at most one ride to offer `driver_id`.
    ///
    /// Returns `None` when the driver is unknown or not Online, when no ride
    /// is pending, or when another driver claimed the selected ride first.
    /// A driver that still holds an unanswered offer gets that same ride
    /// back. Safe to call at any frequency.
    pub async fn poll_offer(&self, driver_id: &str) -> Result<Option<Ride>> {
        let Some(driver) = self.store.get_driver(driver_id).await? else {
            tracing::debug!(driver_id, "Poll from unknown driver");
            return Ok(None);
        };

        if driver.availability != DriverAvailability::Online {
            return Ok(None);
        }

        if let Some(ride_id) = driver.current_ride_id.as_deref() {
            let open_offer = self.store.get_ride(ride_id).await?.filter(|ride| {
                ride.status == RideStatus::Offered && ride.driver_id.as_deref() == Some(driver_id)
            });
            return Ok(open_offer);
        }

        let Some(candidate) = self.store.list_pending(1).await?.into_iter().next() else {
            return Ok(None);
        };

        let transition = RideTransition::new(&candidate.id, RideStatus::Pending, RideStatus::Offered)
            .assign(Assignment::Assign(driver_id.to_string()))
            .with_driver_change(DriverChange {
                driver_id: driver_id.to_string(),
                expected: DriverAvailability::Online,
                expected_ride: None,
                availability: DriverAvailability::Online,
                current_ride_id: Some(candidate.id.clone()),
            });

        match self.store.compare_and_swap(transition).await {
            Ok(ride) => {
                tracing::info!(ride_id = %ride.id, driver_id, "Ride offered to driver");
                Ok(Some(ride))
            }
            Err(e) if e.is_conflict() => {
                // Claimed by someone else, or the driver changed state meanwhile.
                // The next poll will try again.
                tracing::debug!(ride_id = %candidate.id, driver_id, reason = %e, "Offer lost race");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
