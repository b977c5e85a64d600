// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Driver availability tracking.
//!
//! Drivers toggle between Offline and Online themselves. OnTrip is entered
//! and left only through ride acceptance and completion.

use crate::db::{DriverChange, RideStore};
use crate::error::{AppError, Result};
use crate::models::{DriverAvailability, DriverRecord};
use crate::time_utils::now_rfc3339;
use std::sync::Arc;

#[derive(Clone)]
pub struct AvailabilityTracker {
    store: Arc<dyn RideStore>,
}

impl AvailabilityTracker {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Create the availability row for a new driver account (Offline).
    pub async fn provision(&self, driver_id: &str) -> Result<DriverRecord> {
        let record = self
            .store
            .insert_driver(DriverRecord::provisioned(driver_id, &now_rfc3339()))
            .await?;
        tracing::info!(driver_id, "Driver provisioned");
        Ok(record)
    }

    /// Current availability plus the ride the driver holds, if any.
    pub async fn get(&self, driver_id: &str) -> Result<DriverRecord> {
        self.store
            .get_driver(driver_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", driver_id)))
    }

    /// Explicit Online/Offline toggle requested by the driver.
    ///
    /// Requesting the current state is a no-op. Going Offline fails with
    /// `Conflict` while on a trip or while holding an unanswered offer.
    pub async fn set(
        &self,
        driver_id: &str,
        requested: DriverAvailability,
    ) -> Result<DriverRecord> {
        let current = self.get(driver_id).await?;

        let from = match (requested, current.availability) {
            (DriverAvailability::OnTrip, _) => {
                return Err(AppError::BadRequest(
                    "OnTrip is set by accepting a ride".to_string(),
                ))
            }
            (requested, now) if requested == now && current.current_ride_id.is_none() => {
                return Ok(current)
            }
            (_, DriverAvailability::OnTrip) => {
                return Err(AppError::Conflict(
                    "Cannot change availability while on a trip. Please complete your current ride first."
                        .to_string(),
                ))
            }
            (DriverAvailability::Offline, _) if current.has_open_offer() => {
                return Err(AppError::Conflict(
                    "Cannot go offline with an unanswered ride offer".to_string(),
                ))
            }
            (DriverAvailability::Online, _) if current.has_open_offer() => return Ok(current),
            (_, now) => now,
        };

        let record = self
            .store
            .update_availability(DriverChange {
                driver_id: driver_id.to_string(),
                expected: from,
                expected_ride: None,
                availability: requested,
                current_ride_id: None,
            })
            .await?;

        tracing::info!(driver_id, from = %from, to = %requested, "Driver availability changed");
        Ok(record)
    }
}
