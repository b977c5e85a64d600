// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Passenger-facing ride operations: booking and status reads.

use crate::db::RideStore;
use crate::error::{AppError, Result};
use crate::models::{NewRide, Ride};
use std::sync::Arc;
use validator::Validate;

#[derive(Clone)]
pub struct RideService {
    store: Arc<dyn RideStore>,
}

impl RideService {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Book a ride. It starts Pending and becomes eligible for offers.
    pub async fn create(&self, requester_id: &str, request: NewRide) -> Result<Ride> {
        request.validate()?;

        let ride = self.store.create_ride(requester_id, request).await?;
        tracing::info!(
            ride_id = %ride.id,
            requester_id,
            category = ?ride.category,
            "Ride requested"
        );
        Ok(ride)
    }

    /// Read a ride. Only the requester and the assigned driver may see it.
    ///
    /// The result is a snapshot; a concurrent driver transition may land
    /// immediately after it is taken.
    pub async fn status(&self, caller_id: &str, ride_id: &str) -> Result<Ride> {
        let ride = self
            .store
            .get_ride(ride_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ride {} not found", ride_id)))?;

        if !ride.is_party(caller_id) {
            return Err(AppError::Forbidden(format!(
                "Not authorized to view ride {}",
                ride_id
            )));
        }
        Ok(ride)
    }

    /// The passenger's most recent ride that has not reached a terminal status.
    pub async fn current_for_passenger(&self, requester_id: &str) -> Result<Option<Ride>> {
        self.store.current_ride_for_passenger(requester_id).await
    }
}
