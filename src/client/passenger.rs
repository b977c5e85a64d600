// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Passenger ride tracking by periodic status reads.

use crate::config::Config;
use crate::error::Result;
use crate::models::{Ride, RideStatus};
use crate::services::RideService;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub struct RideTracker {
    rides: RideService,
    caller_id: String,
    ride_id: String,
    interval: Duration,
}

impl RideTracker {
    pub fn new(
        rides: RideService,
        caller_id: impl Into<String>,
        ride_id: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            rides,
            caller_id: caller_id.into(),
            ride_id: ride_id.into(),
            interval: config.ride_status_poll_interval,
        }
    }

    /// Poll until the ride reaches a terminal status and return it.
    ///
    /// `on_change` sees the first snapshot and then every status change.
    /// Store outages are skipped; other errors end tracking.
    pub async fn run<F>(&self, mut on_change: F) -> Result<Ride>
    where
        F: FnMut(&Ride) + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status: Option<RideStatus> = None;

        loop {
            ticker.tick().await;

            let ride = match self.rides.status(&self.caller_id, &self.ride_id).await {
                Ok(ride) => ride,
                Err(e) if e.is_retryable() => {
                    tracing::warn!(ride_id = %self.ride_id, error = %e, "Status poll failed, will retry");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if last_status != Some(ride.status) {
                last_status = Some(ride.status);
                on_change(&ride);
            }

            if ride.status.is_terminal() {
                return Ok(ride);
            }
        }
    }
}
