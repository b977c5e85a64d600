// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ride-Dispatch: pull-based ride matching and lifecycle tracking
//!
//! Passengers book rides, drivers poll for offers and answer them within a
//! countdown, and every state change is a compare-and-swap on the ride
//! record and the driver's availability row.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::RideStore;
use services::{AvailabilityTracker, OfferMatcher, RideLifecycle, RideService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RideStore>,
    pub rides: RideService,
    pub matcher: OfferMatcher,
    pub lifecycle: RideLifecycle,
    pub availability: AvailabilityTracker,
}

impl AppState {
    /// Wire every service to the same store.
    pub fn new(config: Config, store: Arc<dyn RideStore>) -> Self {
        Self {
            config,
            rides: RideService::new(store.clone()),
            matcher: OfferMatcher::new(store.clone()),
            lifecycle: RideLifecycle::new(store.clone()),
            availability: AvailabilityTracker::new(store.clone()),
            store,
        }
    }
}
