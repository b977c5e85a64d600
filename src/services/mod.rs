// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod availability;
pub mod lifecycle;
pub mod matcher;
pub mod rides;

pub use availability::AvailabilityTracker;
pub use lifecycle::RideLifecycle;
pub use matcher::OfferMatcher;
pub use rides::RideService;
