// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Caller-side polling loops.
//!
//! The dispatch core never pushes. Drivers poll for offers and answer them
//! within a countdown; passengers poll their ride's status. These loops
//! drive the core operations on a schedule and hold all client timers.

pub mod driver;
pub mod passenger;

pub use driver::{DriverPollLoop, OfferDecision, OfferHandler, PollOutcome};
pub use passenger::RideTracker;
