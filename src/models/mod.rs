// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod caller;
pub mod driver;
pub mod ride;

pub use caller::{Caller, Role};
pub use driver::{DriverAvailability, DriverRecord};
pub use ride::{NewRide, Place, Ride, RideCategory, RideStatus};
