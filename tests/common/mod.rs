// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use ride_dispatch::config::Config;
use ride_dispatch::db::{FirestoreDb, MemoryStore};
use ride_dispatch::middleware::auth::create_jwt;
use ride_dispatch::models::{DriverAvailability, NewRide, Place, RideCategory, Role};
use ride_dispatch::routes::create_router;
use ride_dispatch::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore connection to the emulator.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// State backed by a fresh in-memory store.
#[allow(dead_code)]
pub fn test_state() -> (Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(Config::test_default(), store.clone()));
    (state, store)
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and the store handle.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let (state, store) = test_state();
    (create_router(state.clone()), state, store)
}

/// Bearer token for a caller, signed with the test key.
#[allow(dead_code)]
pub fn bearer(caller_id: &str, role: Role) -> String {
    let token = create_jwt(caller_id, role, &Config::test_default().jwt_signing_key)
        .expect("Failed to create JWT");
    format!("Bearer {}", token)
}

#[allow(dead_code)]
pub fn new_ride(address: &str) -> NewRide {
    NewRide {
        pickup: Place {
            address: address.to_string(),
            lat: Some(33.8938),
            lng: Some(35.5018),
        },
        dropoff: Place {
            address: "Beirut Airport".to_string(),
            lat: Some(33.8209),
            lng: Some(35.4884),
        },
        category: RideCategory::Standard,
        distance_km: 9.4,
        fare: 12.5,
        passengers: 1,
        originating_service: None,
    }
}

/// Provision a driver and put them Online.
#[allow(dead_code)]
pub async fn online_driver(state: &AppState, driver_id: &str) {
    state
        .availability
        .provision(driver_id)
        .await
        .expect("Failed to provision driver");
    state
        .availability
        .set(driver_id, DriverAvailability::Online)
        .await
        .expect("Failed to bring driver online");
}
