// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST). The pending pool is shared between tests, so
//! assertions target specific ride and driver IDs rather than pool order.

use futures_util::future::join_all;
use ride_dispatch::db::{Assignment, DriverChange, FirestoreDb, RideStore, RideTransition};
use ride_dispatch::models::{DriverAvailability, DriverRecord, RideStatus};
use ride_dispatch::services::OfferMatcher;
use ride_dispatch::time_utils::now_rfc3339;
use std::collections::HashSet;
use std::sync::Arc;

mod common;
use common::test_db;

/// Generate a unique ID for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn offer(ride_id: &str, driver_id: &str) -> RideTransition {
    RideTransition::new(ride_id, RideStatus::Pending, RideStatus::Offered)
        .assign(Assignment::Assign(driver_id.to_string()))
        .with_driver_change(DriverChange {
            driver_id: driver_id.to_string(),
            expected: DriverAvailability::Online,
            expected_ride: None,
            availability: DriverAvailability::Online,
            current_ride_id: Some(ride_id.to_string()),
        })
}

async fn online_driver(db: &FirestoreDb) -> String {
    let driver_id = unique_id("driver");
    db.insert_driver(DriverRecord {
        availability: DriverAvailability::Online,
        ..DriverRecord::provisioned(&driver_id, &now_rfc3339())
    })
    .await
    .unwrap();
    driver_id
}

#[tokio::test]
async fn test_create_and_read_ride() {
    require_emulator!();

    let db = test_db().await;
    let passenger = unique_id("passenger");

    let ride = db
        .create_ride(&passenger, common::new_ride("Hamra Street"))
        .await
        .unwrap();
    assert_eq!(ride.status, RideStatus::Pending);

    let stored = db.get_ride(&ride.id).await.unwrap().unwrap();
    assert_eq!(stored, ride);

    let current = db
        .current_ride_for_passenger(&passenger)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, ride.id);

    assert!(db.get_ride(&unique_id("ride")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pending_ride_is_listed() {
    require_emulator!();

    let db = test_db().await;
    let ride = db
        .create_ride(&unique_id("passenger"), common::new_ride("Gemmayzeh"))
        .await
        .unwrap();

    let pending = db.list_pending(1000).await.unwrap();
    assert!(pending.iter().any(|r| r.id == ride.id));
    assert!(pending.iter().all(|r| r.status == RideStatus::Pending));
    assert!(pending
        .windows(2)
        .all(|w| w[0].requested_at <= w[1].requested_at));
}

#[tokio::test]
async fn test_compare_and_swap_couples_driver_row() {
    require_emulator!();

    let db = test_db().await;
    let driver_id = online_driver(&db).await;
    let ride = db
        .create_ride(&unique_id("passenger"), common::new_ride("Verdun"))
        .await
        .unwrap();

    let offered = db.compare_and_swap(offer(&ride.id, &driver_id)).await.unwrap();
    assert_eq!(offered.status, RideStatus::Offered);
    assert_eq!(offered.driver_id.as_deref(), Some(driver_id.as_str()));

    let driver = db.get_driver(&driver_id).await.unwrap().unwrap();
    assert_eq!(driver.current_ride_id.as_deref(), Some(ride.id.as_str()));

    // Same guard again is stale
    let err = db
        .compare_and_swap(offer(&ride.id, &driver_id))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_failed_driver_guard_leaves_ride_untouched() {
    require_emulator!();

    let db = test_db().await;
    let driver_id = unique_id("driver");
    db.insert_driver(DriverRecord::provisioned(&driver_id, &now_rfc3339()))
        .await
        .unwrap();
    let ride = db
        .create_ride(&unique_id("passenger"), common::new_ride("Badaro"))
        .await
        .unwrap();

    // Driver is Offline, so the coupled guard fails
    let err = db
        .compare_and_swap(offer(&ride.id, &driver_id))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let stored = db.get_ride(&ride.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RideStatus::Pending);
    assert!(stored.driver_id.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_offers_yield_one_winner_and_conflicts() {
    require_emulator!();

    let db = test_db().await;
    let ride = db
        .create_ride(&unique_id("passenger"), common::new_ride("Mar Mikhael"))
        .await
        .unwrap();
    let mut drivers = Vec::new();
    for _ in 0..8 {
        drivers.push(online_driver(&db).await);
    }

    let attempts = drivers.iter().map(|driver_id| {
        let db = db.clone();
        let transition = offer(&ride.id, driver_id);
        tokio::spawn(async move { db.compare_and_swap(transition).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(err.is_conflict(), "losing offer should conflict, got {}", err);
    }

    let stored = db.get_ride(&ride.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RideStatus::Offered);
    let winner = stored.driver_id.unwrap();
    for driver_id in &drivers {
        let record = db.get_driver(driver_id).await.unwrap().unwrap();
        assert_eq!(record.has_open_offer(), *driver_id == winner);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_polls_never_fail() {
    require_emulator!();

    let db = test_db().await;
    db.create_ride(&unique_id("passenger"), common::new_ride("Gemmayzeh"))
        .await
        .unwrap();
    let mut drivers = Vec::new();
    for _ in 0..8 {
        drivers.push(online_driver(&db).await);
    }

    let matcher = OfferMatcher::new(Arc::new(db));
    let polls = drivers.into_iter().map(|driver_id| {
        let matcher = matcher.clone();
        tokio::spawn(async move { matcher.poll_offer(&driver_id).await })
    });
    let offers: Vec<_> = join_all(polls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect::<Result<Vec<_>, _>>()
        .expect("racing polls return null, not an error")
        .into_iter()
        .flatten()
        .collect();

    // The emulator's pending pool is shared, so several rides may be
    // handed out, but never the same ride twice.
    assert!(!offers.is_empty());
    let ride_ids: HashSet<_> = offers.iter().map(|ride| ride.id.clone()).collect();
    assert_eq!(ride_ids.len(), offers.len());
}

#[tokio::test]
async fn test_driver_rows() {
    require_emulator!();

    let db = test_db().await;
    let driver_id = unique_id("driver");

    db.insert_driver(DriverRecord::provisioned(&driver_id, &now_rfc3339()))
        .await
        .unwrap();
    let err = db
        .insert_driver(DriverRecord::provisioned(&driver_id, &now_rfc3339()))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let record = db
        .update_availability(DriverChange {
            driver_id: driver_id.clone(),
            expected: DriverAvailability::Offline,
            expected_ride: None,
            availability: DriverAvailability::Online,
            current_ride_id: None,
        })
        .await
        .unwrap();
    assert_eq!(record.availability, DriverAvailability::Online);

    let stored = db.get_driver(&driver_id).await.unwrap().unwrap();
    assert_eq!(stored.availability, DriverAvailability::Online);
}

#[tokio::test]
async fn test_current_ride_skips_finished_rides() {
    require_emulator!();

    let db = test_db().await;
    let passenger = unique_id("passenger");
    let driver_id = online_driver(&db).await;

    let active = db
        .create_ride(&passenger, common::new_ride("Active"))
        .await
        .unwrap();
    let finished = db
        .create_ride(&passenger, common::new_ride("Finished"))
        .await
        .unwrap();
    db.compare_and_swap(offer(&finished.id, &driver_id))
        .await
        .unwrap();
    db.compare_and_swap(
        RideTransition::new(&finished.id, RideStatus::Offered, RideStatus::CancelledByUser)
            .expect_driver(Some(&driver_id))
            .with_driver_change(DriverChange {
                driver_id: driver_id.clone(),
                expected: DriverAvailability::Online,
                expected_ride: Some(finished.id.clone()),
                availability: DriverAvailability::Online,
                current_ride_id: None,
            }),
    )
    .await
    .unwrap();

    // The newer ride is terminal; the older pending one is still current
    let current = db
        .current_ride_for_passenger(&passenger)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, active.id);
}

#[tokio::test]
async fn test_offline_client_is_unavailable() {
    let db = FirestoreDb::new_mock();
    let err = db.get_ride("anything").await.unwrap_err();
    assert!(err.is_retryable());
}
