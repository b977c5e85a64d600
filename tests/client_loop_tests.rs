// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Driver and passenger polling loops, run on a paused clock.

use async_trait::async_trait;
use ride_dispatch::client::{DriverPollLoop, OfferDecision, OfferHandler, PollOutcome, RideTracker};
use ride_dispatch::config::Config;
use ride_dispatch::models::{Caller, DriverAvailability, Ride, RideStatus};
use ride_dispatch::services::RideLifecycle;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

mod common;

struct Answer(OfferDecision);

#[async_trait]
impl OfferHandler for Answer {
    async fn decide(&self, _offer: &Ride) -> OfferDecision {
        self.0
    }
}

/// Never answers; the countdown decides.
struct Unresponsive;

#[async_trait]
impl OfferHandler for Unresponsive {
    async fn decide(&self, _offer: &Ride) -> OfferDecision {
        std::future::pending().await
    }
}

/// The passenger cancels while the driver is still looking at the offer.
struct CancelledMeanwhile {
    lifecycle: RideLifecycle,
}

#[async_trait]
impl OfferHandler for CancelledMeanwhile {
    async fn decide(&self, offer: &Ride) -> OfferDecision {
        self.lifecycle
            .cancel(&Caller::passenger(offer.requester_id.clone()), &offer.id)
            .await
            .unwrap();
        OfferDecision::Accept
    }
}

fn poll_loop(state: &ride_dispatch::AppState, driver_id: &str) -> DriverPollLoop {
    DriverPollLoop::new(
        state.matcher.clone(),
        state.lifecycle.clone(),
        driver_id,
        &state.config,
    )
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_offer_is_rejected_after_countdown() {
    let (state, _) = common::test_state();
    common::online_driver(&state, "D1").await;
    let ride = state
        .rides
        .create("P1", common::new_ride("Ntinda"))
        .await
        .unwrap();

    let driver = poll_loop(&state, "D1");
    let started = Instant::now();
    let outcome = driver.poll_once(&Unresponsive).await.unwrap();

    assert!(started.elapsed() >= Config::test_default().offer_timeout);
    match outcome {
        PollOutcome::TimedOut(rejected) => {
            assert_eq!(rejected.id, ride.id);
            assert_eq!(rejected.status, RideStatus::Pending);
            assert!(rejected.driver_id.is_none());
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }

    let record = state.availability.get("D1").await.unwrap();
    assert!(record.current_ride_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_poll_once_accepts_and_rejects() {
    let (state, _) = common::test_state();
    common::online_driver(&state, "D1").await;

    let driver = poll_loop(&state, "D1");
    assert_eq!(
        driver.poll_once(&Answer(OfferDecision::Accept)).await.unwrap(),
        PollOutcome::NoOffer
    );

    let ride = state
        .rides
        .create("P1", common::new_ride("Kololo"))
        .await
        .unwrap();

    match driver.poll_once(&Answer(OfferDecision::Reject)).await.unwrap() {
        PollOutcome::Rejected(rejected) => assert_eq!(rejected.status, RideStatus::Pending),
        other => panic!("expected Rejected, got {:?}", other),
    }

    match driver.poll_once(&Answer(OfferDecision::Accept)).await.unwrap() {
        PollOutcome::Accepted(accepted) => {
            assert_eq!(accepted.id, ride.id);
            assert_eq!(accepted.status, RideStatus::Accepted);
        }
        other => panic!("expected Accepted, got {:?}", other),
    }

    let record = state.availability.get("D1").await.unwrap();
    assert_eq!(record.availability, DriverAvailability::OnTrip);
}

#[tokio::test(start_paused = true)]
async fn test_answer_after_cancellation_is_lost() {
    let (state, _) = common::test_state();
    common::online_driver(&state, "D1").await;
    let ride = state
        .rides
        .create("P1", common::new_ride("Muyenga"))
        .await
        .unwrap();

    let driver = poll_loop(&state, "D1");
    let handler = CancelledMeanwhile {
        lifecycle: state.lifecycle.clone(),
    };
    let outcome = driver.poll_once(&handler).await.unwrap();
    assert_eq!(outcome, PollOutcome::Lost { ride_id: ride.id });

    let record = state.availability.get("D1").await.unwrap();
    assert_eq!(record.availability, DriverAvailability::Online);
    assert!(record.current_ride_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_run_accepts_until_shutdown() {
    let (state, _) = common::test_state();
    common::online_driver(&state, "D1").await;
    let ride = state
        .rides
        .create("P1", common::new_ride("Kansanga"))
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = poll_loop(&state, "D1");
    let handle = tokio::spawn(async move {
        driver
            .run(&Answer(OfferDecision::Accept), shutdown_rx)
            .await;
    });

    // First tick fires immediately; give it one interval to settle
    tokio::time::sleep(Duration::from_secs(1)).await;
    let stored = state.rides.status("P1", &ride.id).await.unwrap();
    assert_eq!(stored.status, RideStatus::Accepted);
    assert_eq!(stored.driver_id.as_deref(), Some("D1"));

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_run_survives_store_outage() {
    let (state, store) = common::test_state();
    common::online_driver(&state, "D1").await;
    let ride = state
        .rides
        .create("P1", common::new_ride("Bukoto"))
        .await
        .unwrap();

    store.set_offline(true);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = poll_loop(&state, "D1");
    let handle = tokio::spawn(async move {
        driver
            .run(&Answer(OfferDecision::Accept), shutdown_rx)
            .await;
    });

    tokio::time::sleep(Duration::from_secs(10)).await;
    store.set_offline(false);
    // Next tick lands at 14s
    tokio::time::sleep(Duration::from_secs(10)).await;

    let stored = state.rides.status("P1", &ride.id).await.unwrap();
    assert_eq!(stored.status, RideStatus::Accepted);

    drop(shutdown_tx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_tracker_reports_each_status_once() {
    let (state, _) = common::test_state();
    common::online_driver(&state, "D1").await;
    let ride = state
        .rides
        .create("P1", common::new_ride("Wandegeya"))
        .await
        .unwrap();
    state.matcher.poll_offer("D1").await.unwrap().unwrap();

    let tracker = RideTracker::new(state.rides.clone(), "P1", ride.id.clone(), &state.config);
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        let last = tracker.run(|ride| seen.push(ride.status)).await.unwrap();
        (seen, last)
    });

    // Status polls land every 15s; transitions at 22s steps never collide
    let step = Duration::from_secs(22);
    tokio::time::sleep(step).await;
    state.lifecycle.accept("D1", &ride.id).await.unwrap();
    tokio::time::sleep(step).await;
    state.lifecycle.mark_arrived("D1", &ride.id).await.unwrap();
    tokio::time::sleep(step).await;
    state.lifecycle.start("D1", &ride.id).await.unwrap();
    tokio::time::sleep(step).await;
    state.lifecycle.complete("D1", &ride.id).await.unwrap();

    let (seen, last) = handle.await.unwrap();
    assert_eq!(
        seen,
        vec![
            RideStatus::Offered,
            RideStatus::Accepted,
            RideStatus::ArrivedAtPickup,
            RideStatus::Ongoing,
            RideStatus::Completed,
        ]
    );
    assert_eq!(last.status, RideStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_tracker_stops_for_stranger() {
    let (state, _) = common::test_state();
    let ride = state
        .rides
        .create("P1", common::new_ride("Kamwokya"))
        .await
        .unwrap();

    let tracker = RideTracker::new(state.rides.clone(), "P2", ride.id, &state.config);
    let err = tracker.run(|_| {}).await.unwrap_err();
    assert!(matches!(err, ride_dispatch::error::AppError::Forbidden(_)));
}
