// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Driver offer loop: poll, count down, respond.

use crate::config::Config;
use crate::error::Result;
use crate::models::Ride;
use crate::services::{OfferMatcher, RideLifecycle};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// The driver's answer to an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDecision {
    Accept,
    Reject,
}

/// Presents an offer to the driver and waits for their answer.
///
/// The future may be dropped when the countdown expires.
#[async_trait]
pub trait OfferHandler: Send + Sync {
    async fn decide(&self, offer: &Ride) -> OfferDecision;
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing to offer (or the driver is not Online).
    NoOffer,
    Accepted(Ride),
    Rejected(Ride),
    /// The countdown expired and the offer was rejected automatically.
    TimedOut(Ride),
    /// The response arrived after the ride had already moved on.
    Lost { ride_id: String },
}

pub struct DriverPollLoop {
    matcher: OfferMatcher,
    lifecycle: RideLifecycle,
    driver_id: String,
    poll_interval: Duration,
    offer_timeout: Duration,
}

impl DriverPollLoop {
    pub fn new(
        matcher: OfferMatcher,
        lifecycle: RideLifecycle,
        driver_id: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            matcher,
            lifecycle,
            driver_id: driver_id.into(),
            poll_interval: config.driver_poll_interval,
            offer_timeout: config.offer_timeout,
        }
    }

    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    /// Poll once and, if an offer arrives, resolve it.
    ///
    /// A `Conflict` while responding means the offer is gone; it is reported
    /// as [`PollOutcome::Lost`] rather than an error.
    pub async fn poll_once(&self, handler: &dyn OfferHandler) -> Result<PollOutcome> {
        let Some(offer) = self.matcher.poll_offer(&self.driver_id).await? else {
            return Ok(PollOutcome::NoOffer);
        };

        let decision = tokio::time::timeout(self.offer_timeout, handler.decide(&offer)).await;

        let response = match decision {
            Ok(OfferDecision::Accept) => self
                .lifecycle
                .accept(&self.driver_id, &offer.id)
                .await
                .map(PollOutcome::Accepted),
            Ok(OfferDecision::Reject) => self
                .lifecycle
                .reject(&self.driver_id, &offer.id, false)
                .await
                .map(PollOutcome::Rejected),
            Err(_) => {
                tracing::info!(
                    ride_id = %offer.id,
                    driver_id = %self.driver_id,
                    timeout_secs = self.offer_timeout.as_secs(),
                    "Offer countdown expired"
                );
                self.lifecycle
                    .reject(&self.driver_id, &offer.id, true)
                    .await
                    .map(PollOutcome::TimedOut)
            }
        };

        match response {
            Err(e) if e.is_conflict() => {
                tracing::info!(ride_id = %offer.id, driver_id = %self.driver_id, "Offer no longer available");
                Ok(PollOutcome::Lost { ride_id: offer.id })
            }
            other => other,
        }
    }

    /// Poll on the configured interval until `shutdown` becomes `true` (or
    /// its sender is dropped).
    pub async fn run(&self, handler: &dyn OfferHandler, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            match self.poll_once(handler).await {
                Ok(PollOutcome::NoOffer) => {}
                Ok(outcome) => {
                    tracing::debug!(driver_id = %self.driver_id, ?outcome, "Poll cycle finished");
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(driver_id = %self.driver_id, error = %e, "Poll failed, will retry");
                }
                Err(e) => {
                    tracing::error!(driver_id = %self.driver_id, error = %e, "Poll failed");
                }
            }
        }

        tracing::info!(driver_id = %self.driver_id, "Driver poll loop stopped");
    }
}
