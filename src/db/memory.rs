// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`.
//!
//! Each ride and driver row is guarded by its map shard lock. A transition
//! holds the ride entry while it checks and updates the driver entry, so the
//! two rows change together. Locks are always taken ride first, then driver.

use crate::db::{DriverChange, RideStore, RideTransition};
use crate::error::{AppError, Result};
use crate::models::{DriverRecord, NewRide, Ride, RideStatus};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

struct StoredRide {
    /// Insertion order, breaks ties between equal request timestamps
    seq: u64,
    ride: Ride,
}

/// Store used for local development and tests.
#[derive(Default)]
pub struct MemoryStore {
    rides: DashMap<String, StoredRide>,
    drivers: DashMap<String, DriverRecord>,
    next_seq: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store. Every operation fails with
    /// `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable(
                "Memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    /// Insert a fully formed ride. Used by fixtures and benchmarks.
    pub fn insert_ride(&self, ride: Ride) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.rides.insert(ride.id.clone(), StoredRide { seq, ride });
    }
}

#[async_trait]
impl RideStore for MemoryStore {
    async fn create_ride(&self, requester_id: &str, request: NewRide) -> Result<Ride> {
        self.ensure_online()?;
        let ride = Ride::pending(requester_id, request, &now_rfc3339());
        self.insert_ride(ride.clone());
        Ok(ride)
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>> {
        self.ensure_online()?;
        Ok(self.rides.get(ride_id).map(|stored| stored.ride.clone()))
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Ride>> {
        self.ensure_online()?;
        let mut pending: Vec<(String, u64, Ride)> = self
            .rides
            .iter()
            .filter(|stored| stored.ride.status == RideStatus::Pending)
            .map(|stored| (stored.ride.requested_at.clone(), stored.seq, stored.ride.clone()))
            .collect();
        pending.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        Ok(pending
            .into_iter()
            .take(limit)
            .map(|(_, _, ride)| ride)
            .collect())
    }

    async fn current_ride_for_passenger(&self, requester_id: &str) -> Result<Option<Ride>> {
        self.ensure_online()?;
        Ok(self
            .rides
            .iter()
            .filter(|stored| {
                stored.ride.requester_id == requester_id && !stored.ride.status.is_terminal()
            })
            .max_by(|a, b| (&a.ride.requested_at, a.seq).cmp(&(&b.ride.requested_at, b.seq)))
            .map(|stored| stored.ride.clone()))
    }

    async fn compare_and_swap(&self, transition: RideTransition) -> Result<Ride> {
        self.ensure_online()?;
        let now = now_rfc3339();

        let mut stored = self
            .rides
            .get_mut(&transition.ride_id)
            .ok_or_else(|| AppError::NotFound(format!("Ride {} not found", transition.ride_id)))?;
        transition.check(&stored.ride)?;

        if let Some(change) = &transition.driver_change {
            let mut driver = self.drivers.get_mut(&change.driver_id).ok_or_else(|| {
                AppError::NotFound(format!("Driver {} not found", change.driver_id))
            })?;
            change.check(&driver)?;
            change.apply(&mut driver, &now);
        }

        transition.apply(&mut stored.ride, &now);
        Ok(stored.ride.clone())
    }

    async fn insert_driver(&self, record: DriverRecord) -> Result<DriverRecord> {
        self.ensure_online()?;
        match self.drivers.entry(record.driver_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Driver {} is already registered",
                record.driver_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn get_driver(&self, driver_id: &str) -> Result<Option<DriverRecord>> {
        self.ensure_online()?;
        Ok(self.drivers.get(driver_id).map(|record| record.clone()))
    }

    async fn update_availability(&self, change: DriverChange) -> Result<DriverRecord> {
        self.ensure_online()?;
        let mut driver = self
            .drivers
            .get_mut(&change.driver_id)
            .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", change.driver_id)))?;
        change.check(&driver)?;
        change.apply(&mut driver, &now_rfc3339());
        Ok(driver.clone())
    }
}
