// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Rides (`rides/{ride_id}`)
//! - Driver availability (`drivers/{driver_id}`)
//!
//! Guarded writes run inside a Firestore transaction. Reads are bound to the
//! transaction so the documents stay locked until commit, which gives the
//! compare-and-swap semantics the dispatch flow relies on. An attempt that
//! Firestore aborts for contention is retried from the read.

use crate::db::{collections, DriverChange, RideStore, RideTransition};
use crate::error::{AppError, Result};
use crate::models::{DriverRecord, NewRide, Ride, RideStatus};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreResult;
use std::time::Duration;

/// Attempts of a guarded transaction before contention becomes `Unavailable`.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Backoff step between attempts (grows linearly).
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Statuses of a ride that is still in progress.
const ACTIVE_STATUSES: [RideStatus; 5] = [
    RideStatus::Pending,
    RideStatus::Offered,
    RideStatus::Accepted,
    RideStatus::ArrivedAtPickup,
    RideStatus::Ongoing,
];

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Unavailable(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return `Unavailable` if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Database not connected (offline mode)".to_string()))
    }

    /// A client whose reads run inside `transaction`.
    fn transactional(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
    }

    async fn read_driver(
        db: &firestore::FirestoreDb,
        driver_id: &str,
    ) -> FirestoreResult<Option<DriverRecord>> {
        db.fluent()
            .select()
            .by_id_in(collections::DRIVERS)
            .obj()
            .one(driver_id)
            .await
    }

    fn add_driver_write(
        client: &firestore::FirestoreDb,
        record: &DriverRecord,
        transaction: &mut firestore::FirestoreTransaction<'_>,
    ) -> FirestoreResult<()> {
        client
            .fluent()
            .update()
            .in_col(collections::DRIVERS)
            .document_id(&record.driver_id)
            .object(record)
            .add_to_transaction(transaction)?;
        Ok(())
    }

    /// Run one transaction attempt to completion: commit what `staged`
    /// wrote, or roll back if staging stopped early.
    async fn settle<T>(
        transaction: firestore::FirestoreTransaction<'_>,
        staged: TxResult<T>,
    ) -> TxResult<T> {
        match staged {
            Ok(value) => {
                transaction.commit().await?;
                Ok(value)
            }
            Err(failure) => {
                if let Err(e) = transaction.rollback().await {
                    tracing::debug!(error = %e, "Transaction rollback failed");
                }
                Err(failure)
            }
        }
    }

    /// Decide what to do with the outcome of one transaction attempt.
    ///
    /// Returns `None` (after a short backoff) when Firestore aborted the
    /// attempt for contention and another try is allowed. The next attempt
    /// re-reads the documents, so a caller that lost a race sees the
    /// winner's write and fails its guard with `Conflict`.
    async fn after_attempt<T>(
        operation: &'static str,
        tries: u32,
        outcome: TxResult<T>,
    ) -> Option<Result<T>> {
        match outcome {
            Ok(value) => Some(Ok(value)),
            Err(TxFailure::Stop(e)) => Some(Err(e)),
            Err(TxFailure::Store(e)) if is_contention(&e) && tries < MAX_TRANSACTION_ATTEMPTS => {
                tracing::warn!(operation, attempt = tries, error = %e, "Transaction contended, retrying");
                tokio::time::sleep(RETRY_BASE_DELAY * tries).await;
                None
            }
            Err(TxFailure::Store(e)) => Some(Err(AppError::Unavailable(format!(
                "{} failed: {}",
                operation, e
            )))),
        }
    }

    async fn try_compare_and_swap(
        client: &firestore::FirestoreDb,
        transition: &RideTransition,
    ) -> TxResult<Ride> {
        let mut transaction = client.begin_transaction().await?;
        let tx_db = Self::transactional(client, &transaction);
        let staged = Self::stage_transition(client, &tx_db, &mut transaction, transition).await;
        Self::settle(transaction, staged).await
    }

    /// Read both rows inside the transaction, check the guards and queue the
    /// writes.
    async fn stage_transition(
        client: &firestore::FirestoreDb,
        tx_db: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        transition: &RideTransition,
    ) -> TxResult<Ride> {
        let now = now_rfc3339();

        let ride: Option<Ride> = tx_db
            .fluent()
            .select()
            .by_id_in(collections::RIDES)
            .obj()
            .one(&transition.ride_id)
            .await?;
        let mut ride = ride.ok_or_else(|| {
            TxFailure::Stop(AppError::NotFound(format!(
                "Ride {} not found",
                transition.ride_id
            )))
        })?;
        transition.check(&ride).map_err(TxFailure::Stop)?;

        if let Some(change) = &transition.driver_change {
            let mut driver = Self::read_driver(tx_db, &change.driver_id)
                .await?
                .ok_or_else(|| driver_not_found(&change.driver_id))?;
            change.check(&driver).map_err(TxFailure::Stop)?;
            change.apply(&mut driver, &now);
            Self::add_driver_write(client, &driver, transaction)?;
        }

        transition.apply(&mut ride, &now);
        client
            .fluent()
            .update()
            .in_col(collections::RIDES)
            .document_id(&ride.id)
            .object(&ride)
            .add_to_transaction(transaction)?;

        Ok(ride)
    }

    async fn try_insert_driver(
        client: &firestore::FirestoreDb,
        record: &DriverRecord,
    ) -> TxResult<DriverRecord> {
        let mut transaction = client.begin_transaction().await?;
        let tx_db = Self::transactional(client, &transaction);

        let staged = match Self::read_driver(&tx_db, &record.driver_id).await {
            Ok(Some(_)) => Err(TxFailure::Stop(AppError::Conflict(format!(
                "Driver {} is already registered",
                record.driver_id
            )))),
            Ok(None) => Self::add_driver_write(client, record, &mut transaction)
                .map(|()| record.clone())
                .map_err(TxFailure::from),
            Err(e) => Err(e.into()),
        };
        Self::settle(transaction, staged).await
    }

    async fn try_update_availability(
        client: &firestore::FirestoreDb,
        change: &DriverChange,
    ) -> TxResult<DriverRecord> {
        let mut transaction = client.begin_transaction().await?;
        let tx_db = Self::transactional(client, &transaction);
        let staged = Self::stage_driver_change(client, &tx_db, &mut transaction, change).await;
        Self::settle(transaction, staged).await
    }

    async fn stage_driver_change(
        client: &firestore::FirestoreDb,
        tx_db: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        change: &DriverChange,
    ) -> TxResult<DriverRecord> {
        let mut driver = Self::read_driver(tx_db, &change.driver_id)
            .await?
            .ok_or_else(|| driver_not_found(&change.driver_id))?;
        change.check(&driver).map_err(TxFailure::Stop)?;
        change.apply(&mut driver, &now_rfc3339());
        Self::add_driver_write(client, &driver, transaction)?;
        Ok(driver)
    }
}

/// Why a single transaction attempt did not commit.
enum TxFailure {
    /// A guard or lookup failed. Reported to the caller as is.
    Stop(AppError),
    /// Firestore rejected the read, write or commit.
    Store(FirestoreError),
}

impl From<FirestoreError> for TxFailure {
    fn from(e: FirestoreError) -> Self {
        TxFailure::Store(e)
    }
}

type TxResult<T> = std::result::Result<T, TxFailure>;

/// Aborted (lock contention) and other transient database errors.
fn is_contention(err: &FirestoreError) -> bool {
    matches!(err, FirestoreError::DatabaseError(db_err) if db_err.retry_possible)
}

fn driver_not_found(driver_id: &str) -> TxFailure {
    TxFailure::Stop(AppError::NotFound(format!("Driver {} not found", driver_id)))
}

#[async_trait]
impl RideStore for FirestoreDb {
    // ─── Ride Operations ─────────────────────────────────────────

    async fn create_ride(&self, requester_id: &str, request: NewRide) -> Result<Ride> {
        let ride = Ride::pending(requester_id, request, &now_rfc3339());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RIDES)
            .document_id(&ride.id)
            .object(&ride)
            .execute()
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))?;

        Ok(ride)
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RIDES)
            .obj()
            .one(ride_id)
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Ride>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RIDES)
            .filter(|q| q.for_all([q.field("status").eq(RideStatus::Pending.as_str())]))
            .order_by([("requested_at", firestore::FirestoreQueryDirection::Ascending)])
            .limit(limit as u32)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))
    }

    async fn current_ride_for_passenger(&self, requester_id: &str) -> Result<Option<Ride>> {
        let requester_id = requester_id.to_string();
        let active: Vec<&str> = ACTIVE_STATUSES.iter().map(|s| s.as_str()).collect();

        let latest: Vec<Ride> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::RIDES)
            .filter(move |q| {
                q.for_all([
                    q.field("requester_id").eq(requester_id.clone()),
                    q.field("status").is_in(active.clone()),
                ])
            })
            .order_by([("requested_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))?;

        Ok(latest.into_iter().next())
    }

    // ─── Guarded Transitions ─────────────────────────────────────

    /// Apply a ride transition (and its coupled driver change) atomically.
    ///
    /// Both documents are read inside the transaction. When a concurrent
    /// transaction wins, this one is aborted and retried against the new
    /// state.
    async fn compare_and_swap(&self, transition: RideTransition) -> Result<Ride> {
        let client = self.get_client()?;
        let mut tries = 0;
        let ride = loop {
            tries += 1;
            let outcome = Self::try_compare_and_swap(client, &transition).await;
            if let Some(result) = Self::after_attempt("Ride transition", tries, outcome).await {
                break result?;
            }
        };

        tracing::debug!(
            ride_id = %ride.id,
            from = %transition.from,
            to = %transition.to,
            "Ride transition committed"
        );
        Ok(ride)
    }

    // ─── Driver Operations ───────────────────────────────────────

    async fn insert_driver(&self, record: DriverRecord) -> Result<DriverRecord> {
        let client = self.get_client()?;
        let mut tries = 0;
        loop {
            tries += 1;
            let outcome = Self::try_insert_driver(client, &record).await;
            if let Some(result) = Self::after_attempt("Driver registration", tries, outcome).await {
                return result;
            }
        }
    }

    async fn get_driver(&self, driver_id: &str) -> Result<Option<DriverRecord>> {
        Self::read_driver(self.get_client()?, driver_id)
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))
    }

    async fn update_availability(&self, change: DriverChange) -> Result<DriverRecord> {
        let client = self.get_client()?;
        let mut tries = 0;
        loop {
            tries += 1;
            let outcome = Self::try_update_availability(client, &change).await;
            if let Some(result) = Self::after_attempt("Availability update", tries, outcome).await {
                return result;
            }
        }
    }
}
