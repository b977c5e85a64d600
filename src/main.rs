// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride-Dispatch API Server
//!
//! Matches pending ride requests to polling drivers and tracks each ride
//! from request to completion.

use ride_dispatch::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, RideStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        offer_timeout_secs = config.offer_timeout.as_secs(),
        "Starting Ride-Dispatch API"
    );

    let store: Arc<dyn RideStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; rides are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Firestore store initialized");
            Arc::new(db)
        }
    };

    let state = Arc::new(AppState::new(config.clone(), store));

    // Build router
    let app = ride_dispatch::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ride_dispatch=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
