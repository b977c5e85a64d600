// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride routes: booking, offer polling and lifecycle transitions.

use crate::error::Result;
use crate::models::{Caller, NewRide, Ride};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Ride routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rides/request", post(request_ride))
        .route("/api/rides/user/current", get(current_ride))
        .route("/api/rides/driver/new", get(poll_offer))
        .route("/api/rides/{ride_id}/accept", post(accept_ride))
        .route("/api/rides/{ride_id}/reject", post(reject_ride))
        .route("/api/rides/{ride_id}/arrive", post(mark_arrived))
        .route("/api/rides/{ride_id}/start", post(start_ride))
        .route("/api/rides/{ride_id}/complete", post(complete_ride))
        .route("/api/rides/{ride_id}/cancel", post(cancel_ride))
        .route("/api/rides/{ride_id}/status", get(ride_status))
}

/// Response for every lifecycle transition.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RideActionResponse {
    pub message: String,
    pub ride: Ride,
}

impl RideActionResponse {
    fn new(message: &str, ride: Ride) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
            ride,
        })
    }
}

// ─── Passenger ───────────────────────────────────────────────

/// Book a new ride.
async fn request_ride(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<NewRide>,
) -> Result<(StatusCode, Json<Ride>)> {
    let passenger_id = caller.require_passenger()?;
    let ride = state.rides.create(passenger_id, request).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

/// Latest non-terminal ride of the calling passenger, or `null`.
async fn current_ride(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Option<Ride>>> {
    let passenger_id = caller.require_passenger()?;
    Ok(Json(state.rides.current_for_passenger(passenger_id).await?))
}

/// Ride status for the requester or the assigned driver.
async fn ride_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(ride_id): Path<String>,
) -> Result<Json<Ride>> {
    Ok(Json(state.rides.status(&caller.id, &ride_id).await?))
}

async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(ride_id): Path<String>,
) -> Result<Json<RideActionResponse>> {
    let ride = state.lifecycle.cancel(&caller, &ride_id).await?;
    Ok(RideActionResponse::new("Ride cancelled.", ride))
}

// ─── Driver ──────────────────────────────────────────────────

/// Offer poll. Returns `null` when there is nothing to offer.
async fn poll_offer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Option<Ride>>> {
    let driver_id = caller.require_driver()?;
    Ok(Json(state.matcher.poll_offer(driver_id).await?))
}

async fn accept_ride(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(ride_id): Path<String>,
) -> Result<Json<RideActionResponse>> {
    let driver_id = caller.require_driver()?;
    let ride = state.lifecycle.accept(driver_id, &ride_id).await?;
    Ok(RideActionResponse::new("Ride accepted.", ride))
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    /// Set by the driver app when the offer countdown expired
    #[serde(default)]
    auto: bool,
}

async fn reject_ride(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(ride_id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<RideActionResponse>> {
    let driver_id = caller.require_driver()?;
    let auto = body.map(|Json(request)| request.auto).unwrap_or(false);

    let ride = state.lifecycle.reject(driver_id, &ride_id, auto).await?;

    let message = if auto {
        "Ride request timed out and was automatically rejected."
    } else {
        "Ride rejected. It will be offered to other drivers."
    };
    Ok(RideActionResponse::new(message, ride))
}

async fn mark_arrived(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(ride_id): Path<String>,
) -> Result<Json<RideActionResponse>> {
    let driver_id = caller.require_driver()?;
    let ride = state.lifecycle.mark_arrived(driver_id, &ride_id).await?;
    Ok(RideActionResponse::new("Arrival confirmed.", ride))
}

async fn start_ride(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(ride_id): Path<String>,
) -> Result<Json<RideActionResponse>> {
    let driver_id = caller.require_driver()?;
    let ride = state.lifecycle.start(driver_id, &ride_id).await?;
    Ok(RideActionResponse::new("Ride started.", ride))
}

async fn complete_ride(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(ride_id): Path<String>,
) -> Result<Json<RideActionResponse>> {
    let driver_id = caller.require_driver()?;
    let ride = state.lifecycle.complete(driver_id, &ride_id).await?;
    Ok(RideActionResponse::new("Ride completed successfully.", ride))
}
