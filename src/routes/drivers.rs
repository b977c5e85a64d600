// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Driver account routes: provisioning and availability.

use crate::error::Result;
use crate::models::{Caller, DriverAvailability, DriverRecord};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/drivers/register", post(register_driver))
        .route("/api/drivers/me", get(get_me))
        .route("/api/drivers/me/availability", put(update_availability))
}

/// Availability read model used by the driver app to decide whether to
/// keep polling for offers or resume its current ride.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AvailabilityResponse {
    pub driver_id: String,
    pub availability: DriverAvailability,
    pub current_ride_id: Option<String>,
}

impl From<DriverRecord> for AvailabilityResponse {
    fn from(record: DriverRecord) -> Self {
        Self {
            driver_id: record.driver_id,
            availability: record.availability,
            current_ride_id: record.current_ride_id,
        }
    }
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<(StatusCode, Json<AvailabilityResponse>)> {
    let driver_id = caller.require_driver()?;
    let record = state.availability.provision(driver_id).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<AvailabilityResponse>> {
    let driver_id = caller.require_driver()?;
    Ok(Json(state.availability.get(driver_id).await?.into()))
}

#[derive(Deserialize)]
struct AvailabilityRequest {
    availability: DriverAvailability,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AvailabilityUpdateResponse {
    pub message: String,
    #[serde(flatten)]
    pub driver: AvailabilityResponse,
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityUpdateResponse>> {
    let driver_id = caller.require_driver()?;
    let record = state
        .availability
        .set(driver_id, request.availability)
        .await?;

    Ok(Json(AvailabilityUpdateResponse {
        message: format!("Driver availability updated to {}.", record.availability),
        driver: record.into(),
    }))
}
