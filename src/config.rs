// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which `RideStore` backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store. State is lost on restart.
    Memory,
    /// Google Cloud Firestore (or the emulator).
    Firestore,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "firestore" => Ok(StoreBackend::Firestore),
            other => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Store backend selection
    pub store_backend: StoreBackend,
    /// JWT signing key for caller tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,

    // --- Client loop timing ---
    /// How long a driver has to answer an offer before it is auto-rejected
    pub offer_timeout: Duration,
    /// Interval between driver offer polls
    pub driver_poll_interval: Duration,
    /// Interval between passenger ride-status polls
    pub ride_status_poll_interval: Duration,
}

pub const DEFAULT_OFFER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DRIVER_POLL_INTERVAL_SECS: u64 = 7;
pub const DEFAULT_RIDE_STATUS_POLL_INTERVAL_SECS: u64 = 15;

impl Config {
    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            offer_timeout: Duration::from_secs(DEFAULT_OFFER_TIMEOUT_SECS),
            driver_poll_interval: Duration::from_secs(DEFAULT_DRIVER_POLL_INTERVAL_SECS),
            ride_status_poll_interval: Duration::from_secs(DEFAULT_RIDE_STATUS_POLL_INTERVAL_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_var("PORT", 8080)?,
            store_backend: match env::var("STORE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => StoreBackend::Memory,
            },
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            offer_timeout: Duration::from_secs(parse_var(
                "OFFER_TIMEOUT_SECS",
                DEFAULT_OFFER_TIMEOUT_SECS,
            )?),
            driver_poll_interval: Duration::from_secs(parse_var(
                "DRIVER_POLL_INTERVAL_SECS",
                DEFAULT_DRIVER_POLL_INTERVAL_SECS,
            )?),
            ride_status_poll_interval: Duration::from_secs(parse_var(
                "RIDE_STATUS_POLL_INTERVAL_SECS",
                DEFAULT_RIDE_STATUS_POLL_INTERVAL_SECS,
            )?),
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: value.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
