// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.
//!
//! Tokens are issued elsewhere (login is not part of this service). The
//! middleware only verifies them and attaches the caller identity.

use crate::error::AppError;
use crate::models::{Caller, Role};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie carrying the caller's JWT.
pub const TOKEN_COOKIE: &str = "ride_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (passenger or driver ID)
    pub sub: String,
    /// Which app the token was issued for
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => return Err(AppError::Unauthorized),
        }
    };

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(&token, &key, &validation).map_err(|_| AppError::InvalidToken)?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::InvalidToken);
    }

    request.extensions_mut().insert(Caller {
        id: token_data.claims.sub,
        role: token_data.claims.role,
    });

    Ok(next.run(request).await)
}

impl Caller {
    /// Reject callers that are not drivers.
    pub fn require_driver(&self) -> Result<&str, AppError> {
        match self.role {
            Role::Driver => Ok(&self.id),
            Role::Passenger => Err(AppError::Forbidden("Not authorized as a driver".to_string())),
        }
    }

    /// Reject callers that are not passengers.
    pub fn require_passenger(&self) -> Result<&str, AppError> {
        match self.role {
            Role::Passenger => Ok(&self.id),
            Role::Driver => Err(AppError::Forbidden("Not authorized as a user".to_string())),
        }
    }
}

/// Create a JWT for a caller session.
pub fn create_jwt(caller_id: &str, role: Role, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: caller_id.to_string(),
        role,
        iat: now,
        exp: now + 24 * 60 * 60, // 1 day
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
