//! API handlers for the Calliope REST endpoints

pub mod fines;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod reservations;
pub mod sweep;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{error::AppError, AppState};

/// Extractor gating staff endpoints behind the shared staff token.
/// Credential authentication lives in a separate gateway; this server only
/// verifies the bearer token it is configured with.
pub struct StaffAuth;

#[async_trait]
impl FromRequestParts<AppState> for StaffAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::Authentication("Invalid authorization header format".to_string())
            })?;

        if token != state.config.auth.staff_token {
            return Err(AppError::Authentication("Invalid staff token".to_string()));
        }

        Ok(StaffAuth)
    }
}
