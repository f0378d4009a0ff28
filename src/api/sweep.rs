//! Manual trigger for the overdue sweeper

use axum::{extract::State, Json};

use crate::{error::AppResult, services::sweeper::SweepReport};

use super::StaffAuth;

/// Run one sweep cycle immediately
#[utoipa::path(
    post,
    path = "/sweep",
    tag = "sweep",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep cycle finished", body = SweepReport)
    )
)]
pub async fn trigger_sweep(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
) -> AppResult<Json<SweepReport>> {
    let report = state.services.sweeper.sweep().await?;
    Ok(Json(report))
}
