//! Reservation queue endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::reservation::Reservation};

use super::StaffAuth;

/// Create reservation request
#[derive(Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    /// Member joining the queue
    pub user_id: i32,
    /// Title to wait for
    pub title_id: i32,
}

/// Cancel request carries the acting member for ownership checks
#[derive(Deserialize, ToSchema)]
pub struct CancelReservationRequest {
    pub user_id: i32,
}

/// Queue a member for an out-of-stock title
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation queued", body = Reservation),
        (status = 403, description = "Account suspended"),
        (status = 404, description = "User or title not found"),
        (status = 409, description = "Already queued, or copies are available for direct borrowing")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Json(request): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state
        .services
        .reservations
        .create(request.user_id, request.title_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Withdraw a reservation
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    request_body = CancelReservationRequest,
    responses(
        (status = 204, description = "Reservation canceled"),
        (status = 404, description = "Reservation not found"),
        (status = 422, description = "Reservation is no longer live")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Path(reservation_id): Path<i32>,
    Json(request): Json<CancelReservationRequest>,
) -> AppResult<StatusCode> {
    state
        .services
        .reservations
        .cancel(reservation_id, request.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
