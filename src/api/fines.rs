//! Fine and payment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::fine::{Fine, Payment},
};

use super::StaffAuth;

/// Payment intent request
#[derive(Deserialize, ToSchema)]
pub struct PayFineRequest {
    /// Gateway reference for the payment intent
    pub external_ref: String,
}

/// Payment confirmation webhook body
#[derive(Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    /// Gateway reference identifying the intent
    pub external_ref: String,
    /// Whether the gateway settled the payment
    pub succeeded: bool,
}

/// List fines for a user
#[utoipa::path(
    get,
    path = "/users/{id}/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's fines, unpaid first", body = Vec<Fine>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_fines(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Fine>>> {
    let fines = state.services.ledger.list_user_fines(user_id).await?;
    Ok(Json(fines))
}

/// Record a payment intent against a fine
#[utoipa::path(
    post,
    path = "/fines/{id}/pay",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    request_body = PayFineRequest,
    responses(
        (status = 201, description = "Payment intent recorded", body = Payment),
        (status = 404, description = "Fine not found"),
        (status = 422, description = "Fine is already settled")
    )
)]
pub async fn pay_fine(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Path(fine_id): Path<i32>,
    Json(request): Json<PayFineRequest>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let payment = state
        .services
        .ledger
        .create_payment_intent(fine_id, &request.external_ref)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// Payment confirmation webhook from the gateway
#[utoipa::path(
    post,
    path = "/payments/confirm",
    tag = "fines",
    security(("bearer_auth" = [])),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment settled", body = Payment),
        (status = 404, description = "Unknown payment reference"),
        (status = 422, description = "Payment already settled")
    )
)]
pub async fn confirm_payment(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Json(request): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<Payment>> {
    let payment = state
        .services
        .ledger
        .confirm_payment(&request.external_ref, request.succeeded)
        .await?;

    Ok(Json(payment))
}
