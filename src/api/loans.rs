//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::LoanDetails,
};

use super::StaffAuth;

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Borrowing member ID
    pub user_id: i32,
    /// Catalog title ID; the copy is chosen by the registry
    pub title_id: i32,
    /// Requested loan duration in days; capped at the member's policy
    pub duration_days: Option<i64>,
}

/// Loan response with calculated dates
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Copy the loan was booked against
    pub copy_id: i32,
    /// Renewals used so far
    pub renewal_count: i16,
    /// Status message
    pub message: String,
}

/// Renew request carries the acting member for ownership checks
#[derive(Deserialize, ToSchema)]
pub struct RenewLoanRequest {
    pub user_id: i32,
}

/// Return response with loan details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Loan details after return processing
    pub loan: LoanDetails,
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.circulation.list_user_loans(user_id).await?;
    Ok(Json(loans))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.circulation.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Create a new loan (borrow a title)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 403, description = "Account suspended"),
        (status = 404, description = "User or title not found"),
        (status = 409, description = "No copy available, queue blocks direct loan, or copy taken concurrently"),
        (status = 422, description = "Loan limit reached")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = state
        .services
        .circulation
        .create_loan(request.user_id, request.title_id, request.duration_days)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: loan.id,
            due_date: loan.due_date,
            copy_id: loan.copy_id,
            renewal_count: loan.renewal_count,
            message: "Title borrowed successfully".to_string(),
        }),
    ))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = RenewLoanRequest,
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 404, description = "No active loan for this user"),
        (status = 409, description = "Another member is waiting for the title"),
        (status = 422, description = "Renewal limit reached")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Path(loan_id): Path<i32>,
    Json(request): Json<RenewLoanRequest>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state
        .services
        .circulation
        .renew_loan(loan_id, request.user_id)
        .await?;

    Ok(Json(LoanResponse {
        id: loan.id,
        due_date: loan.due_date,
        copy_id: loan.copy_id,
        renewal_count: loan.renewal_count,
        message: format!("Loan renewed ({} renewal(s) used)", loan.renewal_count),
    }))
}

/// Approve the return of a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Return processed", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan is not out")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    _auth: StaffAuth,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.circulation.return_loan(loan_id).await?;

    Ok(Json(ReturnResponse {
        status: format!("{:?}", loan.status).to_lowercase(),
        loan,
    }))
}
