//! Member model and policy contract

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::AccountStatus;

/// Library member
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub account_status: AccountStatus,
    pub max_active_loans: i16,
    pub loan_days: i16,
}

/// Borrowing policy for one member, as served by the membership provider.
/// This is the only contract the circulation core consumes from membership.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct MembershipPolicy {
    pub max_active_loans: i16,
    pub loan_days: i16,
    pub account_status: AccountStatus,
}
