//! Fine and payment models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{FineReason, PaymentStatus};

/// A monetary penalty tied to one loan. `loan_id` is unique: at most one
/// fine per loan, guarded in code and by the schema.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: i32,
    pub loan_id: i32,
    pub user_id: i32,
    pub amount: Decimal,
    pub reason: FineReason,
    pub is_paid: bool,
}

/// Payment intent recorded against a fine, settled by the gateway webhook
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub fine_id: i32,
    pub external_ref: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}
