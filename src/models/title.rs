//! Catalog title projection (read-only boundary)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// The slice of catalog data the circulation core needs: replacement price
/// for lost-copy fines and the borrowed counter it maintains.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Title {
    pub id: i32,
    pub title: String,
    pub price: Decimal,
    pub borrowed_count: i32,
}
