//! Reservation (hold-queue entry) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::ReservationStatus;

/// A queued request for a title, made when no copy was available.
/// The copy is resolved at promotion time, not at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub title_id: i32,
    pub status: ReservationStatus,
    pub request_date: DateTime<Utc>,
}
