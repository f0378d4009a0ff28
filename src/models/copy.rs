//! Book copy (physical instance) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::CopyStatus;

/// One physical instance of a catalog title.
///
/// `held_by_user` and `hold_expiry` are both set iff `status == OnHold`;
/// the schema backs this with a CHECK constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: i32,
    pub title_id: i32,
    pub status: CopyStatus,
    pub held_by_user: Option<i32>,
    pub hold_expiry: Option<DateTime<Utc>>,
    pub acquisition_year: Option<i16>,
    pub shelf_tag: Option<String>,
}

impl BookCopy {
    /// Whether this copy is held for `user_id` and the hold is still valid
    /// at `now`. Expired holds fail closed: they no longer grant a claim
    /// even before the sweeper reaps them.
    pub fn holds_for(&self, user_id: i32, now: DateTime<Utc>) -> bool {
        self.status == CopyStatus::OnHold
            && self.held_by_user == Some(user_id)
            && self.hold_expiry.map(|e| e > now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn held_copy(user: i32, expiry: DateTime<Utc>) -> BookCopy {
        BookCopy {
            id: 1,
            title_id: 1,
            status: CopyStatus::OnHold,
            held_by_user: Some(user),
            hold_expiry: Some(expiry),
            acquisition_year: None,
            shelf_tag: None,
        }
    }

    #[test]
    fn unexpired_hold_grants_claim() {
        let now = Utc::now();
        assert!(held_copy(7, now + Duration::days(2)).holds_for(7, now));
    }

    #[test]
    fn expired_hold_fails_closed() {
        let now = Utc::now();
        assert!(!held_copy(7, now - Duration::hours(1)).holds_for(7, now));
    }

    #[test]
    fn hold_is_user_specific() {
        let now = Utc::now();
        assert!(!held_copy(7, now + Duration::days(2)).holds_for(8, now));
    }
}
