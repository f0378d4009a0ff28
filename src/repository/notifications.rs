//! Notification audit repository
//!
//! The audit row is written inside the owning transaction; delivery is
//! dispatched after commit and never joins it.

use sqlx::PgConnection;

use crate::error::AppResult;

#[derive(Clone)]
pub struct NotificationsRepository;

impl NotificationsRepository {
    pub fn new() -> Self {
        Self
    }

    /// Record an emitted notification event
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        kind: &str,
        content: &str,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO notifications (user_id, kind, content) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(kind)
            .bind(content)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
