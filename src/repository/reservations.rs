//! Reservation queue repository
//!
//! FIFO ordering is `request_date` with id as the tie-break, so two
//! reservations sharing a timestamp resolve in insertion order.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{enums::ReservationStatus, reservation::Reservation},
};

#[derive(Clone)]
pub struct ReservationsRepository;

impl ReservationsRepository {
    pub fn new() -> Self {
        Self
    }

    /// Get reservation by ID inside a unit of work
    pub async fn get_by_id_tx(
        &self,
        conn: &mut PgConnection,
        id: i32,
    ) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Whether any other user has a live reservation for this title.
    /// Used by renewal: the queue blocks extending someone else's wait.
    pub async fn live_exists_for_other(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        title_id: i32,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE title_id = $1 AND user_id <> $2 AND status IN ($3, $4)
            )
            "#,
        )
        .bind(title_id)
        .bind(user_id)
        .bind(ReservationStatus::Pending)
        .bind(ReservationStatus::Notified)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Whether the user already has a live (pending/notified) reservation
    /// for this title
    pub async fn live_exists_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        title_id: i32,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE user_id = $1 AND title_id = $2 AND status IN ($3, $4)
            )
            "#,
        )
        .bind(user_id)
        .bind(title_id)
        .bind(ReservationStatus::Pending)
        .bind(ReservationStatus::Notified)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Count live reservations for a title
    pub async fn live_count_for_title(
        &self,
        conn: &mut PgConnection,
        title_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE title_id = $1 AND status IN ($2, $3)",
        )
        .bind(title_id)
        .bind(ReservationStatus::Pending)
        .bind(ReservationStatus::Notified)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Append a pending reservation to the title's queue
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        title_id: i32,
        request_date: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, title_id, status, request_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(title_id)
        .bind(ReservationStatus::Pending)
        .bind(request_date)
        .fetch_one(&mut *conn)
        .await?;

        Ok(reservation)
    }

    /// Oldest pending reservation for a title, or none
    pub async fn peek_next(
        &self,
        conn: &mut PgConnection,
        title_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE title_id = $1 AND status = $2
            ORDER BY request_date, id
            LIMIT 1
            "#,
        )
        .bind(title_id)
        .bind(ReservationStatus::Pending)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(reservation)
    }

    /// Set a reservation's status unconditionally
    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(reservation_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Complete the user's notified reservation for a title once they have
    /// actually borrowed the held copy. Returns false when none matched.
    pub async fn resolve_on_borrow(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        title_id: i32,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET status = $1
            WHERE user_id = $2 AND title_id = $3 AND status = $4
            "#,
        )
        .bind(ReservationStatus::Completed)
        .bind(user_id)
        .bind(title_id)
        .bind(ReservationStatus::Notified)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Find the notified reservation backing a hold
    pub async fn find_notified(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        title_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 AND title_id = $2 AND status = $3",
        )
        .bind(user_id)
        .bind(title_id)
        .bind(ReservationStatus::Notified)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(reservation)
    }
}
