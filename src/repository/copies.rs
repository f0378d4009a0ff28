//! Copy registry: authoritative status of each physical copy
//!
//! The copy's status column arbitrates every claim. All transitions are
//! conditional updates checking the status the caller observed, so a lost
//! race surfaces as `ConcurrentConflict` instead of overwriting the winner.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{copy::BookCopy, enums::CopyStatus},
};

#[derive(Clone)]
pub struct CopiesRepository;

impl CopiesRepository {
    pub fn new() -> Self {
        Self
    }

    /// Read-only probe for a copy the user could claim right now.
    ///
    /// Prefers a copy already on hold for this user with an unexpired hold
    /// (expiry checked against `now`, so stale holds fail closed), then
    /// falls back to any available copy.
    pub async fn find_claimable(
        &self,
        conn: &mut PgConnection,
        title_id: i32,
        for_user: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Option<BookCopy>> {
        let held = sqlx::query_as::<_, BookCopy>(
            r#"
            SELECT * FROM book_copies
            WHERE title_id = $1 AND status = $2 AND held_by_user = $3 AND hold_expiry > $4
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(title_id)
        .bind(CopyStatus::OnHold)
        .bind(for_user)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        if held.is_some() {
            return Ok(held);
        }

        let available = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE title_id = $1 AND status = $2 ORDER BY id LIMIT 1",
        )
        .bind(title_id)
        .bind(CopyStatus::Available)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(available)
    }

    /// Conditionally transition a copy to `OnLoan`, clearing holder fields.
    ///
    /// Compare-and-swap: succeeds only if the status still equals
    /// `expected` at write time (and, for a held copy, the hold is still
    /// unexpired). A lost race is reported, never retried here; fairness
    /// decisions belong to the caller.
    pub async fn claim(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
        expected: CopyStatus,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE book_copies
            SET status = $1, held_by_user = NULL, hold_expiry = NULL
            WHERE id = $2 AND status = $3
              AND ($3 <> $4 OR hold_expiry > $5)
            "#,
        )
        .bind(CopyStatus::OnLoan)
        .bind(copy_id)
        .bind(expected)
        .bind(CopyStatus::OnHold)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ConcurrentConflict(format!(
                "Copy {} was taken by another request, please retry",
                copy_id
            )));
        }

        Ok(())
    }

    /// Transition a returned copy out of circulation: back to the shelf or
    /// permanently lost. Holder fields are cleared either way. Only the
    /// return path may call this; it owns the on-loan copy inside its
    /// transaction, so no condition is needed. Hold teardown goes through
    /// `release_hold`.
    pub async fn release(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
        to: CopyStatus,
    ) -> AppResult<()> {
        debug_assert!(matches!(to, CopyStatus::Available | CopyStatus::Lost));

        sqlx::query(
            "UPDATE book_copies SET status = $1, held_by_user = NULL, hold_expiry = NULL WHERE id = $2",
        )
        .bind(to)
        .bind(copy_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Conditionally release a held copy back to the shelf.
    ///
    /// Compare-and-swap like `claim`: succeeds only while the hold is still
    /// in place for `held_by`. Returns false when a concurrent claim got the
    /// copy first, in which case the caller must leave every related row
    /// untouched.
    pub async fn release_hold(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
        held_by: i32,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE book_copies
            SET status = $1, held_by_user = NULL, hold_expiry = NULL
            WHERE id = $2 AND status = $3 AND held_by_user = $4
            "#,
        )
        .bind(CopyStatus::Available)
        .bind(copy_id)
        .bind(CopyStatus::OnHold)
        .bind(held_by)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Place a hold on an available copy for a promoted reservation.
    /// Conditional on the copy still being available.
    pub async fn place_hold(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
        user_id: i32,
        expiry: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE book_copies
            SET status = $1, held_by_user = $2, hold_expiry = $3
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(CopyStatus::OnHold)
        .bind(user_id)
        .bind(expiry)
        .bind(copy_id)
        .bind(CopyStatus::Available)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ConcurrentConflict(format!(
                "Copy {} is no longer available for a hold",
                copy_id
            )));
        }

        Ok(())
    }

    /// The copy currently held for a user on a title, expired or not
    pub async fn find_held_for_user(
        &self,
        conn: &mut PgConnection,
        title_id: i32,
        user_id: i32,
    ) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE title_id = $1 AND status = $2 AND held_by_user = $3",
        )
        .bind(title_id)
        .bind(CopyStatus::OnHold)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(copy)
    }

    /// Count available copies of a title
    pub async fn available_count(
        &self,
        conn: &mut PgConnection,
        title_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_copies WHERE title_id = $1 AND status = $2",
        )
        .bind(title_id)
        .bind(CopyStatus::Available)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Copies whose hold expired before `now`, oldest expiry first
    pub async fn list_expired_holds(
        &self,
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE status = $1 AND hold_expiry <= $2 ORDER BY hold_expiry",
        )
        .bind(CopyStatus::OnHold)
        .bind(now)
        .fetch_all(&mut *conn)
        .await?;

        Ok(copies)
    }

    /// Available copies of titles that have a pending queue, for the
    /// sweeper's promotion pass
    pub async fn list_available_with_waiters(
        &self,
        conn: &mut PgConnection,
    ) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            r#"
            SELECT c.* FROM book_copies c
            WHERE c.status = $1
              AND EXISTS (
                  SELECT 1 FROM reservations r
                  WHERE r.title_id = c.title_id AND r.status = $2
              )
            ORDER BY c.title_id, c.id
            "#,
        )
        .bind(CopyStatus::Available)
        .bind(crate::models::enums::ReservationStatus::Pending)
        .fetch_all(&mut *conn)
        .await?;

        Ok(copies)
    }
}
