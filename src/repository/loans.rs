//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::LoanStatus,
        loan::{Loan, LoanDetails},
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID inside a unit of work
    pub async fn get_by_id_tx(&self, conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Count live (on-loan or overdue) loans for a user
    pub async fn count_live_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND status IN ($2, $3)",
        )
        .bind(user_id)
        .bind(LoanStatus::OnLoan)
        .bind(LoanStatus::Overdue)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Create a new loan row
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        copy_id: i32,
        title_id: i32,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, copy_id, title_id, loan_date, due_date, status, renewal_count)
            VALUES ($1, $2, $3, $4, $5, $6, 0)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(copy_id)
        .bind(title_id)
        .bind(loan_date)
        .bind(due_date)
        .bind(LoanStatus::OnLoan)
        .fetch_one(&mut *conn)
        .await?;

        Ok(loan)
    }

    /// Close a loan with its return outcome
    pub async fn close(
        &self,
        conn: &mut PgConnection,
        loan_id: i32,
        status: LoanStatus,
        return_date: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE loans SET status = $1, return_date = $2 WHERE id = $3")
            .bind(status)
            .bind(return_date)
            .bind(loan_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Extend the due date and bump the renewal counter
    pub async fn renew(
        &self,
        conn: &mut PgConnection,
        loan_id: i32,
        new_due_date: DateTime<Utc>,
        new_renewal_count: i16,
    ) -> AppResult<()> {
        sqlx::query("UPDATE loans SET due_date = $1, renewal_count = $2 WHERE id = $3")
            .bind(new_due_date)
            .bind(new_renewal_count)
            .bind(loan_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Conditionally flip an on-loan loan to overdue. Returns false if the
    /// loan was no longer on-loan, which makes the sweep idempotent.
    pub async fn mark_overdue(
        &self,
        conn: &mut PgConnection,
        loan_id: i32,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE loans SET status = $1 WHERE id = $2 AND status = $3")
            .bind(LoanStatus::Overdue)
            .bind(loan_id)
            .bind(LoanStatus::OnLoan)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Next batch of on-loan loans past their due date
    pub async fn list_overdue_batch(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE status = $1 AND due_date < $2
            ORDER BY due_date
            LIMIT $3
            "#,
        )
        .bind(LoanStatus::OnLoan)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Get a loan with joined title and copy detail
    pub async fn get_details(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let row = sqlx::query(
            r#"
            SELECT l.*, t.title, c.shelf_tag
            FROM loans l
            JOIN titles t ON l.title_id = t.id
            JOIN book_copies c ON l.copy_id = c.id
            WHERE l.id = $1
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        Ok(Self::details_from_row(&row, Utc::now()))
    }

    /// Get loans for a user, live loans first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.*, t.title, c.shelf_tag
            FROM loans l
            JOIN titles t ON l.title_id = t.id
            JOIN book_copies c ON l.copy_id = c.id
            WHERE l.user_id = $1
            ORDER BY l.return_date IS NOT NULL, l.due_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(rows.iter().map(|row| Self::details_from_row(row, now)).collect())
    }

    fn details_from_row(row: &sqlx::postgres::PgRow, now: DateTime<Utc>) -> LoanDetails {
        let status: LoanStatus = row.get("status");
        let due_date: DateTime<Utc> = row.get("due_date");

        LoanDetails {
            id: row.get("id"),
            user_id: row.get("user_id"),
            copy_id: row.get("copy_id"),
            title_id: row.get("title_id"),
            title: row.get("title"),
            shelf_tag: row.get("shelf_tag"),
            loan_date: row.get("loan_date"),
            due_date,
            return_date: row.get("return_date"),
            status,
            renewal_count: row.get("renewal_count"),
            is_overdue: status.is_live() && due_date < now,
        }
    }
}
