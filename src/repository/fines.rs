//! Fines and payments repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{FineReason, PaymentStatus},
        fine::{Fine, Payment},
    },
};

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Postgres>,
}

impl FinesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get fine by ID inside a unit of work
    pub async fn get_by_id_tx(&self, conn: &mut PgConnection, id: i32) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    /// Whether a payment intent already exists for this gateway reference
    pub async fn payment_ref_exists(
        &self,
        conn: &mut PgConnection,
        external_ref: &str,
    ) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE external_ref = $1)")
                .bind(external_ref)
                .fetch_one(&mut *conn)
                .await?;

        Ok(exists)
    }

    /// One fine per loan: probe before insert (the schema's UNIQUE index
    /// on loan_id is the backstop)
    pub async fn exists_for_loan(
        &self,
        conn: &mut PgConnection,
        loan_id: i32,
    ) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM fines WHERE loan_id = $1)")
                .bind(loan_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(exists)
    }

    /// Create a fine for a loan
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        loan_id: i32,
        user_id: i32,
        amount: Decimal,
        reason: FineReason,
    ) -> AppResult<Fine> {
        let fine = sqlx::query_as::<_, Fine>(
            r#"
            INSERT INTO fines (loan_id, user_id, amount, reason, is_paid)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(user_id)
        .bind(amount)
        .bind(reason)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            // unique index on loan_id: a concurrent sweep or return slipped
            // past the EXISTS probe
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::DuplicateFine(format!("A fine already exists for loan {}", loan_id))
            } else {
                e.into()
            }
        })?;

        Ok(fine)
    }

    /// Mark a fine settled
    pub async fn mark_paid(&self, conn: &mut PgConnection, fine_id: i32) -> AppResult<()> {
        sqlx::query("UPDATE fines SET is_paid = TRUE WHERE id = $1")
            .bind(fine_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Fines for a user, unpaid first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(
            "SELECT * FROM fines WHERE user_id = $1 ORDER BY is_paid, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fines)
    }

    /// Record a payment intent against a fine
    pub async fn insert_payment(
        &self,
        conn: &mut PgConnection,
        fine_id: i32,
        external_ref: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (fine_id, external_ref, status, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(fine_id)
        .bind(external_ref)
        .bind(PaymentStatus::Pending)
        .bind(created_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(payment)
    }

    /// Find a payment by its gateway reference
    pub async fn get_payment_by_ref(
        &self,
        conn: &mut PgConnection,
        external_ref: &str,
    ) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE external_ref = $1")
            .bind(external_ref)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment with reference {} not found", external_ref))
            })
    }

    /// Settle a payment intent with the gateway outcome
    pub async fn settle_payment(
        &self,
        conn: &mut PgConnection,
        payment_id: i32,
        status: PaymentStatus,
        settled_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE payments SET status = $1, settled_at = $2 WHERE id = $3")
            .bind(status)
            .bind(settled_at)
            .bind(payment_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
