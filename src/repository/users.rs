//! Members repository: policy provider and account standing

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::AccountStatus,
        user::{MembershipPolicy, User},
    },
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Borrowing policy for a member. This is the membership provider
    /// contract the circulation core consumes.
    pub async fn get_policy(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
    ) -> AppResult<MembershipPolicy> {
        sqlx::query_as::<_, MembershipPolicy>(
            "SELECT max_active_loans, loan_days, account_status FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }

    /// Update a member's account standing
    pub async fn set_account_status(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        status: AccountStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET account_status = $1 WHERE id = $2")
            .bind(status)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
