//! Catalog titles repository (read-only boundary plus the borrowed counter)

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::title::Title,
};

#[derive(Clone)]
pub struct TitlesRepository;

impl TitlesRepository {
    pub fn new() -> Self {
        Self
    }

    /// Get title inside a unit of work
    pub async fn get_by_id_tx(&self, conn: &mut PgConnection, id: i32) -> AppResult<Title> {
        sqlx::query_as::<_, Title>("SELECT * FROM titles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Title with id {} not found", id)))
    }

    /// Adjust the title's borrowed counter by `delta`
    pub async fn adjust_borrowed(
        &self,
        conn: &mut PgConnection,
        title_id: i32,
        delta: i32,
    ) -> AppResult<()> {
        sqlx::query("UPDATE titles SET borrowed_count = borrowed_count + $1 WHERE id = $2")
            .bind(delta)
            .bind(title_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
