//! Stream binding repository
//!
//! A binding grants one user read access to one stream on one server. The
//! composite primary key `(user_id, server_id, stream_name)` makes duplicate
//! grants a constraint violation.

use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{StreamBinding, StreamInfo};

#[derive(Clone)]
pub struct StreamBindingRepository {
    pool: Pool<Sqlite>,
}

impl StreamBindingRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, binding: &StreamBinding) -> RepositoryResult<StreamBinding> {
        sqlx::query(
            "INSERT INTO stream_bindings (user_id, server_id, stream_name, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(binding.user_id)
        .bind(binding.server_id)
        .bind(&binding.stream_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert("insert_stream_binding", e))?;

        Ok(binding.clone())
    }

    /// Returns `false` when no such binding existed
    pub async fn delete(&self, binding: &StreamBinding) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "DELETE FROM stream_bindings
             WHERE user_id = ? AND server_id = ? AND stream_name = ?",
        )
        .bind(binding.user_id)
        .bind(binding.server_id)
        .bind(&binding.stream_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_for_user(&self, user_id: i64) -> RepositoryResult<Vec<StreamBinding>> {
        let bindings = sqlx::query_as::<_, StreamBinding>(
            "SELECT user_id, server_id, stream_name FROM stream_bindings
             WHERE user_id = ? ORDER BY server_id, stream_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bindings)
    }

    /// Bindings of `user_id` for `stream_name`, optionally narrowed to one server
    pub async fn find_for_user_stream(
        &self,
        user_id: i64,
        stream_name: &str,
        server_id: Option<i64>,
    ) -> RepositoryResult<Vec<StreamBinding>> {
        let bindings = sqlx::query_as::<_, StreamBinding>(
            "SELECT user_id, server_id, stream_name FROM stream_bindings
             WHERE user_id = ? AND stream_name = ? AND (? IS NULL OR server_id = ?)
             ORDER BY server_id",
        )
        .bind(user_id)
        .bind(stream_name)
        .bind(server_id)
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bindings)
    }

    /// The caller's streams with their server names
    pub async fn list_streams_for_user(&self, user_id: i64) -> RepositoryResult<Vec<StreamInfo>> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            "SELECT b.stream_name, b.server_id, s.name
             FROM stream_bindings b
             JOIN servers s ON s.id = b.server_id
             WHERE b.user_id = ?
             ORDER BY b.stream_name, b.server_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, server_id, server_name)| StreamInfo {
                name,
                server_id,
                server_name,
            })
            .collect())
    }
}
