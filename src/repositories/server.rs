//! Server repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use super::traits::{QueryParams, Repository};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Server, ServerCreateRequest};

const SERVER_COLUMNS: &str = "id, name, url, username, password, created_at";

#[derive(Clone)]
pub struct ServerRepository {
    pool: Pool<Sqlite>,
}

impl ServerRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn find_by_url(&self, url: &str) -> RepositoryResult<Option<Server>> {
        let server = sqlx::query_as::<_, Server>(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(server)
    }
}

#[async_trait]
impl Repository<Server, i64> for ServerRepository {
    type CreateRequest = ServerCreateRequest;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Server>> {
        let server = sqlx::query_as::<_, Server>(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(server)
    }

    async fn find_all(&self, query: QueryParams) -> RepositoryResult<Vec<Server>> {
        let servers = sqlx::query_as::<_, Server>(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(query.sql_limit())
        .bind(query.sql_offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(servers)
    }

    async fn create(&self, request: ServerCreateRequest) -> RepositoryResult<Server> {
        sqlx::query_as::<_, Server>(&format!(
            "INSERT INTO servers (name, url, username, password, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {SERVER_COLUMNS}"
        ))
        .bind(&request.name)
        .bind(&request.url)
        .bind(&request.username)
        .bind(&request.password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert("insert_server", e))
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM servers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
