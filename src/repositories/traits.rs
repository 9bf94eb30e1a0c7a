//! Repository trait definitions

use async_trait::async_trait;
use crate::errors::RepositoryResult;

/// Core repository trait
///
/// Rows in this application are created and read; nothing is updated in
/// place, so the trait stops at create/read/count.
///
/// # Type Parameters
///
/// * `T` - The entity type (e.g., Server, User)
/// * `ID` - The identifier type
#[async_trait]
pub trait Repository<T, ID: Send + 'static>: Send + Sync {
    /// Request type for creating new entities
    type CreateRequest: Send;

    /// Find an entity by its ID
    ///
    /// * `Ok(Some(T))` - Entity found
    /// * `Ok(None)` - Entity not found
    async fn find_by_id(&self, id: ID) -> RepositoryResult<Option<T>>;

    /// Find entities ordered by ID, honouring `limit`/`offset`
    async fn find_all(&self, query: QueryParams) -> RepositoryResult<Vec<T>>;

    /// Create a new entity; unique violations surface as
    /// `RepositoryError::ConstraintViolation`
    async fn create(&self, request: Self::CreateRequest) -> RepositoryResult<T>;

    /// Count all entities
    async fn count(&self) -> RepositoryResult<u64>;

    /// Check if an entity exists by ID
    async fn exists(&self, id: ID) -> RepositoryResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}

/// Common query parameters used across repositories
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    /// Limit number of results
    pub limit: Option<u32>,
    /// Offset for results
    pub offset: Option<u32>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set limit and offset
    pub fn limit(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// SQLite `LIMIT` value; `-1` means unbounded
    pub fn sql_limit(&self) -> i64 {
        self.limit.map(i64::from).unwrap_or(-1)
    }

    pub fn sql_offset(&self) -> i64 {
        self.offset.map(i64::from).unwrap_or(0)
    }
}
