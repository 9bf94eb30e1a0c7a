//! Usage fact persistence
//!
//! Traffic facts are append-only. The reconciliation engine is the only
//! writer and it writes through a [`UsageUnit`]: one transaction per server,
//! with the existence check running inside the same transaction so it sees
//! rows inserted earlier in the unit.
//!
//! Units are serialized per store. Servers are fetched concurrently but
//! SQLite has a single writer, and a deferred transaction that reads before
//! it writes fails with `SQLITE_BUSY` instead of waiting for the lock.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Sqlite, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::RepositoryResult;
use crate::models::{DailyTraffic, UsageKey, UsageRecord};
use crate::utils::time::day_range_seconds;

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Open a unit of work for one server's inserts
    async fn begin_unit(&self) -> RepositoryResult<Box<dyn UsageUnit>>;

    /// Bytes per UTC day for one stream, ascending by date, inclusive range
    async fn daily_usage(
        &self,
        server_id: i64,
        stream_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<DailyTraffic>>;
}

/// A transactional batch of usage inserts
///
/// Dropping a unit without committing discards its inserts.
#[async_trait]
pub trait UsageUnit: Send {
    async fn exists(&mut self, key: &UsageKey) -> RepositoryResult<bool>;

    async fn insert(&mut self, record: &UsageRecord) -> RepositoryResult<()>;

    async fn commit(self: Box<Self>) -> RepositoryResult<()>;

    async fn rollback(self: Box<Self>) -> RepositoryResult<()>;
}

#[derive(Clone)]
pub struct SqliteUsageStore {
    pool: Pool<Sqlite>,
    write_lock: Arc<Mutex<()>>,
}

impl SqliteUsageStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Total number of stored facts
    pub async fn count(&self) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM traffic_usage")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl UsageStore for SqliteUsageStore {
    async fn begin_unit(&self) -> RepositoryResult<Box<dyn UsageUnit>> {
        let guard = self.write_lock.clone().lock_owned().await;
        let mut tx = self.pool.begin().await?;

        // Take the database write lock before the first read so the unit
        // never has to upgrade a read lock (other writers share the file)
        sqlx::query("DELETE FROM traffic_usage WHERE 0")
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(SqliteUsageUnit { tx, _guard: guard }))
    }

    async fn daily_usage(
        &self,
        server_id: i64,
        stream_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<DailyTraffic>> {
        let (from, until) = day_range_seconds(start_date, end_date);

        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT date(recorded_at, 'unixepoch') AS day, SUM(bytes_used)
             FROM traffic_usage
             WHERE server_id = ? AND stream_name = ?
               AND recorded_at >= ? AND recorded_at < ?
             GROUP BY day
             ORDER BY day",
        )
        .bind(server_id)
        .bind(stream_name)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(day, bytes_used)| {
                let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|e| {
                    crate::errors::RepositoryError::query_failed(
                        "daily_usage",
                        format!("unexpected day '{day}': {e}"),
                    )
                })?;
                Ok(DailyTraffic { date, bytes_used })
            })
            .collect()
    }
}

/// Holds the store's write lock until committed, rolled back or dropped
pub struct SqliteUsageUnit {
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl UsageUnit for SqliteUsageUnit {
    async fn exists(&mut self, key: &UsageKey) -> RepositoryResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM traffic_usage
             WHERE server_id = ? AND stream_name = ? AND recorded_at = ?
             LIMIT 1",
        )
        .bind(key.server_id)
        .bind(&key.stream_name)
        .bind(key.recorded_at)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(found.is_some())
    }

    async fn insert(&mut self, record: &UsageRecord) -> RepositoryResult<()> {
        sqlx::query(
            "INSERT INTO traffic_usage (server_id, stream_name, recorded_at, bytes_used)
             VALUES (?, ?, ?, ?)",
        )
        .bind(record.server_id)
        .bind(&record.stream_name)
        .bind(record.recorded_at.timestamp())
        .bind(record.bytes_used)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        let SqliteUsageUnit { tx, _guard } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        let SqliteUsageUnit { tx, _guard } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
