//! Single-flight wrapper around the reconciliation engine
//!
//! Overlapping passes against the same server could both see a key as
//! absent and insert it twice. The scheduler and the manual admin trigger
//! therefore share one [`SyncRunner`], which refuses to start a pass while
//! another is in progress.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use super::engine::{ReconciliationEngine, RunReport, SyncTrigger};
use crate::errors::{AppError, AppResult};

#[derive(Clone)]
pub struct SyncRunner {
    engine: Arc<ReconciliationEngine>,
    running: Arc<Mutex<()>>,
    last_report: Arc<RwLock<Option<RunReport>>>,
}

impl SyncRunner {
    pub fn new(engine: ReconciliationEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            running: Arc::new(Mutex::new(())),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    /// Run one pass now
    ///
    /// Fails with `Conflict` when a pass is already running.
    pub async fn trigger(&self, trigger: SyncTrigger) -> AppResult<RunReport> {
        let _guard = self.running.try_lock().map_err(|_| {
            warn!("Ignoring {} sync request: a pass is already running", trigger);
            AppError::conflict("A synchronization pass is already running")
        })?;

        let report = self.engine.run(trigger).await?;
        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub async fn last_report(&self) -> Option<RunReport> {
        self.last_report.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialStore;
    use crate::errors::{RepositoryResult, UpstreamError};
    use crate::models::Server;
    use crate::repositories::{UsageStore, UsageUnit};
    use crate::upstream::UpstreamApi;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Blocks the pass inside `registered_servers` until released
    struct GatedCredentials {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CredentialStore for GatedCredentials {
        async fn registered_servers(&self) -> RepositoryResult<Vec<Server>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }

        async fn server(&self, _: i64) -> RepositoryResult<Option<Server>> {
            Ok(None)
        }

        fn connect(&self, _: &str, _: &str, _: &str) -> Result<Arc<dyn UpstreamApi>, UpstreamError> {
            Err(UpstreamError::configuration("unused"))
        }
    }

    struct NoUsage;

    #[async_trait]
    impl UsageStore for NoUsage {
        async fn begin_unit(&self) -> RepositoryResult<Box<dyn UsageUnit>> {
            unreachable!("no servers are registered")
        }

        async fn daily_usage(
            &self,
            _: i64,
            _: &str,
            _: NaiveDate,
            _: NaiveDate,
        ) -> RepositoryResult<Vec<crate::models::DailyTraffic>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_rejects_overlapping_pass() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let engine = ReconciliationEngine::new(
            Arc::new(GatedCredentials {
                entered: entered.clone(),
                release: release.clone(),
            }),
            Arc::new(NoUsage),
            Duration::from_secs(3600),
            1,
        );
        let runner = SyncRunner::new(engine);
        assert!(runner.last_report().await.is_none());

        let background = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.trigger(SyncTrigger::Scheduler).await })
        };
        entered.notified().await;

        assert!(runner.is_running());
        let err = runner.trigger(SyncTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        release.notify_one();
        let report = background.await.unwrap().unwrap();
        assert_eq!(report.trigger, SyncTrigger::Scheduler);
        assert!(!runner.is_running());
        assert_eq!(runner.last_report().await.unwrap().trigger, SyncTrigger::Scheduler);
    }
}
