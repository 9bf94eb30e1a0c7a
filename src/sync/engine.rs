//! Reconciliation of upstream traffic counters into the usage table
//!
//! A pass loads every registered server and processes each one on its own:
//! list streams, fetch one batched traffic report, then check-and-insert
//! every sample inside a single per-server unit of work. A failing server
//! rolls back its own unit and is reported as failed; the pass carries on
//! with the remaining servers.
//!
//! Re-running a pass over unchanged upstream data inserts nothing, because
//! every insert is preceded by an exact `(server, stream, second)` lookup in
//! the same transaction.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::credentials::CredentialStore;
use crate::errors::{AppError, AppResult};
use crate::models::{Server, TrafficReport, UsageRecord};
use crate::repositories::{UsageStore, UsageUnit};
use crate::utils::time::{canonical_timestamp, window_start};

/// What started a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    Scheduler,
    Manual,
    Startup,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTrigger::Scheduler => write!(f, "scheduler"),
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::Startup => write!(f, "startup"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServerStatus {
    Synced {
        /// Named streams listed by the server
        streams: usize,
        /// Samples in the traffic report
        samples: usize,
        inserted: usize,
        duplicates: usize,
        /// Samples dropped for an unrepresentable timestamp or negative bytes
        invalid: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerOutcome {
    pub server_id: i64,
    pub server_name: String,
    #[serde(flatten)]
    pub status: ServerStatus,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub trigger: SyncTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Lower bound (unix seconds) requested from every server
    pub window_from: i64,
    pub servers: Vec<ServerOutcome>,
}

impl RunReport {
    pub fn inserted(&self) -> usize {
        self.servers
            .iter()
            .map(|outcome| match outcome.status {
                ServerStatus::Synced { inserted, .. } => inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn duplicates(&self) -> usize {
        self.servers
            .iter()
            .map(|outcome| match outcome.status {
                ServerStatus::Synced { duplicates, .. } => duplicates,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.servers
            .iter()
            .filter(|outcome| matches!(outcome.status, ServerStatus::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct UnitCounts {
    inserted: usize,
    duplicates: usize,
}

pub struct ReconciliationEngine {
    credentials: Arc<dyn CredentialStore>,
    usage: Arc<dyn UsageStore>,
    lookback: Duration,
    max_concurrent_servers: usize,
}

impl ReconciliationEngine {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        usage: Arc<dyn UsageStore>,
        lookback: Duration,
        max_concurrent_servers: usize,
    ) -> Self {
        Self {
            credentials,
            usage,
            lookback,
            max_concurrent_servers: max_concurrent_servers.max(1),
        }
    }

    pub fn from_config(
        credentials: Arc<dyn CredentialStore>,
        usage: Arc<dyn UsageStore>,
        config: &SyncConfig,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(
            credentials,
            usage,
            config.lookback()?,
            config.max_concurrent_servers,
        ))
    }

    pub async fn run(&self, trigger: SyncTrigger) -> AppResult<RunReport> {
        self.run_at(Utc::now(), trigger).await
    }

    /// Run one pass with the window anchored at `now`
    ///
    /// Only a failure to load the server list fails the pass; per-server
    /// failures are reported in the returned [`RunReport`].
    pub async fn run_at(&self, now: DateTime<Utc>, trigger: SyncTrigger) -> AppResult<RunReport> {
        let started_at = Utc::now();
        let since = window_start(now, self.lookback);

        let servers = self.credentials.registered_servers().await?;
        if servers.is_empty() {
            info!("No media servers registered, nothing to synchronize");
        } else {
            info!(
                "Starting {} traffic sync of {} server(s) from {}",
                trigger,
                servers.len(),
                since
            );
        }

        let mut outcomes: Vec<ServerOutcome> = stream::iter(servers)
            .map(|server| self.process_server(server, since))
            .buffer_unordered(self.max_concurrent_servers)
            .collect()
            .await;
        outcomes.sort_by_key(|outcome| outcome.server_id);

        let report = RunReport {
            trigger,
            started_at,
            finished_at: Utc::now(),
            window_from: since,
            servers: outcomes,
        };

        if !report.servers.is_empty() {
            info!(
                "Traffic sync finished: {} server(s), {} inserted, {} duplicate(s), {} failed",
                report.servers.len(),
                report.inserted(),
                report.duplicates(),
                report.failed()
            );
        }

        Ok(report)
    }

    async fn process_server(&self, server: Server, since: i64) -> ServerOutcome {
        let status = match self.sync_server(&server, since).await {
            Ok(status) => status,
            Err(e) => {
                error!(
                    "Traffic sync failed for server {} ({}): {}",
                    server.id, server.name, e
                );
                ServerStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        ServerOutcome {
            server_id: server.id,
            server_name: server.name,
            status,
        }
    }

    async fn sync_server(&self, server: &Server, since: i64) -> Result<ServerStatus, AppError> {
        let client = self.credentials.client_for(server)?;

        let mut seen = BTreeSet::new();
        let stream_names: Vec<String> = client
            .list_streams()
            .await?
            .into_iter()
            .filter_map(|stream| stream.name)
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect();

        if stream_names.is_empty() {
            info!("No streams found on server {} ({})", server.id, server.name);
            return Ok(ServerStatus::Skipped {
                reason: "no streams".to_string(),
            });
        }

        let report = client.get_traffic_report(&stream_names, since).await?;
        let samples = report.values().map(Vec::len).sum();
        let (records, invalid) = collect_records(server.id, report);

        // Upstream calls are done; the transaction only spans local writes
        let mut unit = self.usage.begin_unit().await?;
        let counts = match apply_records(unit.as_mut(), &records).await {
            Ok(counts) => counts,
            Err(e) => {
                if let Err(rollback_err) = unit.rollback().await {
                    warn!(
                        "Rollback failed for server {} ({}): {}",
                        server.id, server.name, rollback_err
                    );
                }
                return Err(e);
            }
        };
        unit.commit().await?;

        debug!(
            "Server {} ({}): {} inserted, {} duplicate(s), {} invalid",
            server.id, server.name, counts.inserted, counts.duplicates, invalid
        );

        Ok(ServerStatus::Synced {
            streams: stream_names.len(),
            samples,
            inserted: counts.inserted,
            duplicates: counts.duplicates,
            invalid,
        })
    }
}

/// Turn a traffic report into usage records with canonical timestamps
///
/// Returns the records in report order and the number of dropped samples.
fn collect_records(server_id: i64, report: TrafficReport) -> (Vec<UsageRecord>, usize) {
    let mut records = Vec::new();
    let mut invalid = 0;

    for (stream_name, samples) in report {
        for sample in samples {
            let Some(recorded_at) = canonical_timestamp(sample.timestamp_ms) else {
                warn!(
                    "Dropping sample for '{}' with unrepresentable timestamp {}",
                    stream_name, sample.timestamp_ms
                );
                invalid += 1;
                continue;
            };
            if sample.bytes < 0 {
                warn!(
                    "Dropping sample for '{}' at {} with negative byte count {}",
                    stream_name, sample.timestamp_ms, sample.bytes
                );
                invalid += 1;
                continue;
            }
            records.push(UsageRecord {
                server_id,
                stream_name: stream_name.clone(),
                recorded_at,
                bytes_used: sample.bytes,
            });
        }
    }

    (records, invalid)
}

/// Check-then-insert, strictly in order, so a repeated key inside the same
/// batch sees the earlier insert.
async fn apply_records(unit: &mut dyn UsageUnit, records: &[UsageRecord]) -> AppResult<UnitCounts> {
    let mut counts = UnitCounts::default();
    for record in records {
        if unit.exists(&record.key()).await? {
            counts.duplicates += 1;
        } else {
            unit.insert(record).await?;
            counts.inserted += 1;
        }
    }
    Ok(counts)
}
