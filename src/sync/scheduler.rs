//! Cron-driven periodic synchronization

use chrono::Utc;
use cron::Schedule;
use tracing::{error, info, warn};

use super::engine::SyncTrigger;
use super::runner::SyncRunner;
use crate::errors::AppError;

pub struct SyncScheduler {
    runner: SyncRunner,
    schedule: Schedule,
    run_on_startup: bool,
}

impl SyncScheduler {
    pub fn new(runner: SyncRunner, schedule: Schedule, run_on_startup: bool) -> Self {
        Self {
            runner,
            schedule,
            run_on_startup,
        }
    }

    /// Sleep until each fire time and run one pass
    ///
    /// Passes are awaited in turn, so the scheduler never overlaps itself.
    /// Returns only when the schedule has no further fire times.
    pub async fn start(self) {
        info!("Starting sync scheduler");

        if self.run_on_startup {
            self.run_pass(SyncTrigger::Startup).await;
        }

        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!("Sync schedule has no upcoming fire times, scheduler stopping");
                return;
            };
            info!("Next traffic sync at {}", next.format("%Y-%m-%d %H:%M:%S UTC"));

            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            self.run_pass(SyncTrigger::Scheduler).await;
        }
    }

    async fn run_pass(&self, trigger: SyncTrigger) {
        match self.runner.trigger(trigger).await {
            Ok(_) => {}
            Err(AppError::Conflict { .. }) => {
                warn!("Skipping {} sync: previous pass still running", trigger);
            }
            Err(e) => error!("Traffic sync pass failed: {}", e),
        }
    }
}
