use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::price_check::{CheckSummary, PriceChecker};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub completed_runs: u64,
    pub failed_runs: u64,
    pub skipped_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_summary: Option<CheckSummary>,
    pub last_error: Option<String>,
}

/// In-process cron trigger for the batch price check. A tick that fires while
/// another pass is still going (from a previous tick or an HTTP trigger) is
/// skipped.
pub struct PriceCheckScheduler {
    scheduler: JobScheduler,
    checker: Arc<PriceChecker>,
    stats: Arc<RwLock<SchedulerStats>>,
    config: SchedulerConfig,
    job_id: Option<Uuid>,
}

impl PriceCheckScheduler {
    pub async fn new(checker: Arc<PriceChecker>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            checker,
            stats: Arc::new(RwLock::new(SchedulerStats::default())),
            config,
            job_id: None,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        let checker = Arc::clone(&self.checker);
        let stats = Arc::clone(&self.stats);

        let job = Job::new_async(self.config.cron.as_str(), move |_uuid, _l| {
            let checker = Arc::clone(&checker);
            let stats = Arc::clone(&stats);

            Box::pin(async move {
                Self::execute(checker, stats).await;
            })
        })?;

        self.job_id = Some(self.scheduler.add(job).await?);
        self.scheduler.start().await?;
        tracing::info!(cron = %self.config.cron, "Price check scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(job_id) = self.job_id.take() {
            self.scheduler.remove(&job_id).await?;
        }
        self.scheduler.shutdown().await?;

        let stats = self.stats.read().await;
        tracing::info!(
            completed = stats.completed_runs,
            failed = stats.failed_runs,
            skipped = stats.skipped_runs,
            last_run = ?stats.last_run,
            "Price check scheduler shutdown"
        );
        Ok(())
    }

    async fn execute(checker: Arc<PriceChecker>, stats: Arc<RwLock<SchedulerStats>>) -> Option<CheckSummary> {
        let started = Utc::now();
        let Some(outcome) = checker.try_run().await else {
            tracing::warn!("Previous price check still running; skipping this tick");
            stats.write().await.skipped_runs += 1;
            return None;
        };

        let mut stats = stats.write().await;
        stats.last_run = Some(started);
        match outcome {
            Ok(report) => {
                stats.completed_runs += 1;
                stats.last_summary = Some(report.results.clone());
                stats.last_error = None;
                Some(report.results)
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled price check failed");
                stats.failed_runs += 1;
                stats.last_error = Some(e.to_string());
                None
            }
        }
    }
}
