//! Queue Service - durable campaign job queue and worker pool

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mailblast_common::config::QueueConfig;
use mailblast_common::types::{Campaign, CampaignReport, JobId};
use mailblast_storage::models::{Job, JobState};
use mailblast_storage::{DatabasePool, JobRepository};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Notify, Semaphore};
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{debug, error, info, warn};

use super::rate_limiter::StartRateLimiter;
use crate::campaign::{CampaignRunner, ProgressSink};

/// Queue service errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Campaign audience is empty")]
    EmptyAudience,

    #[error("Invalid campaign: {0}")]
    InvalidCampaign(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Polling-friendly view of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub exists: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CampaignReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    fn not_found() -> Self {
        Self {
            exists: false,
            job_id: None,
            state: None,
            progress: None,
            result: None,
            failure_reason: None,
            attempts: None,
            created_at: None,
            started_at: None,
            finished_at: None,
        }
    }

    fn from_job(job: &Job) -> Self {
        Self {
            exists: true,
            job_id: Some(job.id),
            state: job.state_enum(),
            progress: Some(job.progress),
            result: job.report(),
            failure_reason: job.failure_reason.clone(),
            attempts: Some(job.attempts),
            created_at: Some(job.created_at),
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

/// Admin-view summary of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub state: Option<JobState>,
    pub progress: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CampaignReport>,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobSummary {
    fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            state: job.state_enum(),
            progress: job.progress,
            result: job.report(),
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}

/// Durable campaign queue: accepts submissions, drives the worker pool,
/// answers status lookups. Constructed once per process and shared by
/// reference; there is no ambient global queue.
#[derive(Clone)]
pub struct QueueService {
    repo: JobRepository,
    runner: Arc<dyn CampaignRunner>,
    config: QueueConfig,
    start_limiter: Arc<StartRateLimiter>,
    workers: Arc<Semaphore>,
    shutdown: Arc<Notify>,
    stopping: Arc<AtomicBool>,
}

impl QueueService {
    /// Create a new queue service
    pub fn new(db_pool: &DatabasePool, runner: Arc<dyn CampaignRunner>, config: QueueConfig) -> Self {
        Self {
            repo: JobRepository::new(db_pool.pool().clone()),
            runner,
            start_limiter: Arc::new(StartRateLimiter::new(
                config.start_limit_max,
                Duration::from_millis(config.start_limit_window_ms),
            )),
            workers: Arc::new(Semaphore::new(config.worker_concurrency)),
            shutdown: Arc::new(Notify::new()),
            stopping: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// The underlying job repository
    pub fn repository(&self) -> &JobRepository {
        &self.repo
    }

    /// Validate and persist a campaign; returns the job id immediately
    /// without waiting for processing
    pub async fn submit(&self, campaign: Campaign) -> Result<JobId, QueueError> {
        if campaign.audience.is_empty() {
            return Err(QueueError::EmptyAudience);
        }
        if campaign.subject.trim().is_empty() {
            return Err(QueueError::InvalidCampaign("subject is empty".to_string()));
        }
        if campaign.sender_name.trim().is_empty() {
            return Err(QueueError::InvalidCampaign("sender name is empty".to_string()));
        }

        let recipients = campaign.audience.len();
        let payload = serde_json::to_value(&campaign)
            .map_err(|e| QueueError::InvalidCampaign(e.to_string()))?;
        let job = self.repo.enqueue(payload, self.config.max_attempts).await?;

        info!(job_id = job.id, recipients, "Campaign queued");
        Ok(job.id)
    }

    /// Read-only status lookup; unknown or purged ids report `exists: false`
    pub async fn status(&self, job_id: JobId) -> Result<JobStatus, QueueError> {
        Ok(match self.repo.get(job_id).await? {
            Some(job) => JobStatus::from_job(&job),
            None => JobStatus::not_found(),
        })
    }

    /// Paginated admin view of jobs in one lifecycle state. The range is
    /// inclusive, `[start, end]`, newest first.
    pub async fn list_jobs(
        &self,
        state: JobState,
        start: i64,
        end: i64,
    ) -> Result<Vec<JobSummary>, QueueError> {
        let offset = start.max(0);
        let limit = (end - offset + 1).max(0);
        let jobs = self.repo.list_by_state(state, limit, offset).await?;
        Ok(jobs.iter().map(JobSummary::from_job).collect())
    }

    /// Return jobs orphaned in `active` by a previous process to the queue.
    /// Call once at startup, before `run`.
    pub async fn recover(&self) -> Result<u64, QueueError> {
        let requeued = self.repo.requeue_active().await?;
        if requeued > 0 {
            warn!(requeued, "Requeued jobs orphaned by a previous run");
        }
        Ok(requeued)
    }

    /// Run the worker loop until `shutdown` is called. Claims due jobs up to
    /// the concurrency and start-rate limits, then drains in-flight work
    /// before returning.
    pub async fn run(&self) {
        let mut ticker = interval(TokioDuration::from_millis(self.config.poll_interval_ms));

        info!(
            concurrency = self.config.worker_concurrency,
            poll_ms = self.config.poll_interval_ms,
            "Queue worker started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = ticker.tick() => {}
            }
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }

            if let Err(e) = self.sweep_retention().await {
                warn!(error = %e, "Retention sweep failed");
            }

            self.spawn_due_jobs().await;
        }

        // Drain: wait for every in-flight job to hand its permit back
        let _ = self
            .workers
            .acquire_many(self.config.worker_concurrency as u32)
            .await;
        info!("Queue worker stopped");
    }

    /// Stop claiming new jobs and let `run` drain in-flight work
    pub fn shutdown(&self) {
        info!("Queue shutdown requested");
        self.stopping.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    async fn spawn_due_jobs(&self) {
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            if self.workers.available_permits() == 0 {
                break;
            }
            if !self.start_limiter.try_acquire() {
                debug!("Job start rate limit reached, deferring");
                break;
            }

            match self.repo.claim_next_due(Utc::now()).await {
                Ok(Some(job)) => {
                    let Ok(permit) = Arc::clone(&self.workers).acquire_owned().await else {
                        break;
                    };
                    let service = self.clone();
                    tokio::spawn(async move {
                        service.process_job(job).await;
                        drop(permit);
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to claim job");
                    break;
                }
            }
        }
    }

    async fn process_job(&self, job: Job) {
        let job_id = job.id;
        info!(job_id, attempt = job.attempts, "Processing campaign job");

        let campaign = match job.campaign() {
            Ok(campaign) => campaign,
            Err(e) => {
                error!(job_id, error = %e, "Job payload is not a valid campaign");
                if let Err(e) = self
                    .repo
                    .mark_failed(job_id, &format!("invalid payload: {}", e))
                    .await
                {
                    error!(job_id, error = %e, "Failed to mark job failed");
                }
                return;
            }
        };

        match self.runner.run(job_id, &campaign).await {
            Ok(report) => {
                info!(
                    job_id,
                    success = report.success,
                    failed = report.failed,
                    "Campaign job completed"
                );

                let report = serde_json::to_value(&report).unwrap_or(serde_json::Value::Null);
                if let Err(e) = self.repo.mark_completed(job_id, &report).await {
                    error!(job_id, error = %e, "Failed to mark job completed");
                }
            }
            Err(e) => {
                warn!(job_id, error = %e, "Campaign job attempt failed");
                self.apply_retry_policy(&job, &e.to_string()).await;
            }
        }
    }

    async fn apply_retry_policy(&self, job: &Job, reason: &str) {
        if job.attempts >= job.max_attempts {
            error!(
                job_id = job.id,
                attempts = job.attempts,
                "Job exhausted retries, marking failed"
            );
            if let Err(e) = self.repo.mark_failed(job.id, reason).await {
                error!(job_id = job.id, error = %e, "Failed to mark job failed");
            }
            return;
        }

        let run_at = Utc::now() + backoff_delay(self.config.backoff_base_ms, job.attempts);
        match self.repo.mark_delayed(job.id, reason, run_at).await {
            Ok(Some(_)) => {
                info!(job_id = job.id, retry_at = %run_at, "Job scheduled for retry");
            }
            // The guard lost against max_attempts; close the job out
            Ok(None) => {
                if let Err(e) = self.repo.mark_failed(job.id, reason).await {
                    error!(job_id = job.id, error = %e, "Failed to mark job failed");
                }
            }
            Err(e) => {
                error!(job_id = job.id, error = %e, "Failed to schedule retry");
            }
        }
    }

    async fn sweep_retention(&self) -> Result<(), sqlx::Error> {
        let completed_cutoff =
            Utc::now() - ChronoDuration::seconds(self.config.completed_retention_secs);
        let purged = self
            .repo
            .purge_completed(completed_cutoff, self.config.completed_retention_count)
            .await?;
        if purged > 0 {
            debug!(purged, "Purged completed jobs past retention");
        }

        let failed_cutoff = Utc::now() - ChronoDuration::seconds(self.config.failed_retention_secs);
        let purged = self.repo.purge_failed(failed_cutoff).await?;
        if purged > 0 {
            debug!(purged, "Purged failed jobs past retention");
        }

        Ok(())
    }
}

/// Per-batch progress persisted straight onto the job row
#[async_trait]
impl ProgressSink for JobRepository {
    async fn update(
        &self,
        job_id: JobId,
        progress: i32,
        report: &CampaignReport,
    ) -> anyhow::Result<()> {
        let report = serde_json::to_value(report)?;
        self.update_progress(job_id, progress, &report).await?;
        Ok(())
    }
}

/// Exponential backoff: the base delay doubles for each completed attempt
fn backoff_delay(base_ms: u64, attempts: i32) -> ChronoDuration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    ChronoDuration::milliseconds(base_ms.saturating_mul(2u64.pow(exponent)) as i64)
}
