//! Job repository
//!
//! All lifecycle transitions are single UPDATE statements guarded by the
//! current state, so a job can only move forward through the state machine
//! and at most one worker ever owns an active job.

use chrono::{DateTime, Utc};
use mailblast_common::types::JobId;
use sqlx::SqlitePool;

use crate::models::{Job, JobState};

/// Job repository
#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Create a new job repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist a new job in `queued` state
    pub async fn enqueue(
        &self,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Job, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (payload, state, progress, attempts, max_attempts, run_at, created_at)
            VALUES (?, 'queued', 0, 0, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&payload)
        .bind(max_attempts)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a job by ID
    pub async fn get(&self, id: JobId) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Atomically claim the oldest due `queued`/`delayed` job and mark it
    /// `active`. SQLite serializes writers, so this single UPDATE is the
    /// equivalent of a `FOR UPDATE SKIP LOCKED` claim: no two workers can
    /// win the same job.
    pub async fn claim_next_due(&self, now: DateTime<Utc>) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                state = 'active',
                attempts = attempts + 1,
                started_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE state IN ('queued', 'delayed') AND run_at <= ?
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    /// Record interim progress and report for an active job
    pub async fn update_progress(
        &self,
        id: JobId,
        progress: i32,
        report: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET progress = ?, report = ? WHERE id = ? AND state = 'active'",
        )
        .bind(progress)
        .bind(report)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an active job as completed with its final report
    pub async fn mark_completed(
        &self,
        id: JobId,
        report: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                state = 'completed',
                progress = 100,
                report = ?,
                finished_at = ?
            WHERE id = ? AND state = 'active'
            RETURNING *
            "#,
        )
        .bind(report)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark an active job as failed after retries are exhausted
    pub async fn mark_failed(
        &self,
        id: JobId,
        reason: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                state = 'failed',
                failure_reason = ?,
                finished_at = ?
            WHERE id = ? AND state = 'active'
            RETURNING *
            "#,
        )
        .bind(reason)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Push an active job back to `delayed` for a retry at `run_at`
    pub async fn mark_delayed(
        &self,
        id: JobId,
        reason: &str,
        run_at: DateTime<Utc>,
    ) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                state = 'delayed',
                failure_reason = ?,
                run_at = ?
            WHERE id = ? AND state = 'active' AND attempts < max_attempts
            RETURNING *
            "#,
        )
        .bind(reason)
        .bind(run_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// List jobs in a given state, newest first
    pub async fn list_by_state(
        &self,
        state: JobState,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE state = ?
            ORDER BY id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(state.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Count jobs in a given state
    pub async fn count_by_state(&self, state: JobState) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE state = ?")
            .bind(state.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Return jobs left `active` by a dead process to `queued`. Called once
    /// at startup, before any worker runs.
    pub async fn requeue_active(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE jobs SET state = 'queued', run_at = ? WHERE state = 'active'")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Purge completed jobs past the retention age or beyond the newest
    /// `keep_count`
    pub async fn purge_completed(
        &self,
        cutoff: DateTime<Utc>,
        keep_count: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE state = 'completed'
              AND (finished_at < ?
                   OR id NOT IN (
                       SELECT id FROM jobs
                       WHERE state = 'completed'
                       ORDER BY id DESC
                       LIMIT ?))
            "#,
        )
        .bind(cutoff)
        .bind(keep_count)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Purge failed jobs past the (longer) retention age
    pub async fn purge_failed(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE state = 'failed' AND finished_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
