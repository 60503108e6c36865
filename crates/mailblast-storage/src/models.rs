//! Storage models for Mailblast

use chrono::{DateTime, Utc};
use mailblast_common::types::{Campaign, CampaignReport, JobId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Job lifecycle state
///
/// Transitions move strictly forward:
/// `queued → (delayed →) active → completed | failed`.
/// A job may bounce between `delayed` and `active` while retries remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Delayed,
    Active,
    Completed,
    Failed,
}

impl JobState {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::Delayed => write!(f, "delayed"),
            JobState::Active => write!(f, "active"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobState::Queued),
            "delayed" => Ok(JobState::Delayed),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            _ => Err(format!("Invalid job state: {}", s)),
        }
    }
}

/// Persisted campaign job
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,

    /// Campaign payload as submitted
    pub payload: serde_json::Value,

    pub state: String,

    /// 0-100, updated after each batch
    pub progress: i32,

    pub attempts: i32,
    pub max_attempts: i32,

    /// Time at which the job becomes eligible to run; pushed forward by
    /// retry backoff
    pub run_at: DateTime<Utc>,

    /// Campaign report, interim while active and final once terminal
    pub report: Option<serde_json::Value>,

    /// Last error recorded by the worker
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Get state enum
    pub fn state_enum(&self) -> Option<JobState> {
        self.state.parse().ok()
    }

    /// Decode the campaign payload
    pub fn campaign(&self) -> Result<Campaign, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Decode the stored report, if any
    pub fn report(&self) -> Option<CampaignReport> {
        self.report
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
