//! Job status and queue admin handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mailblast_common::types::JobId;
use mailblast_core::{JobStatus, JobSummary};
use mailblast_storage::JobState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::ErrorResponse;
use crate::AppState;

/// Query parameters for the queue admin view. The range is inclusive,
/// Bull-style: `start=0&end=9` returns up to ten jobs.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_state")]
    pub state: String,

    #[serde(default)]
    pub start: i64,

    #[serde(default = "default_end")]
    pub end: i64,
}

fn default_state() -> String {
    "completed".to_string()
}

fn default_end() -> i64 {
    10
}

/// Job list response
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub data: Vec<JobSummary>,
    pub state: String,
    pub start: i64,
    pub end: i64,
}

/// Poll one job's status
///
/// GET /api/v1/jobs/:job_id
///
/// Unknown or purged ids answer 200 with `exists: false` rather than an
/// HTTP error.
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<JobId>,
) -> Result<Json<JobStatus>, (StatusCode, Json<ErrorResponse>)> {
    state.queue.status(job_id).await.map(Json).map_err(|e| {
        error!(job_id, error = %e, "Failed to read job status");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal_error".to_string(),
                message: "Failed to read job status".to_string(),
            }),
        )
    })
}

/// List jobs by lifecycle state
///
/// GET /api/v1/jobs?state=&start=&end=
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let job_state: JobState = query.state.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid_state".to_string(),
                message: format!("Unknown job state: {}", query.state),
            }),
        )
    })?;

    let data = state
        .queue
        .list_jobs(job_state, query.start, query.end)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list jobs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to list jobs".to_string(),
                }),
            )
        })?;

    Ok(Json(JobListResponse {
        data,
        state: query.state,
        start: query.start,
        end: query.end,
    }))
}
