//! Campaign submission handlers

use axum::{extract::State, http::StatusCode, Json};
use mailblast_common::types::{Campaign, JobId};
use mailblast_core::QueueError;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::ErrorResponse;
use crate::AppState;

/// Response to a campaign submission
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitCampaignResponse {
    pub job_id: JobId,
    pub status: String,
    pub message: String,
}

/// Submit a campaign for background dispatch
///
/// POST /api/v1/campaigns
pub async fn submit_campaign(
    State(state): State<Arc<AppState>>,
    Json(campaign): Json<Campaign>,
) -> Result<(StatusCode, Json<SubmitCampaignResponse>), (StatusCode, Json<ErrorResponse>)> {
    match state.queue.submit(campaign).await {
        Ok(job_id) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitCampaignResponse {
                job_id,
                status: "queued".to_string(),
                message: "Campaign has been queued for processing".to_string(),
            }),
        )),
        Err(e @ (QueueError::EmptyAudience | QueueError::InvalidCampaign(_))) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid_campaign".to_string(),
                message: e.to_string(),
            }),
        )),
        Err(e) => {
            error!(error = %e, "Failed to queue campaign");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to queue campaign".to_string(),
                }),
            ))
        }
    }
}
