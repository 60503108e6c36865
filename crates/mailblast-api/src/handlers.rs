//! API handlers

pub mod campaigns;
pub mod health;
pub mod jobs;

use serde::Serialize;
use utoipa::ToSchema;

/// Error response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
