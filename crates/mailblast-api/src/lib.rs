//! Mailblast API - REST API server
//!
//! This crate provides the submission and monitoring API for Mailblast:
//! campaign submission, job status polling, the queue admin view, and
//! health probes.

pub mod handlers;
pub mod openapi;
pub mod routes;

use mailblast_core::QueueService;
use mailblast_storage::DatabasePool;
use std::sync::Arc;

pub use openapi::create_openapi_routes;
pub use routes::create_router;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabasePool,
    pub queue: Arc<QueueService>,
}
