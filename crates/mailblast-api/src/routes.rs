//! API routes

use axum::{
    routing::{get, post},
    Router,
};
use mailblast_core::QueueService;
use mailblast_storage::DatabasePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{campaigns, health, jobs};
use crate::openapi::create_openapi_routes;
use crate::AppState;

/// Create the API router
pub fn create_router(db_pool: DatabasePool, queue: Arc<QueueService>) -> Router {
    let state = Arc::new(AppState { db_pool, queue });

    // Health check routes
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/detailed", get(health::health_detailed))
        .with_state(state.clone());

    // Campaign submission
    let campaign_routes = Router::new().route("/", post(campaigns::submit_campaign));

    // Job status and queue admin view
    let job_routes = Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/:job_id", get(jobs::get_job_status));

    let api_v1 = Router::new()
        .nest("/campaigns", campaign_routes)
        .nest("/jobs", job_routes)
        .with_state(state);

    // OpenAPI documentation routes
    let openapi_routes = create_openapi_routes();

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .merge(openapi_routes)
        .layer(TraceLayer::new_for_http())
}
