//! Mailblast - campaign dispatcher entry point

use anyhow::Result;
use mailblast_common::config::Config;
use mailblast_core::{
    AttachmentResolver, BatchScheduler, DisabledImageRenderer, QueueService, SendExecutor,
    SmtpMailer,
};
use mailblast_storage::{DatabasePool, JobRepository};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting Mailblast campaign dispatcher...");

    // Load configuration
    let config = Config::load()?;

    // Initialize the job store
    let db_pool = DatabasePool::new(&config.database).await?;
    db_pool.migrate().await?;

    // Wire the dispatch engine: transport → executor → scheduler → queue
    let transport = Arc::new(SmtpMailer::new(&config.smtp)?);
    let resolver = AttachmentResolver::new(Arc::new(DisabledImageRenderer));
    let executor = Arc::new(SendExecutor::new(
        transport,
        resolver,
        config.smtp.from_address.clone(),
    ));
    let progress = Arc::new(JobRepository::new(db_pool.pool().clone()));
    let scheduler = Arc::new(BatchScheduler::new(executor, progress, config.batch.clone()));
    let queue = Arc::new(QueueService::new(
        &db_pool,
        scheduler,
        config.queue.clone(),
    ));

    // Reclaim jobs orphaned by a previous process
    queue.recover().await?;

    // Start the queue worker
    let worker_handle = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.run().await })
    };

    // Start the API server
    let app = mailblast_api::create_router(db_pool.clone(), queue.clone());
    let addr = format!("{}:{}", config.api.bind, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting API server on {}", addr);

    let api_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    info!("Mailblast started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Stop claiming new jobs and drain in-flight work
    queue.shutdown();
    let _ = worker_handle.await;
    api_handle.abort();

    info!("Mailblast shutdown complete");

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mailblast=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
