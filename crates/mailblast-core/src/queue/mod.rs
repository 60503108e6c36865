//! Job Queue - durable campaign queue and worker pool

mod manager;
mod rate_limiter;

pub use manager::{JobStatus, JobSummary, QueueError, QueueService};
pub use rate_limiter::StartRateLimiter;
