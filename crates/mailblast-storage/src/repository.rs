//! Repositories over the job store

pub mod jobs;

pub use jobs::JobRepository;
