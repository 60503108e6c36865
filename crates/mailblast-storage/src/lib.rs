//! Mailblast Storage - Durable job store
//!
//! This crate provides the SQLite-backed persistence layer for Mailblast:
//! the job table, its repository, and embedded migrations.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use models::{Job, JobState};
pub use repository::JobRepository;
