//! Mailblast Core - Campaign dispatch engine
//!
//! This crate provides the asynchronous campaign dispatch engine:
//! template personalization, attachment resolution, the send executor,
//! the batch scheduler, and the durable job queue driving them.

pub mod campaign;
pub mod queue;

pub use campaign::{
    AttachmentResolver, BatchScheduler, CampaignRunner, DisabledImageRenderer, ImageRenderer,
    MailTransport, PositionedText, ProgressSink, RenderError, SendExecutor, SmtpMailer,
    TransportError,
};
pub use queue::{JobStatus, JobSummary, QueueError, QueueService};
