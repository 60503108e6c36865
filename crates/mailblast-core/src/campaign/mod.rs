//! Campaign Execution - personalization, attachments, sending, batching

pub mod template;

mod attachments;
mod executor;
mod scheduler;

pub use attachments::{
    AttachmentResolver, DisabledImageRenderer, ImageRenderer, PositionedText, RenderError,
};
pub use executor::{MailTransport, SendExecutor, SmtpMailer, TransportError};
pub use scheduler::{BatchScheduler, CampaignRunner, ProgressSink};
