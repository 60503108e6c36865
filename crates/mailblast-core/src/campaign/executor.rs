//! Send Executor - one personalize → attach → deliver unit of work

use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::{header::ContentType, Attachment as MessageAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use mailblast_common::config::SmtpConfig;
use mailblast_common::types::{Campaign, Envelope, Recipient, SendOutcome};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::attachments::AttachmentResolver;
use super::template;

/// Transport failure with a human-readable reason
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid address {0}: {1}")]
    InvalidAddress(String, String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp error: {0}")]
    Smtp(String),
}

/// Mail transport collaborator. Implementations must tolerate repeated
/// concurrent invocation.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Submit one message; returns the transport message identifier
    async fn send(&self, envelope: &Envelope) -> Result<String, TransportError>;
}

/// Performs one send for a single recipient
pub struct SendExecutor {
    transport: Arc<dyn MailTransport>,
    resolver: AttachmentResolver,
    from_address: String,
}

impl SendExecutor {
    /// Create a new send executor
    pub fn new(
        transport: Arc<dyn MailTransport>,
        resolver: AttachmentResolver,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            resolver,
            from_address: from_address.into(),
        }
    }

    /// Send one personalized message. Every failure is captured in the
    /// returned outcome; this call never aborts sibling sends.
    pub async fn send_one(&self, campaign: &Campaign, recipient: &Recipient) -> SendOutcome {
        let subject = template::render(&campaign.subject, recipient);
        let html = wrap_in_email_shell(&template::render(&campaign.html_body, recipient));
        let text = strip_html_tags(&html);

        let attachments = self.resolver.resolve(campaign, recipient).await;

        debug!(
            email = %recipient.email,
            attachments = attachments.len(),
            "Sending campaign email"
        );

        let envelope = Envelope {
            from_name: campaign.sender_name.clone(),
            from_address: self.from_address.clone(),
            to: recipient.email.clone(),
            subject,
            html,
            text,
            attachments,
        };

        match self.transport.send(&envelope).await {
            Ok(message_id) => {
                debug!(email = %recipient.email, message_id = %message_id, "Sent");
                SendOutcome::delivered(&recipient.email, message_id)
            }
            Err(e) => {
                warn!(email = %recipient.email, error = %e, "Send failed");
                SendOutcome::failed(&recipient.email, e.to_string())
            }
        }
    }
}

/// Wrap a body fragment in a minimal document shell so mail clients render
/// consistent default spacing and fonts. Bodies already carrying a document
/// or body root tag pass through unchanged.
pub fn wrap_in_email_shell(html: &str) -> String {
    if html.contains("<html") || html.contains("<body") {
        return html.to_string();
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <style>
    body {{
      font-family: Arial, Helvetica, sans-serif;
      line-height: 1.6;
      color: #333;
      max-width: 600px;
      margin: 0 auto;
      padding: 20px;
    }}
    p {{ margin: 10px 0; }}
    h1, h2, h3 {{ color: #2c3e50; }}
    a {{ color: #3498db; text-decoration: none; }}
    ul, ol {{ margin: 10px 0; padding-left: 20px; }}
  </style>
</head>
<body>
  {html}
</body>
</html>"#
    )
}

/// Plain-text fallback derived by stripping HTML tags
pub fn strip_html_tags(html: &str) -> String {
    let re = Regex::new(r"<[^>]*>").unwrap();
    re.replace_all(html, "").into_owned()
}

/// SMTP relay transport backed by lettre
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the relay transport from configuration
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else if config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.host,
            ))
        };

        let mut builder = builder
            .map_err(|e| TransportError::Smtp(format!("failed to create transport: {}", e)))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let mailer = builder
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self { mailer })
    }

    fn build_message(envelope: &Envelope, message_id: &str) -> Result<Message, TransportError> {
        let from: Address = envelope.from_address.parse().map_err(|e| {
            TransportError::InvalidAddress(envelope.from_address.clone(), format!("{}", e))
        })?;
        let to: Address = envelope
            .to
            .parse()
            .map_err(|e| TransportError::InvalidAddress(envelope.to.clone(), format!("{}", e)))?;

        let builder = Message::builder()
            .from(Mailbox::new(Some(envelope.from_name.clone()), from))
            .to(Mailbox::new(None, to))
            .subject(&envelope.subject)
            .message_id(Some(message_id.to_string()));

        let alternative = MultiPart::alternative()
            .singlepart(SinglePart::plain(envelope.text.clone()))
            .singlepart(SinglePart::html(envelope.html.clone()));

        let message = if envelope.attachments.is_empty() {
            builder.multipart(alternative)
        } else {
            let mut mixed = MultiPart::mixed().multipart(alternative);
            for attachment in &envelope.attachments {
                let content_type = ContentType::parse(&attachment.content_type)
                    .or_else(|_| ContentType::parse("application/octet-stream"))
                    .map_err(|e| TransportError::Build(e.to_string()))?;

                mixed = mixed.singlepart(
                    MessageAttachment::new(attachment.filename.clone())
                        .body(attachment.data.clone(), content_type),
                );
            }
            builder.multipart(mixed)
        };

        message.map_err(|e| TransportError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, envelope: &Envelope) -> Result<String, TransportError> {
        let message_id = format!("<{}.{}@mailblast>", Uuid::new_v4(), Utc::now().timestamp());
        let message = Self::build_message(envelope, &message_id)?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))?;

        Ok(message_id)
    }
}
