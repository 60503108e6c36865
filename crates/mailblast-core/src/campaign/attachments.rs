//! Attachment Resolution - per-recipient certificates and mapped documents

use async_trait::async_trait;
use mailblast_common::types::{
    Attachment, Campaign, CertificateConfig, DocumentAttachmentConfig, Recipient,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::template;

/// Image rendering failure, signaled distinctly from a successful empty
/// render
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image rendering is not configured")]
    Disabled,

    #[error("failed to load background image: {0}")]
    Background(String),

    #[error("render failed: {0}")]
    Render(String),
}

/// One personalized text positioned on the certificate background
#[derive(Debug, Clone)]
pub struct PositionedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: String,
    pub bold: bool,
    pub stroke: bool,
    pub stroke_color: Option<String>,
}

/// Collaborator that rasterizes positioned texts onto a background image
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(
        &self,
        background: &str,
        texts: &[PositionedText],
    ) -> Result<Vec<u8>, RenderError>;
}

/// Renderer for deployments without a rasterizer; certificate attachments
/// degrade to nothing
pub struct DisabledImageRenderer;

#[async_trait]
impl ImageRenderer for DisabledImageRenderer {
    async fn render(
        &self,
        _background: &str,
        _texts: &[PositionedText],
    ) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Disabled)
    }
}

/// Resolves per-recipient attachments: a generated certificate plus any
/// documents matched by filename stem
pub struct AttachmentResolver {
    renderer: Arc<dyn ImageRenderer>,
}

impl AttachmentResolver {
    /// Create a new attachment resolver
    pub fn new(renderer: Arc<dyn ImageRenderer>) -> Self {
        Self { renderer }
    }

    /// Produce the attachment list for one recipient. Failures only reduce
    /// what is attached; they never fail the send.
    pub async fn resolve(&self, campaign: &Campaign, recipient: &Recipient) -> Vec<Attachment> {
        let mut attachments = Vec::new();

        if let Some(cert) = &campaign.certificate {
            match self.render_certificate(cert, recipient).await {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => warn!(
                    email = %recipient.email,
                    error = %e,
                    "Certificate generation failed, sending without it"
                ),
            }
        }

        if let Some(docs) = &campaign.documents {
            attachments.extend(matching_documents(docs, recipient));
        }

        attachments
    }

    async fn render_certificate(
        &self,
        config: &CertificateConfig,
        recipient: &Recipient,
    ) -> Result<Attachment, RenderError> {
        let texts: Vec<PositionedText> = config
            .fields
            .iter()
            .map(|field| PositionedText {
                text: template::render(&field.text, recipient),
                x: field.x,
                y: field.y,
                font_size: field.font_size,
                color: field.color.clone(),
                bold: field.bold,
                stroke: field.stroke,
                stroke_color: field.stroke_color.clone(),
            })
            .collect();

        let data = self.renderer.render(&config.background, &texts).await?;

        let owner = recipient.first_name.as_deref().unwrap_or("User");
        Ok(Attachment {
            filename: format!("Certificate_{}.png", owner),
            content_type: "image/png".to_string(),
            data,
        })
    }
}

/// Documents whose extension-stripped filename exactly equals the
/// recipient's mapped field value. Case- and whitespace-sensitive; multiple
/// documents may match.
fn matching_documents(config: &DocumentAttachmentConfig, recipient: &Recipient) -> Vec<Attachment> {
    let Some(value) = recipient.field(&config.mapping_field) else {
        return Vec::new();
    };

    config
        .documents
        .iter()
        .filter(|doc| doc.stem() == value)
        .map(|doc| {
            debug!(document = %doc.name, email = %recipient.email, "Attaching matched document");
            Attachment {
                filename: doc.name.clone(),
                content_type: doc.content_type.clone(),
                data: doc.data.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailblast_common::types::{CertField, Document};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct FixedRenderer;

    #[async_trait]
    impl ImageRenderer for FixedRenderer {
        async fn render(
            &self,
            _background: &str,
            texts: &[PositionedText],
        ) -> Result<Vec<u8>, RenderError> {
            // Encode the rendered texts so tests can observe personalization
            Ok(texts
                .iter()
                .map(|t| t.text.clone())
                .collect::<Vec<_>>()
                .join("|")
                .into_bytes())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl ImageRenderer for BrokenRenderer {
        async fn render(
            &self,
            _background: &str,
            _texts: &[PositionedText],
        ) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Background("missing file".to_string()))
        }
    }

    fn recipient(first_name: Option<&str>, custom: &[(&str, &str)]) -> Recipient {
        Recipient {
            email: "john@example.com".to_string(),
            first_name: first_name.map(str::to_string),
            last_name: None,
            company: None,
            custom_fields: custom
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn campaign(
        certificate: Option<CertificateConfig>,
        documents: Option<DocumentAttachmentConfig>,
    ) -> Campaign {
        Campaign {
            subject: "s".to_string(),
            html_body: "b".to_string(),
            sender_name: "Sender".to_string(),
            audience: vec![],
            certificate,
            documents,
        }
    }

    fn cert_config() -> CertificateConfig {
        CertificateConfig {
            background: "bg.png".to_string(),
            fields: vec![CertField {
                text: "Awarded to {{first_name}}".to_string(),
                x: 100.0,
                y: 200.0,
                font_size: 48.0,
                color: "#000000".to_string(),
                bold: true,
                stroke: true,
                stroke_color: None,
            }],
        }
    }

    fn doc(name: &str) -> Document {
        Document {
            name: name.to_string(),
            content_type: "application/pdf".to_string(),
            data: name.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_certificate_is_personalized_and_named() {
        let resolver = AttachmentResolver::new(Arc::new(FixedRenderer));
        let campaign = campaign(Some(cert_config()), None);
        let recipient = recipient(Some("John"), &[]);

        let attachments = resolver.resolve(&campaign, &recipient).await;
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "Certificate_John.png");
        assert_eq!(attachments[0].content_type, "image/png");
        assert_eq!(attachments[0].data, b"Awarded to John");
    }

    #[tokio::test]
    async fn test_certificate_filename_without_first_name() {
        let resolver = AttachmentResolver::new(Arc::new(FixedRenderer));
        let campaign = campaign(Some(cert_config()), None);
        let recipient = recipient(None, &[]);

        let attachments = resolver.resolve(&campaign, &recipient).await;
        assert_eq!(attachments[0].filename, "Certificate_User.png");
    }

    #[tokio::test]
    async fn test_render_failure_omits_certificate() {
        let resolver = AttachmentResolver::new(Arc::new(BrokenRenderer));
        let campaign = campaign(Some(cert_config()), None);
        let recipient = recipient(Some("John"), &[]);

        let attachments = resolver.resolve(&campaign, &recipient).await;
        assert!(attachments.is_empty());
    }

    #[tokio::test]
    async fn test_document_matching_is_exact_stem_equality() {
        let resolver = AttachmentResolver::new(Arc::new(DisabledImageRenderer));
        let docs = DocumentAttachmentConfig {
            documents: vec![doc("John.pdf"), doc("john.pdf"), doc("John .pdf")],
            mapping_field: "first_name".to_string(),
        };
        let campaign = campaign(None, Some(docs));

        let attachments = resolver
            .resolve(&campaign, &recipient(Some("John"), &[]))
            .await;
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "John.pdf");
    }

    #[tokio::test]
    async fn test_document_mapping_via_custom_field() {
        let resolver = AttachmentResolver::new(Arc::new(DisabledImageRenderer));
        let docs = DocumentAttachmentConfig {
            documents: vec![doc("A-17.pdf"), doc("A-18.pdf")],
            mapping_field: "ticket".to_string(),
        };
        let campaign = campaign(None, Some(docs));

        let attachments = resolver
            .resolve(&campaign, &recipient(None, &[("ticket", "A-17")]))
            .await;
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "A-17.pdf");
    }

    #[tokio::test]
    async fn test_multiple_matching_documents_all_attach() {
        let resolver = AttachmentResolver::new(Arc::new(DisabledImageRenderer));
        let docs = DocumentAttachmentConfig {
            documents: vec![doc("John.pdf"), doc("John.png")],
            mapping_field: "first_name".to_string(),
        };
        let campaign = campaign(None, Some(docs));

        let attachments = resolver
            .resolve(&campaign, &recipient(Some("John"), &[]))
            .await;
        assert_eq!(attachments.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_mapping_value_yields_no_documents() {
        let resolver = AttachmentResolver::new(Arc::new(DisabledImageRenderer));
        let docs = DocumentAttachmentConfig {
            documents: vec![doc("John.pdf")],
            mapping_field: "ticket".to_string(),
        };
        let campaign = campaign(None, Some(docs));

        let attachments = resolver.resolve(&campaign, &recipient(None, &[])).await;
        assert!(attachments.is_empty());
    }
}
