//! Common types for Mailblast

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-visible job identifier (monotonic, assigned by the queue store)
pub type JobId = i64;

/// One logical bulk-send request: template, audience, attachment config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Subject template with `{{key}}` placeholders
    pub subject: String,

    /// HTML body template with `{{key}}` placeholders
    pub html_body: String,

    /// Display name used in the From header
    pub sender_name: String,

    /// Ordered list of recipients; duplicates are sent independently
    pub audience: Vec<Recipient>,

    /// Per-recipient certificate attachment configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateConfig>,

    /// Pre-uploaded document attachment configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<DocumentAttachmentConfig>,
}

/// One audience member with standard and custom personalization fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub company: Option<String>,

    /// Open-ended string fields used for personalization and document mapping
    #[serde(default)]
    pub custom_fields: HashMap<String, String>,
}

impl Recipient {
    /// Look up a standard field by its template key
    pub fn standard_field(&self, key: &str) -> Option<&str> {
        match key {
            "email" => Some(self.email.as_str()),
            "first_name" => self.first_name.as_deref(),
            "last_name" => self.last_name.as_deref(),
            "company" => self.company.as_deref(),
            _ => None,
        }
    }

    /// Resolve a field value: standard fields take precedence over custom fields
    pub fn field(&self, key: &str) -> Option<&str> {
        self.standard_field(key)
            .or_else(|| self.custom_fields.get(key).map(String::as_str))
    }
}

/// Certificate attachment configuration: a background image plus text fields
/// positioned on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Background image reference handed to the image renderer (path or URL)
    pub background: String,

    /// Ordered text fields drawn onto the background
    pub fields: Vec<CertField>,
}

/// One positioned text field on a certificate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertField {
    /// Field text template with `{{key}}` placeholders
    pub text: String,

    pub x: f32,
    pub y: f32,
    pub font_size: f32,

    #[serde(default = "default_field_color")]
    pub color: String,

    #[serde(default = "default_true")]
    pub bold: bool,

    #[serde(default = "default_true")]
    pub stroke: bool,

    #[serde(default)]
    pub stroke_color: Option<String>,
}

fn default_field_color() -> String {
    "#000000".to_string()
}

fn default_true() -> bool {
    true
}

/// Document attachment configuration: pre-uploaded documents matched to
/// recipients by filename stem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAttachmentConfig {
    pub documents: Vec<Document>,

    /// Recipient field (standard or custom) compared against each document's
    /// extension-stripped filename
    pub mapping_field: String,
}

/// A pre-uploaded document; payload is base64 on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub content_type: String,

    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Document {
    /// Filename with the final extension stripped
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

/// A resolved, named binary attachment ready to hand to the mail transport
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// One fully personalized message handed to the mail transport
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Per-recipient result of one send attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub email: String,
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    /// Successful delivery with the transport's message identifier
    pub fn delivered(email: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    /// Failed delivery with a human-readable reason
    pub fn failed(email: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// One failure record in a campaign report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFailure {
    pub email: String,
    pub error: String,
}

/// Aggregate of per-recipient outcomes for one campaign execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignReport {
    pub success: u32,
    pub failed: u32,

    /// Ordered failure records
    #[serde(default)]
    pub errors: Vec<SendFailure>,
}

impl CampaignReport {
    /// Fold one outcome into the running report
    pub fn record(&mut self, outcome: &SendOutcome) {
        if outcome.success {
            self.success += 1;
        } else {
            self.failed += 1;
            self.errors.push(SendFailure {
                email: outcome.email.clone(),
                error: outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
    }

    /// Number of recipients actually attempted
    pub fn attempted(&self) -> u32 {
        self.success + self.failed
    }
}

/// Serde helper: `Vec<u8>` as base64 text
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        // Tolerate data-URI prefixes from browser uploads
        let payload = encoded.rsplit(',').next().unwrap_or(&encoded);
        STANDARD
            .decode(payload)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recipient() -> Recipient {
        Recipient {
            email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            company: None,
            custom_fields: HashMap::from([
                ("ticket".to_string(), "A-17".to_string()),
                ("first_name".to_string(), "Shadowed".to_string()),
            ]),
        }
    }

    #[test]
    fn test_field_precedence_standard_over_custom() {
        let r = recipient();
        assert_eq!(r.field("first_name"), Some("Ada"));
        assert_eq!(r.field("ticket"), Some("A-17"));
        assert_eq!(r.field("company"), None);
        assert_eq!(r.field("missing"), None);
    }

    #[test]
    fn test_report_aggregation() {
        let mut report = CampaignReport::default();
        report.record(&SendOutcome::delivered("a@example.com", "<id-1>"));
        report.record(&SendOutcome::failed("b@example.com", "invalid address"));
        report.record(&SendOutcome::delivered("c@example.com", "<id-2>"));

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.attempted(), 3);
        assert_eq!(
            report.errors,
            vec![SendFailure {
                email: "b@example.com".to_string(),
                error: "invalid address".to_string(),
            }]
        );
    }

    #[test]
    fn test_document_stem() {
        let doc = Document {
            name: "John.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![],
        };
        assert_eq!(doc.stem(), "John");

        let dotted = Document {
            name: "report.v2.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![],
        };
        assert_eq!(dotted.stem(), "report.v2");

        let bare = Document {
            name: "README".to_string(),
            content_type: "text/plain".to_string(),
            data: vec![],
        };
        assert_eq!(bare.stem(), "README");
    }

    #[test]
    fn test_document_base64_round_trip() {
        let doc = Document {
            name: "cert.png".to_string(),
            content_type: "image/png".to_string(),
            data: vec![1, 2, 3, 4],
        };
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_document_data_uri_payload() {
        let json = r#"{"name":"a.txt","content_type":"text/plain","data":"data:text/plain;base64,aGVsbG8="}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.data, b"hello");
    }
}
