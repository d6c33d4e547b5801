//! Wire types for the mailbox provider API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as returned by the provider.
///
/// List endpoints return previews: `text` and `html` are `None` and only
/// `preview` carries a short excerpt. The detail endpoint fills in the
/// full bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Provider-assigned message id (unique, immutable).
    pub message_id: String,
    /// Thread the message belongs to, if the provider groups it.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Labels applied by the provider.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Delivery timestamp.
    pub timestamp: DateTime<Utc>,
    /// Sender, either `addr@host` or `Display Name <addr@host>`.
    pub from: String,
    /// Recipient addresses.
    #[serde(default)]
    pub to: Vec<String>,
    /// Subject line (may be empty).
    #[serde(default)]
    pub subject: String,
    /// Short excerpt of the body, present on list responses.
    #[serde(default)]
    pub preview: Option<String>,
    /// Plain text body (detail responses only).
    #[serde(default)]
    pub text: Option<String>,
    /// HTML body (detail responses only).
    #[serde(default)]
    pub html: Option<String>,
}

impl Message {
    /// Best available plain-text content: full body if present, otherwise
    /// the list preview.
    #[must_use]
    pub fn text_or_preview(&self) -> Option<&str> {
        self.text.as_deref().or(self.preview.as_deref())
    }
}

/// One page of a message listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListMessagesResponse {
    /// Total number of messages in the inbox.
    #[serde(default)]
    pub count: u64,
    /// Message previews on this page.
    pub messages: Vec<Message>,
    /// Cursor for the next page; `None` on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Confirmation returned for an outbound send.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    /// Provider id of the sent message.
    pub message_id: String,
}

/// Outbound message payload.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct OutboundMessage<'a> {
    pub to: Vec<&'a str>,
    pub subject: &'a str,
    pub html: &'a str,
    pub text: &'a str,
}

/// A parsed sender address.
///
/// Providers hand back `from` as either a bare address or the RFC 5322
/// display form `Name <addr@host>`; this splits the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAddress {
    /// Display name, if one was present.
    pub name: Option<String>,
    /// The bare email address.
    pub address: String,
}

impl MessageAddress {
    /// Parse a sender string into display name and address.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(open) = trimmed.rfind('<')
            && let Some(close) = trimmed.rfind('>')
            && close > open
        {
            let name = trimmed[..open].trim().trim_matches('"');
            let address = trimmed[open + 1..close].trim();
            return Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                address: address.to_string(),
            };
        }
        Self {
            name: None,
            address: trimmed.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display_form() {
        let addr = MessageAddress::parse("AI Weekly <editor@aiweekly.co>");
        assert_eq!(addr.name.as_deref(), Some("AI Weekly"));
        assert_eq!(addr.address, "editor@aiweekly.co");
    }

    #[test]
    fn test_parse_quoted_display_name() {
        let addr = MessageAddress::parse("\"The Batch\" <news@deeplearning.ai>");
        assert_eq!(addr.name.as_deref(), Some("The Batch"));
        assert_eq!(addr.address, "news@deeplearning.ai");
    }

    #[test]
    fn test_parse_bare_address() {
        let addr = MessageAddress::parse("digest@example.com");
        assert!(addr.name.is_none());
        assert_eq!(addr.address, "digest@example.com");
    }

    #[test]
    fn test_text_or_preview_prefers_full_body() {
        let json = serde_json::json!({
            "message_id": "msg_1",
            "timestamp": "2026-08-01T08:00:00Z",
            "from": "a@b.c",
            "preview": "short...",
            "text": "full body",
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert_eq!(msg.text_or_preview(), Some("full body"));
    }

    #[test]
    fn test_preview_deserializes_without_bodies() {
        let json = serde_json::json!({
            "message_id": "msg_2",
            "timestamp": "2026-08-01T08:00:00Z",
            "from": "Newsletter <n@x.y>",
            "to": ["news@inbox.dev"],
            "subject": "Issue 42",
            "preview": "This week...",
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert!(msg.text.is_none());
        assert!(msg.html.is_none());
        assert_eq!(msg.text_or_preview(), Some("This week..."));
    }
}
