//! Collaborator seams the orchestrator depends on.
//!
//! The real implementations live in `newsbrew-llm` and `newsbrew-mail`;
//! the traits exist so tests can substitute scripted collaborators. The
//! orchestrator never learns which one it has.

use async_trait::async_trait;
use newsbrew_llm::{Digest, ExtractedContent};
use newsbrew_mail::{ListMessagesResponse, Message, SentMessage};
use thiserror::Error;

use crate::schedule::SummaryLength;

/// A collaborator call failed. The orchestrator treats the detail as
/// opaque text; what matters is which call failed, not why.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AdapterError(pub String);

/// Result alias for collaborator calls.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Turns one raw newsletter into structured content.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract structured content from a newsletter.
    ///
    /// `body` has already been sanitized and capped by the caller.
    async fn extract(
        &self,
        subject: &str,
        body: &str,
        sender: &str,
    ) -> AdapterResult<ExtractedContent>;
}

/// Turns a batch of extracted newsletters into a digest.
#[async_trait]
pub trait DigestGenerator: Send + Sync {
    /// Generate a digest over `newsletters_json` filtered by `topics`.
    async fn generate(
        &self,
        newsletters_json: &str,
        topics: &[String],
        summary_length: SummaryLength,
        include_links: bool,
        custom_instructions: Option<&str>,
    ) -> AdapterResult<Digest>;
}

/// The mailbox provider: message listing, detail fetch, and delivery.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List one page of message previews.
    async fn list_messages(&self, page_token: Option<&str>) -> AdapterResult<ListMessagesResponse>;

    /// Fetch a message with its full bodies.
    async fn get_message(&self, message_id: &str) -> AdapterResult<Message>;

    /// Send a message; returns the provider's confirmation id.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> AdapterResult<SentMessage>;
}

#[async_trait]
impl ContentExtractor for newsbrew_llm::LlmClient {
    async fn extract(
        &self,
        subject: &str,
        body: &str,
        sender: &str,
    ) -> AdapterResult<ExtractedContent> {
        self.extract_newsletter(subject, body, sender)
            .await
            .map_err(|e| AdapterError(e.to_string()))
    }
}

#[async_trait]
impl DigestGenerator for newsbrew_llm::LlmClient {
    async fn generate(
        &self,
        newsletters_json: &str,
        topics: &[String],
        summary_length: SummaryLength,
        include_links: bool,
        custom_instructions: Option<&str>,
    ) -> AdapterResult<Digest> {
        self.generate_digest(
            newsletters_json,
            topics,
            summary_length.as_str(),
            include_links,
            custom_instructions,
        )
        .await
        .map_err(|e| AdapterError(e.to_string()))
    }
}

#[async_trait]
impl Mailbox for newsbrew_mail::MailClient {
    async fn list_messages(&self, page_token: Option<&str>) -> AdapterResult<ListMessagesResponse> {
        Self::list_messages(self, page_token)
            .await
            .map_err(|e| AdapterError(e.to_string()))
    }

    async fn get_message(&self, message_id: &str) -> AdapterResult<Message> {
        Self::get_message(self, message_id)
            .await
            .map_err(|e| AdapterError(e.to_string()))
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> AdapterResult<SentMessage> {
        self.send_message(to, subject, html, text)
            .await
            .map_err(|e| AdapterError(e.to_string()))
    }
}
