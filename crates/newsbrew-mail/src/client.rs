//! HTTP client for the mailbox provider.

use reqwest::Client;

use crate::error::{Error, Result};
use crate::types::{ListMessagesResponse, Message, OutboundMessage, SentMessage};

const DEFAULT_BASE_URL: &str = "https://api.agentmail.to/v0";
const DEFAULT_PAGE_SIZE: u32 = 50;

/// Client for one provider inbox.
#[derive(Debug, Clone)]
pub struct MailClient {
    http: Client,
    base_url: String,
    api_key: String,
    inbox: String,
    page_size: u32,
}

impl MailClient {
    /// Creates a client for the given inbox using the default API endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>, inbox: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            inbox: inbox.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the API base URL (for self-hosted providers and tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the listing page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// The inbox address this client operates on.
    #[must_use]
    pub fn inbox(&self) -> &str {
        &self.inbox
    }

    /// Lists one page of message previews, newest first.
    ///
    /// Pass the `next_page_token` from the previous page to continue;
    /// `None` starts from the newest message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn list_messages(&self, page_token: Option<&str>) -> Result<ListMessagesResponse> {
        let url = format!("{}/inboxes/{}/messages", self.base_url, self.inbox);
        let mut request = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("limit", self.page_size.to_string())]);

        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Fetches the full content of a single message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn get_message(&self, message_id: &str) -> Result<Message> {
        let url = format!(
            "{}/inboxes/{}/messages/{}",
            self.base_url, self.inbox, message_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Sends a message from this inbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn send_message(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<SentMessage> {
        let url = format!("{}/inboxes/{}/messages/send", self.base_url, self.inbox);
        let payload = OutboundMessage {
            to: vec![to],
            subject,
            html,
            text,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }
}

/// Turn a non-success response into an API error, salvaging the body.
async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Error::Api { status, message }
}
