//! Chat-completions client for the extraction and digest calls.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Digest, ExtractedContent};

const EXTRACT_SYSTEM_PROMPT: &str = "You analyze email newsletters and return structured JSON. \
Respond with a single JSON object and nothing else: \
{\"topics\": [string], \"key_takeaways\": [string], \
\"sections\": [{\"heading\": string, \"summary\": string}], \
\"links\": [{\"title\": string, \"url\": string|null}]}. \
Topics are short phrases naming what the newsletter covers.";

const DIGEST_SYSTEM_PROMPT: &str = "You compose an email digest from structured newsletter \
content. Respond with a single JSON object and nothing else: \
{\"period_covered\": string, \"highlights\": [string], \
\"newsletters\": [{\"source\": string, \"headline\": string, \"summary\": string, \
\"top_links\": [{\"title\": string, \"url\": string|null}]}], \
\"closing_note\": string}. \
Include one entry per input newsletter, in the given order.";

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.2
}
fn default_timeout_secs() -> u64 {
    120
}

/// Configuration for the LLM client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key sent as a bearer token; empty for unauthenticated local
    /// endpoints.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in a response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds; extraction and generation are the only
    /// slow calls in the system.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Chat message in the OpenAI-compatible format.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for newsletter extraction and digest generation.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: Client,
}

impl LlmClient {
    /// Creates a client from the given configuration.
    ///
    /// Falls back to a default HTTP client if the configured timeout
    /// cannot be applied.
    #[must_use]
    pub fn new(config: LlmConfig) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, http }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Extracts structured content from one newsletter.
    ///
    /// The caller is responsible for capping `body` to its character
    /// budget before calling.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is not the
    /// expected JSON shape.
    pub async fn extract_newsletter(
        &self,
        subject: &str,
        body: &str,
        sender: &str,
    ) -> Result<ExtractedContent> {
        let user = format!("Sender: {sender}\nSubject: {subject}\n\nBody:\n{body}");
        self.chat_json(EXTRACT_SYSTEM_PROMPT, &user).await
    }

    /// Generates a digest from a batch of extracted newsletters.
    ///
    /// `newsletters_json` is the serialized batch (id plus extracted
    /// content per entry); `topics` is the schedule's topic filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is not the
    /// expected JSON shape.
    pub async fn generate_digest(
        &self,
        newsletters_json: &str,
        topics: &[String],
        length_option: &str,
        include_links: bool,
        custom_instructions: Option<&str>,
    ) -> Result<Digest> {
        let mut user = format!(
            "Topic filter: {}\nSummary length: {length_option}\nInclude links: {include_links}\n",
            topics.join(", "),
        );
        if let Some(instructions) = custom_instructions {
            user.push_str("Additional instructions: ");
            user.push_str(instructions);
            user.push('\n');
        }
        user.push_str("\nNewsletters:\n");
        user.push_str(newsletters_json);

        self.chat_json(DIGEST_SYSTEM_PROMPT, &user).await
    }

    /// Runs one chat call and parses the reply as JSON into `T`.
    async fn chat_json<T: serde::de::DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<T> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.endpoint);
        let mut builder = self.http.post(&url).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(Error::EmptyResponse)?;

        let stripped = strip_code_fences(content);
        serde_json::from_str(stripped).map_err(|e| Error::Parse(format!("{e}: {stripped}")))
    }
}

/// Remove a surrounding markdown code fence, if the model added one.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map_or(rest, str::trim)
}
