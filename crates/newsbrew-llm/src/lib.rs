//! # newsbrew-llm
//!
//! Client for the LLM endpoints newsbrew uses to turn raw newsletter text
//! into structured content and a batch of structured contents into a
//! digest.
//!
//! The client speaks the OpenAI-compatible chat-completions protocol, so
//! any compatible endpoint (hosted or local) works. Both calls instruct
//! the model to answer with a single JSON object and parse the reply into
//! the typed results [`ExtractedContent`] and [`Digest`]; a reply that
//! does not parse surfaces as [`Error::Parse`] rather than leaking
//! malformed shapes downstream.
//!
//! ## Quick Start
//!
//! ```ignore
//! use newsbrew_llm::{LlmClient, LlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> newsbrew_llm::Result<()> {
//!     let client = LlmClient::new(LlmConfig::default());
//!
//!     let content = client
//!         .extract_newsletter("Issue 42", "This week in Rust...", "news@example.dev")
//!         .await?;
//!     println!("topics: {:?}", content.topics);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{LlmClient, LlmConfig};
pub use error::{Error, Result};
pub use types::{ContentSection, Digest, DigestEntry, ExtractedContent, Link};
