//! # newsbrew-mail
//!
//! REST client for the hosted mailbox provider that owns the newsletter
//! inbox.
//!
//! The provider exposes a small message API per inbox:
//!
//! - `GET /v0/inboxes/{inbox}/messages`: paginated previews (no bodies)
//! - `GET /v0/inboxes/{inbox}/messages/{id}`: full message content
//! - `POST /v0/inboxes/{inbox}/messages/send`: outbound delivery
//!
//! List responses are previews: `text`/`html` are absent and callers must
//! fetch the full message before persisting content.
//!
//! ## Quick Start
//!
//! ```ignore
//! use newsbrew_mail::MailClient;
//!
//! #[tokio::main]
//! async fn main() -> newsbrew_mail::Result<()> {
//!     let client = MailClient::new("api_key", "news@example.dev");
//!
//!     let page = client.list_messages(None).await?;
//!     for preview in &page.messages {
//!         let full = client.get_message(&preview.message_id).await?;
//!         println!("{}: {}", full.from, full.subject);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::MailClient;
pub use error::{Error, Result};
pub use types::{ListMessagesResponse, Message, MessageAddress, SentMessage};
