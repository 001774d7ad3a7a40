//! Mailbox provider trait definition.
//!
//! This is the narrow surface the engine is allowed to use against an email
//! account: fetch message summaries for a time window, and archive a
//! message. Nothing else: the engine never modifies content.

use async_trait::async_trait;

use crate::domain::{MessageId, MessageSummary};

/// Result type alias for mailbox operations.
pub type Result<T> = std::result::Result<T, MailboxError>;

/// Errors that can occur during mailbox operations.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Requested message was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Provider-specific error.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Query parameters for fetching messages.
#[derive(Debug, Clone)]
pub struct MailboxQuery {
    /// How many days back to look.
    pub lookback_days: u32,
    /// Maximum number of messages to return.
    pub max_results: u32,
    /// Restrict to one sender address, if set.
    pub sender: Option<String>,
}

impl MailboxQuery {
    /// Creates a window query over the given lookback.
    pub fn window(lookback_days: u32, max_results: u32) -> Self {
        Self {
            lookback_days,
            max_results,
            sender: None,
        }
    }

    /// Restricts the query to a single sender.
    pub fn from_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// Trait for mailbox provider implementations.
///
/// Read-only apart from archiving: the engine never deletes or edits mail.
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    /// Fetches message summaries matching the query, newest first.
    async fn fetch_messages(&self, query: &MailboxQuery) -> Result<Vec<MessageSummary>>;

    /// Marks one message as archived.
    async fn archive(&self, id: &MessageId) -> Result<()>;
}
