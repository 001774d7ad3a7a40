//! Message domain types.
//!
//! A [`MessageSummary`] is the ephemeral view of one fetched message. It is
//! consumed during a scan to update sender aggregates and to feed link
//! extraction; only counters survive it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageId;

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Email address.
    pub email: String,
    /// Display name (e.g., "Daily Deals").
    pub name: Option<String>,
}

impl Address {
    /// Creates a new address with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates a new address with email and display name.
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Canonical form used as the sender key: trimmed and lowercased.
    pub fn canonical(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// Returns the display representation of this address.
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// One fetched message, as supplied by the mailbox provider.
///
/// Not persisted beyond sender aggregates and post-attempt samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Provider-assigned message identifier.
    pub id: MessageId,
    /// Sender address.
    pub from: Address,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Whether the user has opened the message.
    pub is_read: bool,
    /// Provider category label, if any (e.g., "promotions").
    pub category: Option<String>,
    /// Raw RFC 5322 header block.
    pub raw_headers: String,
    /// Raw body, text or HTML.
    pub body: String,
}
