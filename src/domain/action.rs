//! Unsubscribe action types.
//!
//! An [`UnsubscribeAction`] is one mechanism for leaving a sender's list,
//! produced fresh by each scan. Only its outcome is persisted.

use serde::{Deserialize, Serialize};

use super::MessageId;

/// Which mechanism the action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// One-click target from the structured List-Unsubscribe header.
    HeaderLink,
    /// Hyperlink scraped from the message body.
    BodyLink,
}

impl ActionKind {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::HeaderLink => "header-link",
            ActionKind::BodyLink => "body-link",
        }
    }

    /// Parses the storage form; unknown values fall back to body-link.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "header-link" => ActionKind::HeaderLink,
            _ => ActionKind::BodyLink,
        }
    }
}

/// How much to trust that following this action will unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
    High,
}

/// A candidate unsubscribe mechanism extracted from one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeAction {
    /// Mechanism this action came from.
    pub kind: ActionKind,
    /// Extraction confidence; header targets rank above body links.
    pub confidence: Confidence,
    /// Normalized target URL.
    pub url: String,
    /// Message the action was extracted from.
    pub message_id: MessageId,
}
