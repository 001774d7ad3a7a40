//! Core identifier types for domain entities.
//!
//! Newtype wrappers keep message and attempt identifiers from being mixed
//! up with ordinary strings or with each other.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned identifier for an individual message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Unique identifier for an unsubscribe attempt record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub String);

impl AttemptId {
    /// Generates a fresh attempt identifier.
    pub fn generate() -> Self {
        Self(format!("att-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AttemptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AttemptId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_display() {
        let id = MessageId::from("msg-1");
        assert_eq!(id.to_string(), "msg-1");
    }

    #[test]
    fn message_id_equality() {
        let id1 = MessageId::from("msg-1");
        let id2 = MessageId::from("msg-1".to_string());
        assert_eq!(id1, id2);
    }

    #[test]
    fn attempt_id_generate_is_prefixed() {
        let id = AttemptId::generate();
        assert!(id.0.starts_with("att-"));
    }

    #[test]
    fn attempt_id_generate_is_unique() {
        assert_ne!(AttemptId::generate(), AttemptId::generate());
    }
}
