//! Sender domain types.
//!
//! A [`Sender`] aggregates everything known about one sending address across
//! scans. Senders are created on first observed message, mutated by every
//! subsequent scan, and never deleted, only marked unsubscribed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderStatus {
    /// Still subscribed (or never attempted).
    Active,
    /// A successful unsubscribe attempt was recorded.
    Unsubscribed,
}

/// Aggregate record for one sending address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    /// Canonical (lowercased) sender address; the primary key.
    pub address: String,
    /// Display name from the most recent scan.
    pub display_name: Option<String>,
    /// When this sender was first observed.
    pub first_seen_at: DateTime<Utc>,
    /// Message count as of the latest scan.
    pub lifetime_messages: u32,
    /// Unread count as of the latest scan. Never exceeds `lifetime_messages`.
    pub unread_messages: u32,
    /// When the user last opened a message from this sender.
    pub last_read_at: Option<DateTime<Utc>>,
    /// Read ratio from the latest scan, 0-100.
    pub engagement_score: f64,
    /// Current lifecycle status.
    pub status: SenderStatus,
    /// When the successful unsubscribe attempt happened.
    pub unsubscribed_at: Option<DateTime<Utc>>,
    /// When this sender was last surfaced as a candidate.
    pub last_shown_at: Option<DateTime<Utc>>,
    /// When the user last marked this sender as one to keep.
    pub kept_at: Option<DateTime<Utc>>,
}

impl Sender {
    /// Creates a fresh sender record for a first-seen address.
    pub fn new(address: impl Into<String>, display_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            display_name,
            first_seen_at: now,
            lifetime_messages: 0,
            unread_messages: 0,
            last_read_at: None,
            engagement_score: 0.0,
            status: SenderStatus::Active,
            unsubscribed_at: None,
            last_shown_at: None,
            kept_at: None,
        }
    }

    /// Whether a successful unsubscribe has been recorded.
    pub fn is_unsubscribed(&self) -> bool {
        self.status == SenderStatus::Unsubscribed
    }
}

/// Per-window reading statistics for one sender, rebuilt by each scan.
///
/// Rebuilding (rather than incrementing) is what makes re-ingesting the same
/// message set idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingAggregate {
    /// Canonical sender address.
    pub sender_address: String,
    /// Display name observed in the window.
    pub sender_name: Option<String>,
    /// Length of the scan window in days.
    pub window_days: u32,
    /// Messages received in the window.
    pub total_received: u32,
    /// Messages the user opened.
    pub total_read: u32,
    /// Messages left unread.
    pub total_unread: u32,
    /// Newest read message in the window, if any.
    pub last_read_at: Option<DateTime<Utc>>,
    /// Newest message in the window, if any.
    pub last_received_at: Option<DateTime<Utc>>,
}

impl ReadingAggregate {
    /// Read ratio on a 0-100 scale; 0 when nothing was received.
    pub fn engagement_score(&self) -> f64 {
        if self.total_received == 0 {
            return 0.0;
        }
        (f64::from(self.total_read) / f64::from(self.total_received)) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sender_starts_active_and_empty() {
        let sender = Sender::new("deals@shop.example", None, Utc::now());
        assert_eq!(sender.status, SenderStatus::Active);
        assert_eq!(sender.lifetime_messages, 0);
        assert!(!sender.is_unsubscribed());
    }

    #[test]
    fn engagement_score_is_read_ratio() {
        let agg = ReadingAggregate {
            sender_address: "a@example.com".to_string(),
            sender_name: None,
            window_days: 90,
            total_received: 40,
            total_read: 2,
            total_unread: 38,
            last_read_at: None,
            last_received_at: None,
        };
        assert_eq!(agg.engagement_score(), 5.0);
    }

    #[test]
    fn engagement_score_handles_empty_window() {
        let agg = ReadingAggregate {
            sender_address: "a@example.com".to_string(),
            sender_name: None,
            window_days: 90,
            total_received: 0,
            total_read: 0,
            total_unread: 0,
            last_read_at: None,
            last_received_at: None,
        };
        assert_eq!(agg.engagement_score(), 0.0);
    }

    #[test]
    fn sender_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SenderStatus::Unsubscribed).unwrap(),
            "\"unsubscribed\""
        );
    }
}
