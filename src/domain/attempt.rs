//! Unsubscribe attempt and effectiveness sample types.
//!
//! Attempts are append-only history: once written they are never mutated.
//! Continued mail after a successful attempt is surfaced through
//! [`EffectivenessSample`] rows, never by rewriting the attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActionKind, AttemptId, MessageId};

/// Terminal classification of one automation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// A positive confirmation signal was observed.
    Success,
    /// The flow failed outright (timeout, CAPTCHA, explicit rejection).
    Failure,
    /// The flow ran but produced no verifiable signal either way.
    Uncertain,
}

impl AttemptOutcome {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
            AttemptOutcome::Uncertain => "uncertain",
        }
    }

    /// Parses the storage form; unknown values are treated as uncertain.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "success" => AttemptOutcome::Success,
            "failure" => AttemptOutcome::Failure,
            _ => AttemptOutcome::Uncertain,
        }
    }
}

/// Why a non-success attempt ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Page load timed out or the network failed.
    NavigationTimeout,
    /// No recognizable unsubscribe control within the search budget.
    NoControlFound,
    /// Confirmation chain exceeded the hop limit.
    TooManySteps,
    /// Flow completed but no confirmation text appeared.
    NoConfirmationText,
    /// The page presented a CAPTCHA or explicit rejection.
    Blocked,
}

impl FailureReason {
    /// Stable string form used in storage and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NavigationTimeout => "navigation-timeout",
            FailureReason::NoControlFound => "no-control-found",
            FailureReason::TooManySteps => "too-many-steps",
            FailureReason::NoConfirmationText => "no-confirmation-text",
            FailureReason::Blocked => "blocked",
        }
    }

    /// Parses the storage form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "navigation-timeout" => Some(FailureReason::NavigationTimeout),
            "no-control-found" => Some(FailureReason::NoControlFound),
            "too-many-steps" => Some(FailureReason::TooManySteps),
            "no-confirmation-text" => Some(FailureReason::NoConfirmationText),
            "blocked" => Some(FailureReason::Blocked),
            _ => None,
        }
    }
}

/// One recorded automation attempt. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeAttempt {
    /// Unique attempt identifier.
    pub id: AttemptId,
    /// Canonical sender address.
    pub sender_address: String,
    /// Which mechanism was used.
    pub action_kind: ActionKind,
    /// Target URL the flow ran against.
    pub target_url: String,
    /// Message the action was extracted from, when known.
    pub message_id: Option<MessageId>,
    /// Terminal classification.
    pub outcome: AttemptOutcome,
    /// Reason for a non-success terminal state.
    pub failure_reason: Option<FailureReason>,
    /// How many confirmation controls were clicked.
    pub confirm_steps: u32,
    /// When the attempt reached its terminal state.
    pub attempted_at: DateTime<Utc>,
}

/// One message observed from a sender after its unsubscribe attempt.
///
/// Appended by re-scans; deduplicated by (sender, message) so repeated scans
/// over the same window cannot double-count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectivenessSample {
    /// Canonical sender address.
    pub sender_address: String,
    /// Attempt this sample is evidence against, when known.
    pub attempt_id: Option<AttemptId>,
    /// The offending message.
    pub message_id: MessageId,
    /// When the message arrived.
    pub received_at: DateTime<Utc>,
    /// Whole days between the attempt and this message.
    pub days_after_attempt: i64,
}
