//! Domain layer types for the mailsweep engine.
//!
//! This module contains the core entities used throughout the crate:
//! senders, messages, unsubscribe actions and attempts, and effectiveness
//! samples.

mod action;
mod attempt;
mod message;
mod sender;
mod types;

pub use action::{ActionKind, Confidence, UnsubscribeAction};
pub use attempt::{AttemptOutcome, EffectivenessSample, FailureReason, UnsubscribeAttempt};
pub use message::{Address, MessageSummary};
pub use sender::{ReadingAggregate, Sender, SenderStatus};
pub use types::{AttemptId, MessageId};
