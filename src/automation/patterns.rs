//! Control and text patterns for unsubscribe flows.
//!
//! Site surfaces vary wildly, so matching is a flat strategy list tried in
//! priority order: exact-text controls first, then role-based buttons, then
//! a generic submit. Supporting a new site shape means adding an entry.

use crate::providers::browser::ControlPattern;

/// Patterns for the primary unsubscribe control, in priority order.
pub fn unsubscribe_patterns() -> Vec<ControlPattern> {
    vec![
        ControlPattern::ExactText("unsubscribe".to_string()),
        ControlPattern::ExactText("opt out".to_string()),
        ControlPattern::ExactText("opt-out".to_string()),
        ControlPattern::RoleButton("unsubscribe".to_string()),
        ControlPattern::RoleButton("opt-out".to_string()),
        ControlPattern::GenericSubmit,
    ]
}

/// Patterns for secondary confirmation controls, in priority order.
pub fn confirmation_patterns() -> Vec<ControlPattern> {
    vec![
        ControlPattern::ExactText("confirm".to_string()),
        ControlPattern::ExactText("yes".to_string()),
        ControlPattern::ExactText("submit".to_string()),
        ControlPattern::GenericSubmit,
    ]
}

/// Phrases that indicate the flow worked (or had already worked).
pub const SUCCESS_PHRASES: &[&str] = &[
    "successfully unsubscribed",
    "you have been unsubscribed",
    "you've been unsubscribed",
    "unsubscribe successful",
    "already unsubscribed",
    "removed from the list",
    "removed from the mailing list",
    "removed from our list",
    "no longer receive",
    "won't receive any more",
    "preferences have been updated",
    "preferences updated",
    "email address has been removed",
];

/// Phrases that indicate the flow is blocked for automation.
pub const BLOCKED_PHRASES: &[&str] = &[
    "captcha",
    "verify you are human",
    "verify that you are human",
    "i'm not a robot",
    "access denied",
    "unusual activity",
    "request could not be processed",
];
