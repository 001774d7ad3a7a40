//! Browser automation surface.
//!
//! The automation executor depends only on this narrow trait pair: open an
//! isolated context, navigate, locate a control from an ordered pattern
//! list, click it, and scan for text. Any driver that can do those five
//! things can run unsubscribe flows.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type alias for browser operations.
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Errors surfaced by a browser session.
///
/// The executor maps these to terminal attempt outcomes; they never escape
/// the automation layer.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// The operation exceeded its timeout.
    #[error("timed out")]
    Timeout,

    /// Navigation failed (DNS, TLS, connection refused, bad status).
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The driver itself misbehaved.
    #[error("driver error: {0}")]
    Driver(String),
}

/// One control-matching strategy.
///
/// Patterns are tried in list order and the first match wins; new site
/// shapes are handled by adding entries, not new types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlPattern {
    /// A button or link whose visible text contains this token.
    ExactText(String),
    /// An element with button semantics (submit input, role=button, id or
    /// class) referencing this token.
    RoleButton(String),
    /// Any generic form submit control.
    GenericSubmit,
}

/// Where clicking a located control leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlTarget {
    /// A plain hyperlink.
    Link { href: String },
    /// A form submission with its collected fields.
    Form {
        action: String,
        method: FormMethod,
        fields: Vec<(String, String)>,
    },
}

/// HTTP method of a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMethod {
    Get,
    Post,
}

/// A control located on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Visible text or value of the control, for logging.
    pub label: String,
    /// What clicking it does.
    pub target: ControlTarget,
}

/// One isolated browsing context, tied to a single unsubscribe flow.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates to a URL, bounded by the timeout.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Searches the loaded page for the first control matching the ordered
    /// pattern list. `None` when nothing matches.
    async fn find_control(&mut self, patterns: &[ControlPattern]) -> Result<Option<Control>>;

    /// Activates a previously located control.
    async fn click(&mut self, control: &Control) -> Result<()>;

    /// Waits up to the timeout for any of the phrases to appear in the
    /// page's visible text.
    async fn wait_for_text(&mut self, phrases: &[&str], timeout: Duration) -> Result<bool>;

    /// Tears the context down. Infallible by design; drivers log their own
    /// shutdown problems.
    async fn close(&mut self);
}

/// Factory for isolated browser sessions.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    /// Opens a fresh isolated context.
    async fn open_context(&self, headless: bool) -> Result<Box<dyn BrowserSession>>;
}
