//! Summarizer trait and supporting types.
//!
//! Summaries are decoration: the engine fetches them after ranking, and a
//! missing or failing summarizer changes nothing about candidate selection
//! or automation.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while fetching a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    #[error("authentication failed: {0}")]
    Authentication(String),
}

/// Result type for summarizer operations.
pub type SummaryResult<T> = Result<T, SummaryError>;

/// Produces a short, one-sentence take on what a sender actually sends.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes a sender from its display name and sample subject lines.
    async fn summarize_sender(
        &self,
        sender_name: &str,
        sample_subjects: &[String],
    ) -> SummaryResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_error_display() {
        let err = SummaryError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 429 - rate limited");
    }
}
