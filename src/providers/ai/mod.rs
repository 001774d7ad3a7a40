//! Optional AI summarization collaborator.

mod anthropic;
mod traits;

pub use anthropic::AnthropicSummarizer;
pub use traits::{Summarizer, SummaryError, SummaryResult};
