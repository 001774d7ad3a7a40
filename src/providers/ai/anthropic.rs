//! Anthropic Claude summarizer implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::traits::{SummaryError, SummaryResult, Summarizer};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API request format.
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

/// Anthropic API response format.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Summarizer backed by the Anthropic messages API.
pub struct AnthropicSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: usize,
}

impl AnthropicSummarizer {
    /// Creates a summarizer with the given credentials and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }

    fn build_prompt(sender_name: &str, sample_subjects: &[String]) -> String {
        let subjects: Vec<String> = sample_subjects
            .iter()
            .take(5)
            .map(|s| format!("- {}", s))
            .collect();

        format!(
            "Based on these subject lines from {}, write ONE honest sentence \
             (max 20 words) about what they send and whether it is useful or noise:\n\n{}\n\n\
             Your one sentence:",
            sender_name,
            subjects.join("\n")
        )
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize_sender(
        &self,
        sender_name: &str,
        sample_subjects: &[String],
    ) -> SummaryResult<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: Self::build_prompt(sender_name, sample_subjects),
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SummaryError::Authentication("invalid API key".to_string()));
        }
        if !status.is_success() {
            let message = response
                .json::<AnthropicErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SummaryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: AnthropicResponse = response.json().await?;

        body.content
            .iter()
            .find(|c| c.content_type == "text")
            .and_then(|c| c.text.as_ref())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| SummaryError::InvalidResponse("no text content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_subjects_and_caps_at_five() {
        let subjects: Vec<String> = (0..8).map(|i| format!("Sale #{}", i)).collect();
        let prompt = AnthropicSummarizer::build_prompt("Shop Deals", &subjects);

        assert!(prompt.contains("Shop Deals"));
        assert!(prompt.contains("- Sale #4"));
        assert!(!prompt.contains("- Sale #5"));
    }

    #[test]
    fn response_parsing_picks_text_block() {
        let json = r#"{"content":[{"type":"tool_use"},{"type":"text","text":" Daily deal spam. "}]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(json).unwrap();
        let text = parsed
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .and_then(|c| c.text.as_ref())
            .unwrap();
        assert_eq!(text.trim(), "Daily deal spam.");
    }
}
