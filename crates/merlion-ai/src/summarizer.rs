//! External LLM client producing case summaries.
//!
//! Summarization is best-effort: a timeout or API error is logged and
//! surfaces as `None`, leaving the case for a later sweep. No failure
//! state is ever persisted against the case itself.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

const INSTRUCTIONS: &str = "You are a legal analyst. Summarize the following Singapore \
court judgment for a practising lawyer: state the parties and procedural posture, the \
legal issues, the holding, and the key reasoning. Be concise and neutral.";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("response carried no message content")]
    MissingContent,
}

/// Chat-completions client for the summarization sweep.
pub struct Summarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl Summarizer {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: chat_endpoint(base_url),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Summarize one judgment. `None` means "try again in a later sweep".
    pub async fn summarize(&self, case_text: &str) -> Option<String> {
        match self.request_summary(case_text).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(error = %err, "summarizer call failed");
                None
            }
        }
    }

    async fn request_summary(&self, case_text: &str) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": INSTRUCTIONS },
                { "role": "user", "content": case_text },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                message: api_error_message(&raw).unwrap_or(raw),
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|_| AiError::MissingContent)?;
        extract_message_content(&value).ok_or(AiError::MissingContent)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/chat/completions")
}

fn api_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    Some(value.get("error")?.get("message")?.as_str()?.to_owned())
}

fn extract_message_content(value: &serde_json::Value) -> Option<String> {
    let content = value
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?
        .trim();
    if content.is_empty() {
        return None;
    }
    Some(content.to_string())
}
