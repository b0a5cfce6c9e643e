use crate::error::{Result, SplitError};
use crate::llm::types::*;
use reqwest::Client;

/// Minimal client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_version: Option<String>,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: None,
        }
    }

    /// Sent as the `api-version` query parameter (Azure-hosted deployments).
    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version;
        self
    }

    pub async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let payload = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                kind: "json_object".to_string(),
            }),
        };

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("api-key", &self.api_key)
            .json(&payload);
        if let Some(version) = &self.api_version {
            request = request.query(&[("api-version", version)]);
        }

        let res = request
            .send()
            .await
            .map_err(|e| SplitError::Extraction(format!("chat request failed: {}", e)))?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(SplitError::Extraction(format!(
                "Chat API error (status {}): {}",
                status, err_text
            )));
        }

        let body: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| SplitError::Extraction(format!("unreadable chat response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SplitError::Extraction("No choices returned".to_string()))?;

        if choice.finish_reason.as_deref() == Some("length") {
            log::warn!("Model reply was truncated at the token limit");
        }

        choice
            .message
            .content
            .ok_or_else(|| SplitError::Extraction("Model returned no content".to_string()))
    }
}
