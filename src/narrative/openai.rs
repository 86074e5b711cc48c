//! OpenAI-compatible chat completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{build_prompt, Constraints, NarrativeProvider, SectionKind, SYSTEM_PROMPT};
use crate::error::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Calls an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(&self, prompt: &str, constraints: &Constraints) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": constraints.temperature,
            "max_tokens": constraints.max_tokens,
        })
    }
}

#[async_trait]
impl NarrativeProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        kind: SectionKind,
        workflow_raw: &str,
        constraints: &Constraints,
    ) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(Error::NarrativeUnavailable(
                "No API key configured for the openai provider".to_string(),
            ));
        }

        let prompt = build_prompt(kind, workflow_raw, constraints);
        let body = self.request_body(&prompt, constraints);

        debug!(endpoint = %self.endpoint, section = kind.as_str(), "Requesting narrative");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::NarrativeUnavailable(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::NarrativeUnavailable(format!(
                "API returned error {}: {}",
                status, error_text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| Error::NarrativeUnavailable(format!("Failed to parse API response: {}", e)))?;

        extract_content(&response_json)
    }
}

fn extract_content(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            Error::NarrativeUnavailable("Could not extract content from OpenAI response".to_string())
        })
}
