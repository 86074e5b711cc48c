//! Generic chat endpoint provider.
//!
//! Posts `{message, model, system, temperature}` and reads `{content}` back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_prompt, Constraints, NarrativeProvider, SectionKind, SYSTEM_PROMPT};
use crate::error::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat";

/// Calls a chat agent endpoint.
pub struct AgentProvider {
    client: Client,
    endpoint: String,
    model: Option<String>,
    timeout: Duration,
}

impl AgentProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            model: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for AgentProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[derive(Debug, Serialize)]
struct AgentRequest {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    system: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    content: String,
}

#[async_trait]
impl NarrativeProvider for AgentProvider {
    fn name(&self) -> &str {
        "agent"
    }

    async fn generate(
        &self,
        kind: SectionKind,
        workflow_raw: &str,
        constraints: &Constraints,
    ) -> Result<String> {
        let request = AgentRequest {
            message: build_prompt(kind, workflow_raw, constraints),
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            temperature: constraints.temperature,
        };

        debug!(endpoint = %self.endpoint, section = kind.as_str(), "Calling agent");
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::NarrativeUnavailable(format!("Agent request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::NarrativeUnavailable(format!(
                "Agent API error ({}): {}",
                status, error_text
            )));
        }

        let agent_response: AgentResponse = response.json().await.map_err(|e| {
            Error::NarrativeUnavailable(format!("Failed to parse agent response: {}", e))
        })?;

        info!(
            section = kind.as_str(),
            "Agent response received ({}ms)",
            start.elapsed().as_millis()
        );

        Ok(agent_response.content.trim().to_string())
    }
}
