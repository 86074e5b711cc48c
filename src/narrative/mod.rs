//! AI narrative providers.
//!
//! A provider turns raw workflow text into one free-text section. Providers
//! are optional: every failure degrades to "no section" and is only logged.

mod agent;
mod openai;
mod prompts;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::{Error, Result};

pub use agent::AgentProvider;
pub use openai::OpenAiProvider;
pub use prompts::{build_prompt, SYSTEM_PROMPT};

/// Narrative section to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    UsageInformation,
    SuggestedImprovements,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::UsageInformation => "usage_information",
            SectionKind::SuggestedImprovements => "suggested_improvements",
        }
    }
}

/// Generation limits passed to providers.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub max_words: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_words: 300,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl Constraints {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            max_words: config.max_words,
            temperature: config.temperature,
            ..Self::default()
        }
    }
}

/// A pluggable narrative generator.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Registry key.
    fn name(&self) -> &str;

    /// Generate one section. Failures are [`Error::NarrativeUnavailable`].
    async fn generate(
        &self,
        kind: SectionKind,
        workflow_raw: &str,
        constraints: &Constraints,
    ) -> Result<String>;
}

/// Narrative providers keyed by name.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn NarrativeProvider>>,
}

impl ProviderRegistry {
    /// Registry with the built-in providers configured from `config`.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut registry = Self::empty();

        // The endpoint override belongs to the selected provider only.
        let endpoint_for = |name: &str| {
            config
                .endpoint
                .clone()
                .filter(|_| config.provider == name)
        };

        let mut openai = OpenAiProvider::new(config.api_key.clone().unwrap_or_default())
            .with_timeout(config.timeout());
        if let Some(model) = &config.model {
            openai = openai.with_model(model.clone());
        }
        if let Some(endpoint) = endpoint_for("openai") {
            openai = openai.with_endpoint(endpoint);
        }

        let agent = AgentProvider::new(
            endpoint_for("agent").unwrap_or_else(|| agent::DEFAULT_ENDPOINT.to_string()),
        )
        .with_model(config.model.clone())
        .with_timeout(config.timeout());

        registry.register(Arc::new(openai));
        registry.register(Arc::new(agent));
        registry
    }

    /// Create an empty registry (for testing).
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its name.
    pub fn register(&mut self, provider: Arc<dyn NarrativeProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Look up a provider, failing with a config error for unknown names.
    pub fn select(&self, name: &str) -> Result<Arc<dyn NarrativeProvider>> {
        self.providers.get(name).cloned().ok_or_else(|| {
            Error::Config(format!(
                "Unknown AI provider '{}' (available: {})",
                name,
                self.list().join(", ")
            ))
        })
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Generated narrative for one workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Narrative {
    pub usage: Option<String>,
    pub improvements: Option<String>,
}

impl Narrative {
    pub fn is_empty(&self) -> bool {
        self.usage.is_none() && self.improvements.is_none()
    }
}

/// Ask `provider` for every section, dropping the ones that fail.
///
/// Returns `None` when no section could be generated.
pub async fn collect_narrative(
    provider: &dyn NarrativeProvider,
    workflow_raw: &str,
    constraints: &Constraints,
) -> Option<Narrative> {
    let narrative = Narrative {
        usage: section(provider, SectionKind::UsageInformation, workflow_raw, constraints).await,
        improvements: section(
            provider,
            SectionKind::SuggestedImprovements,
            workflow_raw,
            constraints,
        )
        .await,
    };

    if narrative.is_empty() {
        None
    } else {
        Some(narrative)
    }
}

async fn section(
    provider: &dyn NarrativeProvider,
    kind: SectionKind,
    workflow_raw: &str,
    constraints: &Constraints,
) -> Option<String> {
    match provider.generate(kind, workflow_raw, constraints).await {
        Ok(text) if !text.trim().is_empty() => {
            debug!(provider = provider.name(), section = kind.as_str(), "Narrative generated");
            Some(text)
        }
        Ok(_) => {
            warn!(
                provider = provider.name(),
                section = kind.as_str(),
                "Provider returned an empty section, omitting it"
            );
            None
        }
        Err(e) => {
            warn!(
                provider = provider.name(),
                section = kind.as_str(),
                error = %e,
                "Narrative unavailable, omitting section"
            );
            None
        }
    }
}
