//! Backend selection from configuration

use super::anthropic::{AnthropicService, DEFAULT_ANTHROPIC_MODEL};
use super::openai::{OpenAIService, DEFAULT_OPENAI_MODEL};
use super::{LlmError, LlmService, LoggingService};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Supported agent providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Some(Provider::Anthropic),
            "openai" | "gpt" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    pub fn key_var(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            Provider::OpenAI => DEFAULT_OPENAI_MODEL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "claude"),
            Provider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Configuration for the agent backend
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Raw provider name as configured; validated in [`build_service`]
    pub provider: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Optional gateway base URL that fronts both providers
    pub gateway: Option<String>,
    pub model: Option<String>,
}

impl LlmConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            provider: non_empty("CINECHAT_PROVIDER"),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            gateway: non_empty("LLM_GATEWAY"),
            model: non_empty("CINECHAT_MODEL"),
        }
    }

    pub fn resolved_provider(&self) -> Result<Provider, RegistryError> {
        match &self.provider {
            None => Ok(Provider::default()),
            Some(name) => {
                Provider::parse(name).ok_or_else(|| RegistryError::UnknownProvider(name.clone()))
            }
        }
    }

    fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        }
    }
}

/// Startup failures while building the backend
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown agent provider '{0}' (expected 'claude' or 'openai')")]
    UnknownProvider(String),
    #[error("{provider} API key not configured. Set {var}.")]
    MissingCredentials { provider: Provider, var: &'static str },
    #[error("failed to initialize {provider} backend: {source}")]
    Client {
        provider: Provider,
        #[source]
        source: LlmError,
    },
}

/// Build the configured backend, wrapped with request logging.
pub fn build_service(config: &LlmConfig) -> Result<Arc<dyn LlmService>, RegistryError> {
    let provider = config.resolved_provider()?;

    // A gateway handles authentication itself
    let api_key = match (config.api_key(provider), &config.gateway) {
        (Some(key), _) => key.to_string(),
        (None, Some(_)) => "implicit".to_string(),
        (None, None) => {
            return Err(RegistryError::MissingCredentials {
                provider,
                var: provider.key_var(),
            })
        }
    };

    let model = config
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let gateway = config.gateway.as_deref();

    let service: Arc<dyn LlmService> = match provider {
        Provider::Anthropic => Arc::new(
            AnthropicService::new(api_key, model, gateway)
                .map_err(|source| RegistryError::Client { provider, source })?,
        ),
        Provider::OpenAI => Arc::new(
            OpenAIService::new(api_key, model, gateway)
                .map_err(|source| RegistryError::Client { provider, source })?,
        ),
    };

    tracing::info!(provider = %provider, model = %service.model_id(), "Agent backend ready");
    Ok(Arc::new(LoggingService::new(service)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> LlmConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        LlmConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_no_api_keys_is_startup_failure() {
        let err = build_service(&LlmConfig::default()).err().unwrap();
        assert!(matches!(
            err,
            RegistryError::MissingCredentials {
                var: "ANTHROPIC_API_KEY",
                ..
            }
        ));
    }

    #[test]
    fn test_openai_provider_needs_openai_key() {
        let config = config_from(&[("CINECHAT_PROVIDER", "openai"), ("ANTHROPIC_API_KEY", "k")]);
        let err = build_service(&config).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_anthropic_key_builds_default_model() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "test-key")]);
        let service = build_service(&config).unwrap();
        assert_eq!(service.model_id(), DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn test_gateway_allows_missing_key() {
        let config = config_from(&[
            ("CINECHAT_PROVIDER", "openai"),
            ("LLM_GATEWAY", "http://gw.local"),
            ("CINECHAT_MODEL", "gpt-4o-mini"),
        ]);
        let service = build_service(&config).unwrap();
        assert_eq!(service.model_id(), "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = config_from(&[("CINECHAT_PROVIDER", "llama"), ("ANTHROPIC_API_KEY", "k")]);
        assert!(matches!(
            build_service(&config),
            Err(RegistryError::UnknownProvider(name)) if name == "llama"
        ));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "   ")]);
        assert!(config.anthropic_api_key.is_none());
    }
}
