//! Runtime configuration.
//!
//! Loaded from YAML or JSON, then overridden from the environment:
//!
//! ```yaml
//! provider: openai
//! model: gpt-4o-mini
//! max_tokens: 1024
//! temperature: 0.7
//! request_timeout: 30s
//! prompt_caching: false
//! provider_options:
//!   base_url: https://api.openai.com/v1
//! principles: [harmful, honesty]
//! ```

use std::path::Path;
use std::time::Duration;

use constitution_core::{PrincipleError, PrincipleSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::model::ProviderModel;
use crate::providers::{CompletionConfig, ProviderError, ProviderRegistry};

/// Overrides `provider`.
pub const PROVIDER_ENV: &str = "CONSTITUTION_PROVIDER";

/// Overrides `model`.
pub const MODEL_ENV: &str = "CONSTITUTION_MODEL";

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Principle(#[from] PrincipleError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider type name, e.g. "openai" or "anthropic"
    pub provider: String,

    /// Model name; the provider's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub max_tokens: u32,

    pub temperature: f32,

    /// Per-request timeout, as a human-readable duration ("30s", "2m")
    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,

    /// Ask the provider to cache prompt blocks (Anthropic only)
    pub prompt_caching: bool,

    /// Options handed to the provider factory (`api_key`, `base_url`, ...)
    pub provider_options: JsonValue,

    /// Built-in principle names; empty selects the default set
    pub principles: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let completion = CompletionConfig::default();
        Self {
            provider: "openai".to_string(),
            model: None,
            max_tokens: completion.max_tokens,
            temperature: completion.temperature,
            request_timeout: completion.timeout,
            prompt_caching: completion.prompt_caching,
            provider_options: JsonValue::Object(Default::default()),
            principles: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file, choosing the format by extension (`.json`, else YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Apply `CONSTITUTION_PROVIDER` and `CONSTITUTION_MODEL`.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = non_blank(PROVIDER_ENV) {
            self.provider = provider;
        }
        if let Some(model) = non_blank(MODEL_ENV) {
            self.model = Some(model);
        }
        self
    }

    /// Check value ranges and principle names. Credentials are checked by
    /// [`validate_provider`](Self::validate_provider).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::Invalid("provider must not be empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout must be positive".to_string()));
        }
        if !self.provider_options.is_object() {
            return Err(ConfigError::Invalid(
                "provider_options must be a mapping".to_string(),
            ));
        }

        self.principle_set()?;
        Ok(())
    }

    /// Check that the provider is known and its credentials are present.
    pub fn validate_provider(&self, registry: &ProviderRegistry) -> Result<(), ConfigError> {
        registry.validate(&self.provider, &self.provider_options)?;
        Ok(())
    }

    /// Completion settings, using `default_model` when no model is configured.
    pub fn completion_config(&self, default_model: &str) -> CompletionConfig {
        CompletionConfig {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.request_timeout,
            prompt_caching: self.prompt_caching,
            ..Default::default()
        }
    }

    /// The principles named in the config, or the default set.
    pub fn principle_set(&self) -> Result<PrincipleSet, PrincipleError> {
        if self.principles.is_empty() {
            Ok(PrincipleSet::default_set())
        } else {
            PrincipleSet::from_names(&self.principles)
        }
    }

    /// Validate, then create the configured provider and wrap it as a model.
    pub fn provider_model(&self, registry: &ProviderRegistry) -> Result<ProviderModel, ConfigError> {
        self.validate()?;
        self.validate_provider(registry)?;

        let provider = registry.create(&self.provider, &self.provider_options)?;
        let default_model = registry
            .default_model(&self.provider)
            .unwrap_or(CompletionConfig::DEFAULT_MODEL);

        let config = self.completion_config(default_model);
        tracing::info!(
            provider = %self.provider,
            model = %config.model,
            timeout = ?config.timeout,
            "Configured model"
        );

        Ok(ProviderModel::new(provider, config))
    }

    /// Build the configured provider and ask whether it can serve requests.
    ///
    /// No completion is sent; providers answer from their own state.
    pub async fn provider_healthy(&self, registry: &ProviderRegistry) -> Result<bool, ConfigError> {
        self.validate_provider(registry)?;
        let provider = registry.create(&self.provider, &self.provider_options)?;
        Ok(provider.health_check().await)
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        ChatMessage, CompletionResponse, LlmProvider, ProviderFactory, TokenUsage,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
        assert_eq!(config.principle_set().unwrap(), PrincipleSet::default_set());
    }

    #[test]
    fn test_from_yaml() {
        let config = RuntimeConfig::from_yaml(
            r#"
provider: anthropic
model: claude-haiku-4-5
request_timeout: 1m 30s
principles: [honesty, cite-sources]
provider_options:
  base_url: http://localhost:9000
"#,
        )
        .unwrap();

        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.model.as_deref(), Some("claude-haiku-4-5"));
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(
            config.principle_set().unwrap().names(),
            vec!["honesty", "cite-sources"]
        );
    }

    #[test]
    fn test_from_json_round_trip() {
        let config = RuntimeConfig {
            model: Some("gpt-4o".to_string()),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"5s\""));
        assert_eq!(RuntimeConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = RuntimeConfig::from_yaml("request_timeout: soon");
        assert!(matches!(result, Err(ConfigError::YamlError(_))));
    }

    #[test]
    fn test_validate_ranges() {
        let config = RuntimeConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = RuntimeConfig {
            max_tokens: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = RuntimeConfig {
            principles: vec!["nonexistent".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Principle(_))));
    }

    #[test]
    fn test_overrides() {
        let config = RuntimeConfig::default().apply_overrides(|key| match key {
            PROVIDER_ENV => Some("anthropic".to_string()),
            MODEL_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_completion_config_model_fallback() {
        let config = RuntimeConfig::default();
        assert_eq!(config.completion_config("claude-sonnet-4-5").model, "claude-sonnet-4-5");

        let config = RuntimeConfig {
            model: Some("gpt-4o".to_string()),
            max_tokens: 256,
            ..Default::default()
        };
        let completion = config.completion_config("ignored");
        assert_eq!(completion.model, "gpt-4o");
        assert_eq!(completion.max_tokens, 256);
        assert!(!completion.prompt_caching);
        assert!(completion.response_schema.is_none());
    }

    #[test]
    fn test_prompt_caching_passes_through() {
        let config = RuntimeConfig::from_yaml("provider: anthropic\nprompt_caching: true").unwrap();
        assert!(config.prompt_caching);

        let completion = config.completion_config("claude-sonnet-4-5");
        assert!(completion.prompt_caching);

        let schema = crate::structured::response_schema::<constitution_core::Critique>("critique");
        assert!(completion.structured(schema).prompt_caching);
    }

    struct NullProvider {
        healthy: bool,
    }

    #[async_trait]
    impl LlmProvider for NullProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: String::new(),
                usage: TokenUsage::default(),
                model: config.model.clone(),
                stop_reason: None,
            })
        }

        async fn health_check(&self) -> bool {
            self.healthy
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    struct NullFactory;

    impl ProviderFactory for NullFactory {
        fn provider_type(&self) -> &'static str {
            "null"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            Ok(Arc::new(NullProvider {
                healthy: config.get("offline").is_none(),
            }))
        }

        fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
            match config.get("api_key") {
                Some(_) => Ok(()),
                None => Err(ProviderError::NotConfigured("api_key missing".to_string())),
            }
        }

        fn default_model(&self) -> &'static str {
            "null-1"
        }
    }

    #[test]
    fn test_provider_model_fails_fast_without_credentials() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NullFactory));

        let config = RuntimeConfig {
            provider: "null".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.provider_model(&registry),
            Err(ConfigError::Provider(ProviderError::NotConfigured(_)))
        ));

        let config = RuntimeConfig {
            provider_options: serde_json::json!({"api_key": "k"}),
            ..config
        };
        let model = config.provider_model(&registry).unwrap();
        assert_eq!(model.config().model, "null-1");
    }

    #[tokio::test]
    async fn test_provider_healthy() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NullFactory));

        let config = RuntimeConfig {
            provider: "null".to_string(),
            provider_options: serde_json::json!({"api_key": "k"}),
            ..Default::default()
        };
        assert!(config.provider_healthy(&registry).await.unwrap());

        let offline = RuntimeConfig {
            provider_options: serde_json::json!({"api_key": "k", "offline": true}),
            ..config.clone()
        };
        assert!(!offline.provider_healthy(&registry).await.unwrap());

        let missing_key = RuntimeConfig {
            provider_options: serde_json::json!({}),
            ..config
        };
        assert!(matches!(
            missing_key.provider_healthy(&registry).await,
            Err(ConfigError::Provider(ProviderError::NotConfigured(_)))
        ));
    }

    #[test]
    fn test_unknown_provider_type() {
        let config = RuntimeConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate_provider(&ProviderRegistry::new()),
            Err(ConfigError::Provider(ProviderError::NotConfigured(_)))
        ));
    }
}
