pub mod openai;
pub mod openai_compat;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiProvider;
pub use openai_compat::{custom, ollama_with_base, openrouter};
pub use types::*;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// Provider Configuration
// ============================================================

/// Provider type identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Ollama,
    OpenRouter,
    /// Custom OpenAI-compatible endpoint
    Custom,
    /// Offline provider with a canned reply, for local testing
    Stub,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_timeout_secs() -> u64 {
    openai::DEFAULT_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// API key (optional for Ollama and Stub)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Custom base URL (optional, uses default for each provider type)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on one backend round trip.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(ProviderType::OpenAI)
    }
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: None,
            base_url: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Create a provider from configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let timeout = config.timeout();
    let provider: Arc<dyn LlmProvider> = match config.provider_type {
        ProviderType::OpenAI => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("openai requires api_key"))?;
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or(openai_compat::OPENAI_BASE_URL);
            Arc::new(OpenAiProvider::with_timeout(key.clone(), base_url, timeout))
        }
        ProviderType::Ollama => {
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or(openai_compat::OLLAMA_BASE_URL);
            Arc::new(ollama_with_base(base_url, timeout))
        }
        ProviderType::OpenRouter => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("openrouter requires api_key"))?;
            Arc::new(openrouter(key.clone(), timeout))
        }
        ProviderType::Custom => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("custom provider requires api_key"))?;
            let base_url = config
                .base_url
                .as_ref()
                .ok_or_else(|| anyhow!("custom provider requires base_url"))?;
            Arc::new(custom(key.clone(), base_url.clone(), timeout))
        }
        ProviderType::Stub => Arc::new(StubProvider),
    };
    tracing::info!(
        "Created provider: {:?} (model {}, timeout {}s)",
        config.provider_type,
        config.model,
        config.timeout_secs
    );
    Ok(provider)
}

/// Replies with a well-formed challenge object built from the last user turn.
pub struct StubProvider;

#[async_trait]
impl LlmProvider for StubProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let user_text = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let text = serde_json::json!({
            "challenge": format!("[stub:{}] Write a program for {user_text}", request.model),
            "clue": "[stub] Start small.",
            "solution": "[stub] print(\"hello\")",
        })
        .to_string();
        Ok(LlmResponse {
            text,
            input_tokens: None,
            output_tokens: None,
            stop_reason: Some("end_turn".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_provider_chat_returns_challenge_json() {
        let provider = StubProvider;
        let req = LlmRequest::new(
            "my-model",
            vec![LlmMessage::new("system", "sys"), LlmMessage::user("ping")],
        );
        let resp = provider.chat(req).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&resp.text).unwrap();
        assert!(value["challenge"].as_str().unwrap().contains("stub:my-model"));
        assert!(value["challenge"].as_str().unwrap().contains("ping"));
        assert!(value["clue"].is_string());
        assert!(value["solution"].is_string());
        assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
    }

    #[tokio::test]
    async fn stub_provider_chat_empty_messages() {
        let provider = StubProvider;
        let resp = provider.chat(LlmRequest::new("m", vec![])).await.unwrap();
        assert!(resp.text.contains("stub:m"));
    }

    #[tokio::test]
    async fn default_health_returns_ok() {
        assert!(StubProvider.health().await.is_ok());
    }

    #[test]
    fn create_provider_requires_key_for_openai() {
        let err = create_provider(&ProviderConfig::new(ProviderType::OpenAI))
            .err()
            .unwrap();
        assert!(err.to_string().contains("openai requires api_key"));
    }

    #[test]
    fn create_provider_custom_requires_base_url() {
        let config = ProviderConfig {
            api_key: Some("k".into()),
            ..ProviderConfig::new(ProviderType::Custom)
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("requires base_url"));
    }

    #[test]
    fn create_provider_ollama_and_stub_need_no_key() {
        assert!(create_provider(&ProviderConfig::new(ProviderType::Ollama)).is_ok());
        assert!(create_provider(&ProviderConfig::new(ProviderType::Stub)).is_ok());
    }

    #[test]
    fn provider_config_yaml_defaults() {
        let config: ProviderConfig = serde_yaml::from_str("type: openrouter\napi_key: sk-x\n").unwrap();
        assert_eq!(config.provider_type, ProviderType::OpenRouter);
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn provider_config_serialize_deserialize() {
        let config = ProviderConfig {
            api_key: Some("sk-test".into()),
            base_url: Some("https://custom.example.com/v1".into()),
            ..ProviderConfig::new(ProviderType::OpenAI)
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: ProviderConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.provider_type, ProviderType::OpenAI);
        assert_eq!(parsed.api_key, Some("sk-test".to_string()));
        assert_eq!(
            parsed.base_url,
            Some("https://custom.example.com/v1".to_string())
        );
    }
}
