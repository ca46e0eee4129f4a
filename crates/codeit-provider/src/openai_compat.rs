//! OpenAI-compatible endpoints (Ollama, OpenRouter, self-hosted gateways).
//!
//! These speak the same chat-completions format as OpenAI with a different base URL.

use std::time::Duration;

use crate::OpenAiProvider;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Ollama local API. No API key is required, but the header is still sent.
pub fn ollama_with_base(base_url: impl Into<String>, timeout: Duration) -> OpenAiProvider {
    OpenAiProvider::with_timeout("ollama", base_url, timeout)
}

/// OpenRouter API, a multi-model router.
/// https://openrouter.ai/docs
pub fn openrouter(api_key: impl Into<String>, timeout: Duration) -> OpenAiProvider {
    OpenAiProvider::with_timeout(api_key, OPENROUTER_BASE_URL, timeout)
}

/// Custom OpenAI-compatible endpoint
pub fn custom(
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    timeout: Duration,
) -> OpenAiProvider {
    OpenAiProvider::with_timeout(api_key, base_url, timeout)
}
