//! AI layer - LLM providers and the Text-to-SQL fallback.

pub mod provider;
pub mod providers;
pub mod text_to_sql;

pub use provider::{AiError, LlmProvider};
pub use text_to_sql::{GenerationError, SqlGenerator};

use std::sync::Arc;
use std::time::Duration;
use crate::config::LlmConfig;
use providers::{GeminiProvider, OpenAiProvider};

/// Provider names accepted in `[llm] provider`.
pub const SUPPORTED_PROVIDERS: &[&str] = &["gemini", "openai"];

/// Build the configured provider. The API key is resolved once at startup and
/// handed in here; providers never read the environment themselves.
pub fn build_provider(config: &LlmConfig, api_key: &str) -> Result<Arc<dyn LlmProvider>, AiError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()
        .map_err(|e| AiError::Config(format!("HTTP client: {}", e)))?;

    match config.provider.as_str() {
        "gemini" => {
            let base_url = config.base_url.as_deref().unwrap_or(providers::gemini::DEFAULT_BASE_URL);
            Ok(Arc::new(GeminiProvider::with_client(api_key, &config.model, base_url, client)))
        }
        "openai" => {
            let base_url = config.base_url.as_deref().unwrap_or(providers::openai::DEFAULT_BASE_URL);
            Ok(Arc::new(OpenAiProvider::with_client(api_key, &config.model, base_url, client)))
        }
        other => Err(AiError::Config(format!("unknown LLM provider '{}'", other))),
    }
}
