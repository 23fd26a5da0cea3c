//! The text-completion seam behind SQL generation.

use async_trait::async_trait;

/// Why a completion could not be obtained. Every variant is a translation
/// failure to the caller; none of them fall back to a default query.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// Client could not be built for the named provider
    #[error("Provider '{0}' unavailable")]
    ProviderUnavailable(String),
    /// Network failure or a non-success status (auth, quota, outage)
    #[error("HTTP error: {0}")]
    Http(String),
    /// The reply carried no completion text
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Http(e.to_string())
    }
}

/// Turns a schema-constrained prompt into raw reply text.
///
/// Implementations make exactly one request per call and never retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
    /// Short name for logs, e.g. `gemini`.
    fn name(&self) -> &str;
}
