//! Config Module - Configuration management

use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "salesdesk.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),
    #[error("Invalid config: {0}")]
    Parse(String),
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("Missing LLM API key: set {0}")]
    MissingCredential(String),
    #[error("Invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<table>.csv` for each catalog table
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: "./data".to_string() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Overrides the provider's public endpoint
    pub base_url: Option<String>,
    /// Literal key or `${ENV_VAR}` placeholder
    pub api_key: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            api_key: "${GEMINI_API_KEY}".to_string(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Merge a `.env` file into the process environment; already-set variables win.
///
/// With no path, `.env` is searched for from the working directory upwards.
/// Returns the file that was loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(p) => dotenv::from_path(p).ok().map(|_| p.to_path_buf()),
        None => dotenv::dotenv().ok(),
    }
}

/// Resolve `${ENV_VAR}` placeholders in config strings.
pub fn resolve_env(value: &str) -> String {
    match placeholder_var(value) {
        Some(var_name) => std::env::var(var_name).unwrap_or_default(),
        None => value.to_string(),
    }
}

fn placeholder_var(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|v| v.strip_suffix('}'))
}

impl Config {
    /// Load from a `.toml` or `.json` file
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await
            .map_err(|e| ConfigError::Read(format!("{}: {}", path, e)))?;

        if path.ends_with(".toml") {
            Self::from_toml_str(&content)
        } else if path.ends_with(".json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Explicit path, else `salesdesk.toml` when present, else defaults.
    pub async fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p).await,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH).await,
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Export config as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate config, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("Invalid server port".to_string());
        }
        if self.storage.data_dir.trim().is_empty() {
            errors.push("storage.data_dir must not be empty".to_string());
        }
        if !crate::ai::SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            errors.push(format!("Unknown llm.provider '{}'", self.llm.provider));
        }
        if self.llm.model.trim().is_empty() {
            errors.push("llm.model must not be empty".to_string());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            errors.push(format!("Unknown logging.format '{}'", self.logging.format));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// The LLM credential. Resolved once at startup; an empty key is fatal.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let key = resolve_env(&self.llm.api_key);
        if key.trim().is_empty() {
            let source = placeholder_var(&self.llm.api_key).unwrap_or("llm.api_key");
            return Err(ConfigError::MissingCredential(source.to_string()));
        }
        Ok(key)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
