//! Configuration models for cartbot.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration as long as the API key can be resolved from the environment.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Top-level configuration for cartbot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Interpreter endpoint (OpenRouter or any OpenAI-compatible API)
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Catalog/cart service
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Webhook server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Interpreter endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// API key (can also be set via OPENROUTER_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL for the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used to interpret messages
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_interpreter_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f64,

    /// File whose contents replace the built-in interpreter prompt
    #[serde(default)]
    pub system_prompt: Option<PathBuf>,
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "openai/gpt-3.5-turbo".to_string()
}

fn default_interpreter_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_interpreter_timeout(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            system_prompt: None,
        }
    }
}

/// Catalog/cart service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API (supports ${ENV_VAR})
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

fn default_catalog_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_catalog_timeout() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

impl CatalogConfig {
    /// Base URL with environment placeholders expanded and no trailing slash.
    pub fn resolved_base_url(&self) -> String {
        expand_env_vars(&self.base_url)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:4000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve the interpreter API key from config or environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.openrouter.api_key {
            return Ok(expand_env_vars(key));
        }

        std::env::var(&self.openrouter.api_key_env).map_err(|_| ConfigError::MissingApiKey {
            env_var: self.openrouter.api_key_env.clone(),
        })
    }
}

fn env_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"))
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    env_placeholder()
        .replace_all(s, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing API key: set {env_var} env var or openrouter.api_key in config")]
    MissingApiKey { env_var: String },

    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,
}
