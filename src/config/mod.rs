//! Configuration management for the bojang service
//!
//! All configuration is loaded from environment variables with sensible
//! defaults, mirroring how the service is deployed: one credential per
//! backend, endpoint overrides for testing against mock servers, and a
//! directory-backed document store.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Per-backend model settings
    pub backends: BackendSettings,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Document store configuration
    pub store: StoreConfig,
}

/// Settings shared by all backends plus per-backend entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub gemini: BackendConfig,
    pub openai: BackendConfig,
    pub claude: BackendConfig,

    /// Request timeout in seconds for every backend call
    pub timeout_secs: u64,

    /// Maximum tokens the model may generate
    pub max_output_tokens: u32,

    /// Sampling temperature; extraction wants deterministic output
    pub temperature: f32,
}

/// One backend's endpoint, credential, and model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API key; a backend with no key is treated as unavailable
    pub api_key: Option<String>,

    /// Base endpoint URL (overridable for mock servers in tests)
    pub endpoint: String,

    /// Model identifier sent to the vendor
    pub model: String,
}

impl BackendConfig {
    /// Whether a credential is configured for this backend
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding uploaded report PDFs, keyed by file name
    pub root: PathBuf,
}

impl BackendSettings {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            gemini: BackendConfig {
                api_key: None,
                endpoint: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.0-flash".to_string(),
            },
            openai: BackendConfig {
                api_key: None,
                endpoint: "https://api.openai.com".to_string(),
                model: "gpt-4o".to_string(),
            },
            claude: BackendConfig {
                api_key: None,
                endpoint: "https://api.anthropic.com".to_string(),
                model: "claude-sonnet-4-20250514".to_string(),
            },
            timeout_secs: 120,
            max_output_tokens: 8192,
            temperature: 0.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut backends = BackendSettings::default();

        backends.gemini.api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        backends.openai.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        backends.claude.api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        if let Ok(endpoint) = std::env::var("GEMINI_ENDPOINT") {
            backends.gemini.endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("OPENAI_ENDPOINT") {
            backends.openai.endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("ANTHROPIC_ENDPOINT") {
            backends.claude.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            backends.gemini.model = model;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            backends.openai.model = model;
        }
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            backends.claude.model = model;
        }

        backends.timeout_secs = std::env::var("BOJANG_BACKEND_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(backends.timeout_secs);

        backends.max_output_tokens = std::env::var("BOJANG_MAX_OUTPUT_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(backends.max_output_tokens);

        let host = std::env::var("BOJANG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("BOJANG_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let store_root = std::env::var("BOJANG_STORE_DIR")
            .unwrap_or_else(|_| String::from("data/documents"))
            .into();

        Ok(Self {
            backends,
            server: ServerConfig { host, port },
            store: StoreConfig { root: store_root },
        })
    }

    /// Validate the configuration, warning about unusable setups
    pub fn validate(&self) -> Result<()> {
        if !self.backends.gemini.is_configured()
            && !self.backends.openai.is_configured()
            && !self.backends.claude.is_configured()
        {
            tracing::warn!("no backend credential configured; every validation will fail");
        }

        if self.backends.timeout_secs == 0 {
            anyhow::bail!("BOJANG_BACKEND_TIMEOUT must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backends: BackendSettings::default(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            store: StoreConfig {
                root: PathBuf::from("data/documents"),
            },
        }
    }
}
