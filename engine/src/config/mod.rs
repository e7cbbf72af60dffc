//! Configuration management
//!
//! This module handles loading, validation, and management of the Concierge
//! configuration. Configuration is stored in TOML format at
//! ~/.concierge/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: OpenAI-compatible endpoint used for intent classification
//! - **data_api**: External data lookup service
//! - **design_api**: External UI design service
//! - **memory**: Conversation memory capacity
//! - **server**: HTTP bind address
//!
//! # Environment Overrides
//!
//! After the file is parsed, the deployment variables `OPENAI_MODEL`,
//! `OPENAI_BASE_URL`, `DATA_RETRIEVAL_API_URL`, `DESIGN_API_URL` and
//! `CONCIERGE_MEMORY_CAPACITY` override their matching fields. The LLM API key
//! never lives in this file; see [`crate::secrets`].
//!
//! # Examples
//!
//! ```no_run
//! use concierge_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.model);
//! println!("Memory capacity: {}", config.memory.capacity);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Data lookup service
    #[serde(default)]
    pub data_api: ApiEndpointConfig,

    /// Design lookup service
    #[serde(default)]
    pub design_api: ApiEndpointConfig,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for an OpenAI-compatible API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Completion token cap for the classification reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for one classification call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    // Note: API key resolved from OPENAI_API_KEY or the OS keychain, not from config
}

/// External REST endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpointConfig {
    /// Full endpoint URL
    #[serde(default)]
    pub url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Memory system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of conversation entries kept before the oldest is evicted
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    150
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_memory_capacity() -> usize {
    5
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ApiEndpointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            data_api: ApiEndpointConfig::default(),
            design_api: ApiEndpointConfig::default(),
            memory: MemoryConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.concierge/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path, then apply environment overrides
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let mut config = Self::parse_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without environment overrides or validation
    pub fn parse_file(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {:?}", path);

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.concierge/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".concierge").join("config.toml"))
    }

    /// Apply deployment overrides
    ///
    /// `lookup` is the environment in production; tests pass a closure over a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(url) = non_empty("DATA_RETRIEVAL_API_URL") {
            self.data_api.url = url;
        }
        if let Some(url) = non_empty("DESIGN_API_URL") {
            self.design_api.url = url;
        }
        if let Some(capacity) = non_empty("CONCIERGE_MEMORY_CAPACITY") {
            self.memory.capacity = capacity.trim().parse().map_err(|_| {
                EngineError::Config(format!(
                    "CONCIERGE_MEMORY_CAPACITY must be a positive integer, got '{}'",
                    capacity
                ))
            })?;
        }

        Ok(())
    }

    /// Validate field ranges
    ///
    /// Endpoint URLs may still be empty here; [`Config::require_endpoints`]
    /// enforces them where the pipeline actually needs to reach out.
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        for (name, secs) in [
            ("llm", self.llm.timeout_secs),
            ("data_api", self.data_api.timeout_secs),
            ("design_api", self.design_api.timeout_secs),
        ] {
            if secs == 0 {
                return Err(EngineError::Config(format!(
                    "{}.timeout_secs must be greater than 0",
                    name
                )));
            }
        }

        if self.memory.capacity == 0 {
            return Err(EngineError::Config(
                "memory.capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Fail fast when an external endpoint is not configured
    pub fn require_endpoints(&self) -> Result<(), EngineError> {
        for (name, url) in [
            ("llm.base_url", &self.llm.base_url),
            ("data_api.url (or DATA_RETRIEVAL_API_URL)", &self.data_api.url),
            ("design_api.url (or DESIGN_API_URL)", &self.design_api.url),
        ] {
            if url.trim().is_empty() {
                return Err(EngineError::Config(format!("{} is not set", name)));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(EngineError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        Ok(())
    }
}
