pub mod cache;
pub mod string;

pub use cache::SecretCache;
pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::io::{self, Write};
use std::sync::OnceLock;

/// Keychain service name
pub const SERVICE_NAME: &str = "concierge";

/// Keychain key (and, upper-cased, environment variable) holding the LLM API key
pub const OPENAI_API_KEY: &str = "openai_api_key";

/// SecretManager resolves secrets from the environment and the OS keychain.
///
/// Lookup order for a key such as `openai_api_key`:
/// 1. the environment variable with the upper-cased name (`OPENAI_API_KEY`)
/// 2. the OS keychain entry under the manager's service name
///
/// Unlike an interactive tool, a missing secret is an error here: the server
/// path must never block on stdin. `concierge secret set` is the only place
/// that prompts.
///
/// The SecretManager also provides secret scrubbing for error text that ends
/// up in responses, conversation memory or logs.
pub struct SecretManager {
    service_name: String,
}

/// Regex patterns for detecting common secret formats.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - OpenAI API keys: sk-[a-zA-Z0-9-_]{20,}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
/// - `api_key=`/`apikey=` query parameters
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"Bearer\s+[^\s]{20,}",
            r"(?i)api_?key=[^\s&]+",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

impl SecretManager {
    /// Creates a new SecretManager with the given keychain service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Resolves a secret from the environment, falling back to the keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if the secret is in neither place
    /// or the keychain cannot be read.
    pub fn get_secret(&self, key: &str) -> Result<String, EngineError> {
        if let Some(value) = Self::from_env(key) {
            tracing::debug!("Resolved secret '{}' from environment", key);
            return Ok(value);
        }

        let entry = self.entry(key)?;
        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(secret)
            }
            Err(keyring::Error::NoEntry) => Err(EngineError::KeyringError(format!(
                "Secret '{}' not found. Export {} or run `concierge secret set {}`",
                key,
                key.to_uppercase(),
                key
            ))),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.entry(key)?.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Deletes a secret from the OS keychain.
    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        self.entry(key)?.delete_password().map_err(|e| {
            EngineError::KeyringError(format!("Failed to delete secret '{}': {}", key, e))
        })?;

        tracing::info!("Deleted secret '{}' from keychain", key);
        Ok(())
    }

    /// Checks whether a secret can be resolved, without failing.
    pub fn has_secret(&self, key: &str) -> bool {
        if Self::from_env(key).is_some() {
            return true;
        }
        match Entry::new(&self.service_name, key) {
            Ok(entry) => entry.get_password().is_ok(),
            Err(_) => false,
        }
    }

    /// Prompts on stderr and reads one line from stdin.
    ///
    /// Used by `concierge secret set`; never called on the request path.
    pub fn prompt_for_secret(&self, key: &str) -> Result<String, EngineError> {
        eprint!("Enter value for '{}': ", key);
        io::stderr()
            .flush()
            .map_err(|e| EngineError::KeyringError(format!("Failed to flush stderr: {}", e)))?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(|e| EngineError::KeyringError(format!("Failed to read input: {}", e)))?;

        let secret = input.trim().to_string();
        if secret.is_empty() {
            return Err(EngineError::KeyringError(
                "Secret cannot be empty".to_string(),
            ));
        }

        Ok(secret)
    }

    /// Scrubs secrets from text by replacing them with [REDACTED].
    ///
    /// # Examples
    /// ```
    /// use concierge_engine::secrets::SecretManager;
    ///
    /// let scrubbed = SecretManager::scrub("401 for key sk-1234567890abcdefghijkl");
    /// assert_eq!(scrubbed, "401 for key [REDACTED]");
    /// ```
    pub fn scrub(text: &str) -> String {
        get_secret_patterns()
            .iter()
            .fold(text.to_string(), |acc, pattern| {
                pattern.replace_all(&acc, "[REDACTED]").to_string()
            })
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }

    fn from_env(key: &str) -> Option<String> {
        std::env::var(key.to_uppercase())
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
