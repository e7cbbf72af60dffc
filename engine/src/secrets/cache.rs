use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// An in-memory cache in front of `SecretManager`.
///
/// The LLM provider asks for its key on every call; the cache keeps the
/// environment/keychain lookup to the first call.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    /// Creates a new SecretCache wrapping the provided SecretManager
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a cache pre-seeded with one secret
    pub fn with_secret(
        manager: Arc<SecretManager>,
        key: impl Into<String>,
        value: impl Into<SecretString>,
    ) -> Self {
        let cache = Self::new(manager);
        cache.insert(key, value);
        cache
    }

    /// Retrieves a secret, consulting the manager only on a cache miss
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);
        self.insert(key, secret.clone());
        Ok(secret)
    }

    /// Stores a secret in the cache only
    pub fn insert(&self, key: impl Into<String>, value: impl Into<SecretString>) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.insert(key.into(), value.into());
    }
}
