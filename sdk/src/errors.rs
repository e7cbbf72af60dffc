//! Error types and handling
//!
//! This module provides the error types used throughout the Concierge engine.
//! All errors implement the `ConciergeErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! Most of these errors never reach a caller of the pipeline: the classifier
//! and the fetchers convert them into fallback verdicts and failed results at
//! their boundary. They exist so that the internal steps can use `?`.

use thiserror::Error;

/// Trait for Concierge error extensions
pub trait ConciergeErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains secrets
    /// or upstream response bodies.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by sending the same query again.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Classification**: LLM unreachable or returned an undecodable verdict
/// - **Fetching**: Unsupported intent, data API or design API failure
/// - **Secrets**: Keychain access failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{ConciergeErrorExt, EngineError};
///
/// let error = EngineError::UnsupportedIntent("weather".to_string());
/// assert_eq!(error.to_string(), "unsupported intent");
/// assert!(!error.is_recoverable());
///
/// let transient = EngineError::Timeout(30);
/// assert!(transient.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Classification errors
    #[error("Classification failed: {0}")]
    ClassificationFailure(String),

    // Fetch errors
    #[error("unsupported intent")]
    UnsupportedIntent(String),

    #[error("API call failed for '{intent}': {reason}")]
    FetchFailure { intent: String, reason: String },

    #[error("Design API call failed: {0}")]
    DesignFetchFailure(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConciergeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::ClassificationFailure(_) => {
                "I'm having trouble understanding that. Could you please rephrase your question?"
            }
            Self::UnsupportedIntent(_) => {
                "I can help you with plans, usage, events, billing, and trending spots"
            }
            Self::FetchFailure { .. } => "The data service is unavailable. Try again shortly",
            Self::DesignFetchFailure(_) => "The design service is unavailable. Try again shortly",
            Self::Timeout(_) => "An upstream service took too long to respond. Try again",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::UnsupportedIntent(_) | Self::KeyringError(_) => false,
            _ => true,
        }
    }
}
