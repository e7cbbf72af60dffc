//! Concierge Engine Library
//!
//! This library provides the core functionality of the Concierge service.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Telemetry and Observability
pub mod telemetry;

/// LLM provider abstraction layer
pub mod llm;

/// Intent classification module
pub mod intent;

/// Data and design API clients
pub mod fetch;

/// Conversation memory module
pub mod memory;

/// Pipeline orchestration module
pub mod orchestrator;

/// HTTP server module
pub mod server;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
