//! Concierge SDK
//!
//! Shared types and errors for the Concierge engine. The pipeline data model
//! lives here so the HTTP surface, the CLI and the tests all speak the same
//! vocabulary as the orchestrator.

/// Error types and handling
pub mod errors;

/// Pipeline data model
pub mod types;

// Re-export commonly used types
pub use errors::{ConciergeErrorExt, EngineError};
pub use types::{
    ConversationEntry, DesignResult, EntryCategory, FetchResult, IntentLabel, IntentVerdict,
    MemorySnapshot, QueryResponse, VerdictContext, DEFAULT_HELP_MESSAGE,
};
