//! Downstream lookups
//!
//! Two REST collaborators sit behind the orchestrator: the data API, asked
//! once per classified intent, and the design API, asked for a UI layout.
//! Both fetchers contain every failure: a fetch always returns a result value
//! with `succeeded = false` and an error string instead of an `Err`.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{DesignResult, FetchResult};
use std::time::Duration;

pub mod data;
pub mod design;

pub use data::DataFetcher;
pub use design::DesignFetcher;

/// Source of per-intent data
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the data for one intent label
    async fn fetch(&self, intent: &str) -> FetchResult;

    /// Query string sent for a label, `None` for unknown labels
    fn query_for(&self, intent: &str) -> Option<&'static str>;
}

/// Source of UI design payloads
#[async_trait]
pub trait DesignSource: Send + Sync {
    async fn fetch_design(&self, intent: &str, content_type: &str, message: &str)
        -> DesignResult;
}

/// Build the shared HTTP client for one endpoint.
pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EngineError::Network(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a response into JSON, treating non-2xx and bad bodies as errors.
///
/// The error strings are short and never include the response body.
pub(crate) async fn read_json(
    response: Result<reqwest::Response, reqwest::Error>,
    timeout_secs: u64,
) -> Result<serde_json::Value, String> {
    let response = response.map_err(|e| describe_transport_error(&e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| format!("invalid JSON in response: {}", e))
}

fn describe_transport_error(error: &reqwest::Error, timeout_secs: u64) -> String {
    if error.is_timeout() {
        EngineError::Timeout(timeout_secs).to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.to_string()
    }
}
