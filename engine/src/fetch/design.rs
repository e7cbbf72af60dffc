use super::{build_client, read_json, DesignSource};
use crate::config::ApiEndpointConfig;
use crate::secrets::SecretManager;
use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::DesignResult;
use serde_json::{json, Value};

/// Design API client
pub struct DesignFetcher {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl DesignFetcher {
    pub fn new(config: &ApiEndpointConfig) -> Result<Self, EngineError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.url.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Request body; `message` is only sent when it has content.
fn design_payload(intent: &str, content_type: &str, message: &str) -> Value {
    let mut payload = json!({
        "intent": intent,
        "type": content_type,
    });
    let message = message.trim();
    if !message.is_empty() {
        payload["message"] = Value::String(message.to_string());
    }
    payload
}

#[async_trait]
impl DesignSource for DesignFetcher {
    async fn fetch_design(
        &self,
        intent: &str,
        content_type: &str,
        message: &str,
    ) -> DesignResult {
        let payload = design_payload(intent, content_type, message);
        tracing::debug!(%payload, url = %self.url, "Calling design API");

        let response = self.client.post(&self.url).json(&payload).send().await;

        match read_json(response, self.timeout_secs).await {
            Ok(design) => {
                tracing::info!(intent, content_type, "Design API call succeeded");
                DesignResult::success(intent, content_type, design)
            }
            Err(reason) => {
                let message =
                    SecretManager::scrub(&EngineError::DesignFetchFailure(reason).to_string());
                tracing::error!("{}", message);
                DesignResult::failure(intent, content_type, message)
            }
        }
    }
}
