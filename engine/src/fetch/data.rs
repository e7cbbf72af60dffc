use super::{build_client, read_json, DataSource};
use crate::config::ApiEndpointConfig;
use crate::secrets::SecretManager;
use async_trait::async_trait;
use sdk::errors::{ConciergeErrorExt, EngineError};
use sdk::types::{FetchResult, IntentLabel};

/// Data API client
///
/// Sends `GET <url>?message=<query>` where the query comes from the static
/// label table in [`IntentLabel::query`].
pub struct DataFetcher {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl DataFetcher {
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

#[async_trait]
impl DataSource for DataFetcher {
    async fn fetch(&self, intent: &str) -> FetchResult {
        let label = match intent.parse::<IntentLabel>() {
            Ok(label) => label,
            Err(_) => {
                tracing::warn!(intent, "Refusing to fetch unsupported intent");
                let error = EngineError::UnsupportedIntent(intent.to_string());
                return FetchResult::failure(intent, error.to_string());
            }
        };

        tracing::debug!(intent, query = label.query(), url = %self.url, "Calling data API");

        let response = self
            .client
            .get(&self.url)
            .query(&[("message", label.query())])
            .send()
            .await;

        match read_json(response, self.timeout_secs).await {
            Ok(payload) => {
                tracing::info!(intent, "Data API call succeeded");
                FetchResult::success(intent, payload)
            }
            Err(reason) => {
                let error = EngineError::FetchFailure {
                    intent: intent.to_string(),
                    reason,
                };
                let message = SecretManager::scrub(&error.to_string());
                tracing::error!(recoverable = error.is_recoverable(), "{}", message);
                FetchResult::failure(intent, message)
            }
        }
    }

    fn query_for(&self, intent: &str) -> Option<&'static str> {
        intent.parse::<IntentLabel>().ok().map(|label| label.query())
    }
}
