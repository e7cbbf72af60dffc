//! Orchestrator
//!
//! Runs one customer query through the pipeline:
//!
//! ```text
//! RECEIVED -> CLASSIFYING -> INAPPROPRIATE ----------------------> DONE
//!                         -> CONVERSATIONAL ---------------------> DONE
//!                         -> FETCHING -> [DESIGN_LOOKUP] -> ASSEMBLING -> DONE
//! ```
//!
//! The orchestrator owns the conversation memory and composes the classifier,
//! the data source and the design source. Every collaborator failure has
//! already been turned into a value by the time it reaches this module, so a
//! pipeline run always yields a well-formed [`QueryResponse`].
//!
//! Label fetches run concurrently and are joined in label order. Repeated
//! labels are fetched once per occurrence.

use futures::future::join_all;
use sdk::errors::EngineError;
use sdk::types::{
    ConversationEntry, DesignResult, EntryCategory, IntentLabel, IntentVerdict, MemorySnapshot,
    QueryResponse, DEFAULT_HELP_MESSAGE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::fetch::{DataFetcher, DataSource, DesignFetcher, DesignSource};
use crate::intent::{Classifier, IntentClassifier, CLARIFICATION_MESSAGE};
use crate::llm::openai::OpenAIProvider;
use crate::memory::ConversationMemory;
use crate::secrets::{SecretCache, SecretManager, SERVICE_NAME};

/// Reply to inappropriate input
pub const REFUSAL_MESSAGE: &str =
    "Please keep our conversation respectful. I'm happy to help with plans, usage, events, billing, and trending spots.";

/// Reply when every label's data lookup failed
pub const FETCH_FAILED_MESSAGE: &str =
    "Unable to retrieve data for your request. Please try again later.";

/// Reply when at least one label's data lookup succeeded
pub const SUCCESS_MESSAGE: &str = "Success";

/// Longest output summary stored in a memory entry
const SUMMARY_LIMIT: usize = 200;

/// Where the orchestrator's collaborators point, for reporting only
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub model: String,
    pub data_api_url: String,
    pub design_api_url: String,
}

/// Static description of the running service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
    pub model: String,
    pub data_api_url: String,
    pub design_api_url: String,
    pub memory_capacity: usize,
    pub supported_intents: Vec<String>,
}

/// One supported intent with its description and data query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDescription {
    pub intent: String,
    pub description: String,
    pub query: String,
}

/// Pipeline coordinator
pub struct Orchestrator {
    classifier: Arc<dyn Classifier>,
    data: Arc<dyn DataSource>,
    design: Arc<dyn DesignSource>,
    memory: Arc<ConversationMemory>,
    endpoints: Endpoints,
}

impl Orchestrator {
    /// Compose an orchestrator from its parts
    pub fn new(
        classifier: Arc<dyn Classifier>,
        data: Arc<dyn DataSource>,
        design: Arc<dyn DesignSource>,
        memory: Arc<ConversationMemory>,
    ) -> Self {
        Self {
            classifier,
            data,
            design,
            memory,
            endpoints: Endpoints::default(),
        }
    }

    /// Attach endpoint details reported by [`Orchestrator::system_info`]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Build the production pipeline from configuration.
    ///
    /// The API key is resolved lazily on the first classification, so a
    /// missing key shows up as a fallback verdict and an error log, not a
    /// startup failure.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let manager = Arc::new(SecretManager::new(SERVICE_NAME));
        let secrets = Arc::new(SecretCache::new(manager));
        Self::from_config_with_secrets(config, secrets)
    }

    /// Same as [`Orchestrator::from_config`] with an explicit secret cache
    pub fn from_config_with_secrets(
        config: &Config,
        secrets: Arc<SecretCache>,
    ) -> Result<Self, EngineError> {
        let provider = OpenAIProvider::new(config.llm.clone(), secrets)
            .map_err(|e| EngineError::Network(e.to_string()))?;
        let classifier = IntentClassifier::new(Arc::new(provider), config.llm.timeout_secs);
        let data = DataFetcher::new(&config.data_api)?;
        let design = DesignFetcher::new(&config.design_api)?;
        let memory = ConversationMemory::new(config.memory.capacity);

        let endpoints = Endpoints {
            model: classifier.model().to_string(),
            data_api_url: data.url().to_string(),
            design_api_url: design.url().to_string(),
        };

        Ok(Self::new(
            Arc::new(classifier),
            Arc::new(data),
            Arc::new(design),
            Arc::new(memory),
        )
        .with_endpoints(endpoints))
    }

    /// Run the pipeline without a design lookup
    pub async fn process_query(&self, text: &str) -> QueryResponse {
        self.run(text, None).await
    }

    /// Run the pipeline and look up a design of `content_type` for the first label
    pub async fn process_query_with_design(&self, text: &str, content_type: &str) -> QueryResponse {
        self.run(text, Some(content_type)).await
    }

    /// Classify only; memory is not touched
    pub async fn classify(&self, text: &str) -> IntentVerdict {
        self.classifier.classify(text).await
    }

    /// Direct design lookup, recorded as one design_call entry
    pub async fn request_design(
        &self,
        intent: &str,
        content_type: &str,
        message: &str,
    ) -> DesignResult {
        let design = self.design.fetch_design(intent, content_type, message).await;
        self.record_design(&design);
        design
    }

    pub fn history(&self) -> MemorySnapshot {
        self.memory.snapshot()
    }

    pub fn clear_history(&self) {
        self.memory.clear();
        info!("Conversation history cleared");
    }

    /// Whether the classifier can reach the LLM (its API key resolves)
    pub async fn classifier_ready(&self) -> bool {
        self.classifier.is_ready().await
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model: self.endpoints.model.clone(),
            data_api_url: self.endpoints.data_api_url.clone(),
            design_api_url: self.endpoints.design_api_url.clone(),
            memory_capacity: self.memory.capacity(),
            supported_intents: IntentLabel::ALL
                .iter()
                .map(|label| label.as_str().to_string())
                .collect(),
        }
    }

    pub fn supported_intents(&self) -> Vec<IntentDescription> {
        IntentLabel::ALL
            .iter()
            .map(|label| IntentDescription {
                intent: label.as_str().to_string(),
                description: label.description().to_string(),
                query: label.query().to_string(),
            })
            .collect()
    }

    async fn run(&self, text: &str, design_type: Option<&str>) -> QueryResponse {
        let request_id = Uuid::new_v4();
        let span = info_span!("pipeline", %request_id);
        self.execute(text, design_type).instrument(span).await
    }

    async fn execute(&self, text: &str, design_type: Option<&str>) -> QueryResponse {
        let text = text.trim();
        debug!("RECEIVED");

        if text.is_empty() {
            debug!("RECEIVED -> CONVERSATIONAL (empty input)");
            self.record(EntryCategory::IntentClassification, text, CLARIFICATION_MESSAGE);
            return QueryResponse::message_only(false, CLARIFICATION_MESSAGE);
        }

        debug!("CLASSIFYING");
        let verdict = self.classifier.classify(text).await;

        if verdict.inappropriate {
            debug!("CLASSIFYING -> INAPPROPRIATE");
            self.record(EntryCategory::IntentClassification, text, "inappropriate");
            return QueryResponse::message_only(false, REFUSAL_MESSAGE);
        }

        if !verdict.has_labels() {
            debug!("CLASSIFYING -> CONVERSATIONAL");
            let message = verdict
                .conversational_response
                .unwrap_or_else(|| DEFAULT_HELP_MESSAGE.to_string());
            self.record(EntryCategory::IntentClassification, text, &message);
            return QueryResponse::message_only(false, message);
        }

        debug!(labels = ?verdict.labels, "CLASSIFYING -> FETCHING");
        let mut response = self.fetch_all(text, &verdict.labels).await;

        if let Some(content_type) = design_type {
            if let Some(first) = verdict.labels.first() {
                debug!(intent = %first, content_type, "FETCHING -> DESIGN_LOOKUP");
                let design = self.design.fetch_design(first, content_type, text).await;
                self.record_design(&design);
                response.design = Some(design);
            }
        }

        debug!(error = response.error, "ASSEMBLING -> DONE");
        response
    }

    async fn fetch_all(&self, text: &str, labels: &[String]) -> QueryResponse {
        let queries_used: Vec<String> = labels
            .iter()
            .map(|label| {
                let query = self.data.query_for(label).unwrap_or("unsupported intent");
                format!("{}: {}", label, query)
            })
            .collect();

        let fetched = join_all(labels.iter().map(|label| self.data.fetch(label))).await;

        let mut response = QueryResponse::message_only(false, SUCCESS_MESSAGE);
        response.queries_used = queries_used;

        for result in fetched {
            match result.payload {
                Some(payload) if result.succeeded => {
                    self.record(
                        EntryCategory::ApiCall,
                        text,
                        &format!("{}: {}", result.intent, payload),
                    );
                    response.results.insert(result.intent, payload);
                }
                _ => {
                    warn!(
                        intent = %result.intent,
                        error = result.error.as_deref().unwrap_or("unknown error"),
                        "Data lookup failed"
                    );
                }
            }
        }

        if response.results.is_empty() {
            response.error = true;
            response.message = FETCH_FAILED_MESSAGE.to_string();
        }

        info!(
            attempted = labels.len(),
            succeeded = response.results.len(),
            "Data lookups finished"
        );
        response
    }

    fn record_design(&self, design: &DesignResult) {
        let output = if design.succeeded {
            "design retrieved".to_string()
        } else {
            design
                .error
                .clone()
                .unwrap_or_else(|| "design lookup failed".to_string())
        };
        self.record(
            EntryCategory::DesignCall,
            &format!("{} / {}", design.intent, design.content_type),
            &output,
        );
    }

    fn record(&self, category: EntryCategory, input: &str, output: &str) {
        self.memory.append(ConversationEntry::new(
            category,
            input,
            truncate(output, SUMMARY_LIMIT),
        ));
    }
}

/// Cut `text` to at most `limit` characters, marking the cut
fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
