//! Intent classification
//!
//! Turns raw customer text into an [`IntentVerdict`]. The language decision is
//! delegated to an [`LLMProvider`]; this module owns everything around it:
//! the instruction prompt, the timeout, and the strict decode of the model's
//! reply. Classification never fails from the caller's point of view. Any
//! transport error, timeout or undecodable reply becomes a conversational
//! verdict asking the user to rephrase.

use crate::llm::{extract_json_object, LLMError, LLMProvider, Message};
use crate::secrets::SecretManager;
use async_trait::async_trait;
use sdk::errors::{ConciergeErrorExt, EngineError};
use sdk::types::{IntentLabel, IntentVerdict};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Reply for empty or whitespace-only input
pub const CLARIFICATION_MESSAGE: &str =
    "Please tell me what you need. I can help you with plans, usage, events, billing, and trending spots.";

/// Reply when the classifier could not produce a verdict
pub const REPHRASE_MESSAGE: &str =
    "I'm having trouble understanding that. Could you please rephrase your question?";

const SYSTEM_PROMPT: &str = r#"You are the intent classifier of a telecom customer concierge.
Read the customer's message and decide which of these intents it asks for:

- events: entertainment and event offers
- usage: data usage information
- billing: billing information and payment history
- recommended_plans: personalized plan recommendations
- current_plan: details of the customer's current plan
- plans: available plans and pricing
- top_hots: trending spots and popular locations
- special_spots: special VIP locations
- sports_events: sports events and games

Rules:
1. Ignore typos. Only use intent names from the list above, spelled exactly.
2. If the message clearly asks for several of them, list every one in the order they appear.
3. If the message contains vulgar or offensive language, set "inappropriate" to true.
4. If the message is a greeting, is out of scope or is too unclear to map, return no intents and
   put a short, polite reply in "response" that asks the customer to rephrase and mentions what you can help with.

Answer with a single JSON object and nothing else:
{"intents": ["<intent>", ...], "inappropriate": false, "response": null, "confidence": 0.0-1.0}"#;

/// Anything that can turn text into a verdict
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> IntentVerdict;

    /// Whether a classification can currently reach its backend
    async fn is_ready(&self) -> bool {
        true
    }
}

/// LLM-backed classifier
pub struct IntentClassifier {
    provider: Arc<dyn LLMProvider>,
    timeout: Duration,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout_secs: u64) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Override the classification timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model name reported by the underlying provider
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    async fn try_classify(&self, text: &str) -> Result<IntentVerdict, EngineError> {
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(text)];

        let reply = tokio::time::timeout(self.timeout, self.provider.generate(&messages))
            .await
            .map_err(|_| EngineError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| match e {
                LLMError::Timeout => EngineError::Timeout(self.timeout.as_secs()),
                other => EngineError::ClassificationFailure(SecretManager::scrub(&other.to_string())),
            })?;

        tracing::debug!(reply = %reply, "LLM classification reply");
        decode_verdict(&reply)
    }
}

#[async_trait]
impl Classifier for IntentClassifier {
    async fn classify(&self, text: &str) -> IntentVerdict {
        if text.trim().is_empty() {
            return IntentVerdict::conversational(CLARIFICATION_MESSAGE, 0.0);
        }

        match self.try_classify(text).await {
            Ok(verdict) => {
                tracing::debug!(
                    context = ?verdict.context,
                    labels = ?verdict.labels,
                    confidence = verdict.confidence,
                    "Classified query"
                );
                verdict
            }
            Err(e) => {
                tracing::error!(
                    provider = self.provider.name(),
                    recoverable = e.is_recoverable(),
                    "LLM classification failed: {}",
                    e
                );
                IntentVerdict::conversational(REPHRASE_MESSAGE, 0.0)
            }
        }
    }

    async fn is_ready(&self) -> bool {
        self.provider.check_health().await
    }
}

/// Verdict object as the model is asked to write it
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default, alias = "intent")]
    intents: Option<Vec<String>>,
    #[serde(default)]
    inappropriate: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Decode a model reply into a verdict.
///
/// Accepts a JSON verdict object (raw, fenced, or embedded in prose) or a
/// reply that is exactly one known label. Unknown labels are dropped; if no
/// label survives and the reply carries no text, the default help message is
/// used. Anything else is a `ClassificationFailure`.
pub fn decode_verdict(reply: &str) -> Result<IntentVerdict, EngineError> {
    let bare = reply.trim().trim_matches(|c: char| c == '`' || c == '"' || c == '.');
    if let Ok(label) = bare.parse::<IntentLabel>() {
        return Ok(IntentVerdict::from_labels(vec![label.as_str().to_string()], 1.0));
    }

    let object = extract_json_object(reply).ok_or_else(|| {
        EngineError::ClassificationFailure("reply does not contain a JSON verdict".to_string())
    })?;

    let raw: RawVerdict = serde_json::from_str(object)
        .map_err(|e| EngineError::ClassificationFailure(format!("malformed verdict: {}", e)))?;

    if raw.inappropriate {
        return Ok(IntentVerdict::inappropriate(raw.confidence.unwrap_or(1.0)));
    }

    let labels: Vec<String> = raw
        .intents
        .unwrap_or_default()
        .iter()
        .filter_map(|candidate| match candidate.parse::<IntentLabel>() {
            Ok(label) => Some(label.as_str().to_string()),
            Err(e) => {
                tracing::warn!("Dropping label from verdict: {}", e);
                None
            }
        })
        .collect();

    if labels.is_empty() {
        Ok(IntentVerdict::conversational(
            raw.response.unwrap_or_default(),
            raw.confidence.unwrap_or(0.0),
        ))
    } else {
        Ok(IntentVerdict::from_labels(labels, raw.confidence.unwrap_or(1.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::{VerdictContext, DEFAULT_HELP_MESSAGE};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that replays one canned reply and counts calls
    struct ScriptedProvider {
        reply: std::result::Result<String, String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok("usage".to_string()),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }

        async fn generate(&self, _messages: &[Message]) -> crate::llm::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map_err(LLMError::NetworkError)
        }
    }

    /// Provider whose credentials cannot be resolved
    struct UnconfiguredProvider;

    #[async_trait]
    impl LLMProvider for UnconfiguredProvider {
        fn name(&self) -> &str {
            "unconfigured"
        }

        fn model(&self) -> &str {
            "none"
        }

        async fn generate(&self, _messages: &[Message]) -> crate::llm::Result<String> {
            Err(LLMError::AuthenticationFailed("no API key".to_string()))
        }

        async fn check_health(&self) -> bool {
            false
        }
    }

    fn classifier(provider: Arc<ScriptedProvider>) -> IntentClassifier {
        IntentClassifier::new(provider, 5)
    }

    #[tokio::test]
    async fn test_empty_input_skips_llm() {
        let provider = ScriptedProvider::replying("usage");
        let classifier = classifier(Arc::clone(&provider));

        for input in ["", "   ", "\n\t"] {
            let verdict = classifier.classify(input).await;
            assert_eq!(verdict.context, VerdictContext::Conversational);
            assert_eq!(verdict.confidence, 0.0);
            assert_eq!(
                verdict.conversational_response.as_deref(),
                Some(CLARIFICATION_MESSAGE)
            );
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_readiness_follows_provider_health() {
        assert!(classifier(ScriptedProvider::replying("usage")).is_ready().await);

        let unconfigured = IntentClassifier::new(Arc::new(UnconfiguredProvider), 5);
        assert!(!unconfigured.is_ready().await);
        assert_eq!(
            unconfigured.classify("my bill").await.conversational_response.as_deref(),
            Some(REPHRASE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_json_verdict_with_single_label() {
        let provider = ScriptedProvider::replying(
            r#"{"intents": ["usage"], "inappropriate": false, "response": null, "confidence": 0.95}"#,
        );
        let verdict = classifier(Arc::clone(&provider))
            .classify("show my data usage")
            .await;

        assert_eq!(verdict.labels, vec!["usage"]);
        assert_eq!(verdict.context, VerdictContext::IntentDetected);
        assert_eq!(verdict.confidence, 0.95);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_to_rephrase() {
        let provider = ScriptedProvider::failing("connection refused");
        let verdict = classifier(provider).classify("what's my bill").await;

        assert_eq!(verdict.context, VerdictContext::Conversational);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(
            verdict.conversational_response.as_deref(),
            Some(REPHRASE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_rephrase() {
        let provider = ScriptedProvider::slow(Duration::from_secs(10));
        let classifier = classifier(provider).with_timeout(Duration::from_millis(50));

        let verdict = classifier.classify("show my data usage").await;
        assert_eq!(
            verdict.conversational_response.as_deref(),
            Some(REPHRASE_MESSAGE)
        );
        assert!(verdict.labels.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_reply_falls_back_to_rephrase() {
        let provider = ScriptedProvider::replying("I think you might want something about phones");
        let verdict = classifier(provider).classify("phones?").await;

        assert_eq!(
            verdict.conversational_response.as_deref(),
            Some(REPHRASE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_identical_input_gives_identical_verdicts() {
        let provider =
            ScriptedProvider::replying(r#"{"intents": ["plans", "billing"], "confidence": 0.7}"#);
        let classifier = classifier(provider);

        let first = classifier.classify("plans and my bill").await;
        let second = classifier.classify("plans and my bill").await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_bare_label() {
        let verdict = decode_verdict("  Billing\n").unwrap();
        assert_eq!(verdict.labels, vec!["billing"]);
        assert_eq!(verdict.confidence, 1.0);

        let verdict = decode_verdict("`top_hots`").unwrap();
        assert_eq!(verdict.labels, vec!["top_hots"]);

        let verdict = decode_verdict("usage.").unwrap();
        assert_eq!(verdict.labels, vec!["usage"]);
        assert_eq!(verdict.context, VerdictContext::IntentDetected);

        let verdict = decode_verdict("\"current_plan\".").unwrap();
        assert_eq!(verdict.labels, vec!["current_plan"]);
    }

    #[test]
    fn test_decode_multiple_labels_keeps_order() {
        let verdict =
            decode_verdict(r#"{"intents": ["sports_events", "events", "usage"]}"#).unwrap();
        assert_eq!(verdict.labels, vec!["sports_events", "events", "usage"]);
        assert_eq!(verdict.context, VerdictContext::Ambiguous);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn test_decode_drops_unknown_labels() {
        let verdict =
            decode_verdict(r#"{"intents": ["weather", " USAGE "], "confidence": 0.6}"#).unwrap();
        assert_eq!(verdict.labels, vec!["usage"]);
        assert_eq!(verdict.context, VerdictContext::IntentDetected);
    }

    #[test]
    fn test_decode_inappropriate_takes_precedence() {
        let verdict = decode_verdict(
            r#"{"intents": ["billing"], "inappropriate": true, "response": "Watch it", "confidence": 0.9}"#,
        )
        .unwrap();
        assert!(verdict.inappropriate);
        assert!(verdict.labels.is_empty());
        assert!(verdict.conversational_response.is_none());
        assert_eq!(verdict.context, VerdictContext::Inappropriate);
    }

    #[test]
    fn test_decode_conversational_reply() {
        let reply = "```json\n{\"intents\": [], \"response\": \"Hello! How can I help?\"}\n```";
        let verdict = decode_verdict(reply).unwrap();
        assert_eq!(verdict.context, VerdictContext::Conversational);
        assert_eq!(
            verdict.conversational_response.as_deref(),
            Some("Hello! How can I help?")
        );
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn test_decode_only_unknown_labels_uses_default_help() {
        let verdict = decode_verdict(r#"{"intents": ["weather"], "response": null}"#).unwrap();
        assert_eq!(
            verdict.conversational_response.as_deref(),
            Some(DEFAULT_HELP_MESSAGE)
        );
    }

    #[test]
    fn test_decode_clamps_confidence() {
        let verdict = decode_verdict(r#"{"intents": ["plans"], "confidence": 7.5}"#).unwrap();
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_verdict("no idea"),
            Err(EngineError::ClassificationFailure(_))
        ));
        assert!(matches!(
            decode_verdict(r#"{"intents": "usage"}"#),
            Err(EngineError::ClassificationFailure(_))
        ));
    }
}
