//! Pipeline data model shared by the engine, the HTTP surface and the CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Reply used whenever a verdict has neither labels nor an LLM-provided answer
pub const DEFAULT_HELP_MESSAGE: &str =
    "I can help you with plans, usage, events, billing, and trending spots. What would you like to know?";

/// Closed set of intents the classifier may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    Events,
    Usage,
    Billing,
    RecommendedPlans,
    CurrentPlan,
    Plans,
    TopHots,
    SpecialSpots,
    SportsEvents,
}

impl IntentLabel {
    /// Every supported label, in catalogue order
    pub const ALL: [IntentLabel; 9] = [
        IntentLabel::Events,
        IntentLabel::Usage,
        IntentLabel::Billing,
        IntentLabel::RecommendedPlans,
        IntentLabel::CurrentPlan,
        IntentLabel::Plans,
        IntentLabel::TopHots,
        IntentLabel::SpecialSpots,
        IntentLabel::SportsEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::Events => "events",
            IntentLabel::Usage => "usage",
            IntentLabel::Billing => "billing",
            IntentLabel::RecommendedPlans => "recommended_plans",
            IntentLabel::CurrentPlan => "current_plan",
            IntentLabel::Plans => "plans",
            IntentLabel::TopHots => "top_hots",
            IntentLabel::SpecialSpots => "special_spots",
            IntentLabel::SportsEvents => "sports_events",
        }
    }

    /// Query string sent to the data API for this intent
    pub fn query(&self) -> &'static str {
        match self {
            IntentLabel::Events => "event offers",
            IntentLabel::Usage => "usage data",
            IntentLabel::Billing => "billing information",
            IntentLabel::RecommendedPlans => "recommended plans",
            IntentLabel::CurrentPlan => "current plan",
            IntentLabel::Plans => "available plans",
            IntentLabel::TopHots => "trending spots",
            IntentLabel::SpecialSpots => "secret vip spots",
            IntentLabel::SportsEvents => "sports events",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            IntentLabel::Events => "Entertainment and event offers",
            IntentLabel::Usage => "Data usage information",
            IntentLabel::Billing => "Billing information and payment history",
            IntentLabel::RecommendedPlans => "Personalized plan recommendations",
            IntentLabel::CurrentPlan => "Current plan details",
            IntentLabel::Plans => "Available plans and pricing",
            IntentLabel::TopHots => "Trending spots and popular locations",
            IntentLabel::SpecialSpots => "Special VIP locations",
            IntentLabel::SportsEvents => "Sports events and games",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        IntentLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| format!("unknown intent label: '{}'", s.trim()))
    }
}

/// Which outcome a verdict represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictContext {
    IntentDetected,
    Ambiguous,
    Inappropriate,
    Conversational,
}

/// Structured classification outcome
///
/// Exactly one of `labels` (non-empty), `inappropriate` or
/// `conversational_response` is the primary outcome. The constructors are the
/// only way the engine builds verdicts, so the invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentVerdict {
    pub labels: Vec<String>,
    pub inappropriate: bool,
    pub conversational_response: Option<String>,
    pub confidence: f64,
    pub context: VerdictContext,
}

impl IntentVerdict {
    /// Verdict carrying one or more labels, in the order given
    ///
    /// An empty label list degrades to the default conversational reply.
    pub fn from_labels(labels: Vec<String>, confidence: f64) -> Self {
        let context = match labels.len() {
            0 => return Self::conversational(DEFAULT_HELP_MESSAGE, 0.0),
            1 => VerdictContext::IntentDetected,
            _ => VerdictContext::Ambiguous,
        };
        Self {
            labels,
            inappropriate: false,
            conversational_response: None,
            confidence: clamp_confidence(confidence),
            context,
        }
    }

    /// Inappropriate verdict; labels and reply are always cleared
    pub fn inappropriate(confidence: f64) -> Self {
        Self {
            labels: Vec::new(),
            inappropriate: true,
            conversational_response: None,
            confidence: clamp_confidence(confidence),
            context: VerdictContext::Inappropriate,
        }
    }

    /// Conversational verdict with a reply for the user
    pub fn conversational(response: impl Into<String>, confidence: f64) -> Self {
        let response = response.into();
        let response = if response.trim().is_empty() {
            DEFAULT_HELP_MESSAGE.to_string()
        } else {
            response
        };
        Self {
            labels: Vec::new(),
            inappropriate: false,
            conversational_response: Some(response),
            confidence: clamp_confidence(confidence),
            context: VerdictContext::Conversational,
        }
    }

    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Outcome of one data API lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub intent: String,
    pub succeeded: bool,
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResult {
    pub fn success(intent: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            intent: intent.into(),
            succeeded: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(intent: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            succeeded: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of one design API lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignResult {
    pub intent: String,
    pub content_type: String,
    pub succeeded: bool,
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DesignResult {
    pub fn success(
        intent: impl Into<String>,
        content_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            intent: intent.into(),
            content_type: content_type.into(),
            succeeded: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(
        intent: impl Into<String>,
        content_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            intent: intent.into(),
            content_type: content_type.into(),
            succeeded: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Final assembled answer for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub error: bool,
    pub message: String,
    /// Payloads of the labels that fetched successfully
    pub results: BTreeMap<String, serde_json::Value>,
    /// `"label: query"` for every attempted label, in label order
    pub queries_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<DesignResult>,
}

impl QueryResponse {
    /// Response that carries only a message (conversational, refusal, validation)
    pub fn message_only(error: bool, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
            results: BTreeMap::new(),
            queries_used: Vec::new(),
            design: None,
        }
    }
}

/// Category a conversation entry is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    IntentClassification,
    ApiCall,
    DesignCall,
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryCategory::IntentClassification => write!(f, "intent_classification"),
            EntryCategory::ApiCall => write!(f, "api_call"),
            EntryCategory::DesignCall => write!(f, "design_call"),
        }
    }
}

/// One remembered turn; an owned snapshot, never edited after it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub category: EntryCategory,
    pub input_summary: String,
    pub output_summary: String,
}

impl ConversationEntry {
    pub fn new(
        category: EntryCategory,
        input_summary: impl Into<String>,
        output_summary: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            input_summary: input_summary.into(),
            output_summary: output_summary.into(),
        }
    }
}

/// Categorized copy of the conversation memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub count: usize,
    pub capacity: usize,
    pub intent_classifications: Vec<ConversationEntry>,
    pub api_calls: Vec<ConversationEntry>,
    pub design_calls: Vec<ConversationEntry>,
}

impl MemorySnapshot {
    /// Group entries by category, keeping insertion order within each group
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a ConversationEntry>,
        capacity: usize,
    ) -> Self {
        let mut snapshot = Self {
            count: 0,
            capacity,
            intent_classifications: Vec::new(),
            api_calls: Vec::new(),
            design_calls: Vec::new(),
        };

        for entry in entries {
            snapshot.count += 1;
            let bucket = match entry.category {
                EntryCategory::IntentClassification => &mut snapshot.intent_classifications,
                EntryCategory::ApiCall => &mut snapshot.api_calls,
                EntryCategory::DesignCall => &mut snapshot.design_calls,
            };
            bucket.push(entry.clone());
        }

        snapshot
    }
}
