//! Command handlers for CLI operations
//!
//! Each handler runs one command and prints its result as text or JSON.
//! Rendering is split into `render_*` functions so the text layouts can be
//! tested without capturing stdout.

use anyhow::{Context, Result};
use sdk::errors::{ConciergeErrorExt, EngineError};
use sdk::types::{DesignResult, IntentVerdict, QueryResponse};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::{IntentDescription, Orchestrator, SystemInfo};
use crate::secrets::{SecretManager, SERVICE_NAME};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Attach the user-facing hint to an engine error
pub fn with_hint(error: EngineError) -> anyhow::Error {
    let hint = error.user_hint().to_string();
    anyhow::Error::new(error).context(hint)
}

/// Start the HTTP server
pub async fn handle_serve(config: &Config, bind: Option<String>) -> Result<()> {
    config
        .require_endpoints()
        .map_err(with_hint)
        .context("Cannot start server with incomplete configuration")?;

    let orchestrator =
        Arc::new(Orchestrator::from_config(config).context("Failed to build pipeline")?);
    if !orchestrator.classifier_ready().await {
        tracing::warn!(
            "No OpenAI API key found; queries will get the rephrase reply until one is set \
             (OPENAI_API_KEY or `concierge secret set openai_api_key`)"
        );
    }
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());

    crate::server::serve(orchestrator, &bind).await
}

/// Run one query through the pipeline
pub async fn handle_query(
    orchestrator: &Orchestrator,
    text: &str,
    design_type: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let response = match design_type {
        Some(content_type) => {
            orchestrator
                .process_query_with_design(text, content_type)
                .await
        }
        None => orchestrator.process_query(text).await,
    };

    match format {
        OutputFormat::Text => print!("{}", render_query_response(&response)),
        OutputFormat::Json => print_json(&response)?,
    }
    Ok(())
}

/// Classify a query and print the verdict
pub async fn handle_classify(
    orchestrator: &Orchestrator,
    text: &str,
    format: OutputFormat,
) -> Result<()> {
    let verdict = orchestrator.classify(text).await;

    match format {
        OutputFormat::Text => print!("{}", render_verdict(&verdict)),
        OutputFormat::Json => print_json(&verdict)?,
    }
    Ok(())
}

/// Request a design directly
pub async fn handle_design(
    orchestrator: &Orchestrator,
    intent: &str,
    content_type: &str,
    message: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let design = orchestrator
        .request_design(intent, content_type, message.unwrap_or_default())
        .await;

    match format {
        OutputFormat::Text => print!("{}", render_design(&design)?),
        OutputFormat::Json => print_json(&design)?,
    }
    Ok(())
}

/// List supported intents
pub fn handle_intents(orchestrator: &Orchestrator, format: OutputFormat) -> Result<()> {
    let intents = orchestrator.supported_intents();

    match format {
        OutputFormat::Text => print!("{}", render_intents(&intents)),
        OutputFormat::Json => print_json(&intents)?,
    }
    Ok(())
}

/// Show system information
pub fn handle_info(orchestrator: &Orchestrator, format: OutputFormat) -> Result<()> {
    let info = orchestrator.system_info();

    match format {
        OutputFormat::Text => print!("{}", render_system_info(&info)),
        OutputFormat::Json => print_json(&info)?,
    }
    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let toml = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", toml);
        }
        OutputFormat::Json => print_json(config)?,
    }
    Ok(())
}

/// Print the configuration file path
pub fn handle_config_path(path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => print_json(&serde_json::json!({ "path": path }))?,
    }
    Ok(())
}

/// Prompt for a secret and store it in the keychain
pub fn handle_secret_set(key: &str) -> Result<()> {
    let manager = SecretManager::new(SERVICE_NAME);
    let value = manager.prompt_for_secret(key).map_err(with_hint)?;
    manager.set_secret(key, &value).map_err(with_hint)?;
    println!("Stored '{}' in the system keychain.", key);
    Ok(())
}

/// Remove a secret from the keychain
pub fn handle_secret_delete(key: &str) -> Result<()> {
    SecretManager::new(SERVICE_NAME)
        .delete_secret(key)
        .map_err(with_hint)?;
    println!("Deleted '{}' from the system keychain.", key);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

pub fn render_query_response(response: &QueryResponse) -> String {
    let mut out = String::new();
    let status = if response.error { "error" } else { "ok" };
    out.push_str(&format!("[{}] {}\n", status, response.message));

    if !response.queries_used.is_empty() {
        out.push_str("\nQueries:\n");
        for query in &response.queries_used {
            out.push_str(&format!("  - {}\n", query));
        }
    }

    if !response.results.is_empty() {
        out.push_str("\nResults:\n");
        for (intent, payload) in &response.results {
            out.push_str(&format!("  {}: {}\n", intent, payload));
        }
    }

    if let Some(design) = &response.design {
        out.push_str("\nDesign:\n");
        out.push_str(&format!(
            "  {} / {}: {}\n",
            design.intent,
            design.content_type,
            design_status(design)
        ));
    }

    out
}

pub fn render_verdict(verdict: &IntentVerdict) -> String {
    let mut out = format!(
        "Context:    {:?}\nConfidence: {:.2}\n",
        verdict.context, verdict.confidence
    );
    if verdict.has_labels() {
        out.push_str(&format!("Intents:    {}\n", verdict.labels.join(", ")));
    }
    if verdict.inappropriate {
        out.push_str("Inappropriate language detected\n");
    }
    if let Some(reply) = &verdict.conversational_response {
        out.push_str(&format!("Reply:      {}\n", reply));
    }
    out
}

fn render_design(design: &DesignResult) -> Result<String> {
    let mut out = format!(
        "{} / {}: {}\n",
        design.intent,
        design.content_type,
        design_status(design)
    );
    if let Some(payload) = &design.payload {
        let pretty =
            serde_json::to_string_pretty(payload).context("Failed to serialize design")?;
        out.push_str(&pretty);
        out.push('\n');
    }
    Ok(out)
}

fn design_status(design: &DesignResult) -> &str {
    if design.succeeded {
        "ok"
    } else {
        design.error.as_deref().unwrap_or("failed")
    }
}

pub fn render_intents(intents: &[IntentDescription]) -> String {
    let width = intents.iter().map(|i| i.intent.len()).max().unwrap_or(0);
    intents
        .iter()
        .map(|i| format!("{:<width$}  {}\n", i.intent, i.description, width = width))
        .collect()
}

pub fn render_system_info(info: &SystemInfo) -> String {
    format!(
        "{} v{}\n  Model:       {}\n  Data API:    {}\n  Design API:  {}\n  Memory:      {} entries\n  Intents:     {}\n",
        info.name,
        info.version,
        info.model,
        or_unset(&info.data_api_url),
        or_unset(&info.design_api_url),
        info.memory_capacity,
        info.supported_intents.join(", ")
    )
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
