// Concierge
// Main entry point for the concierge binary

use anyhow::Context;
use clap::Parser;
use concierge_engine::cli::{Cli, Command, ConfigAction, SecretAction};
use concierge_engine::config::Config;
use concierge_engine::handlers::{
    handle_classify, handle_config_path, handle_config_show, handle_design, handle_info,
    handle_intents, handle_query, handle_secret_delete, handle_secret_set, handle_serve,
    with_hint, OutputFormat,
};
use concierge_engine::orchestrator::Orchestrator;
use concierge_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path().map_err(with_hint)?,
    };

    // Load configuration (or use custom path if provided)
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)
    } else {
        Config::load_or_create()
    }
    .map_err(with_hint)
    .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // RUST_LOG still wins inside init_telemetry_with_level
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Concierge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { bind } => handle_serve(&config, bind).await,

        Command::Query { text, design_type } => {
            let orchestrator = build_orchestrator(&config)?;
            handle_query(&orchestrator, &text, design_type.as_deref(), format).await
        }

        Command::Classify { text } => {
            let orchestrator = build_orchestrator(&config)?;
            handle_classify(&orchestrator, &text, format).await
        }

        Command::Design {
            intent,
            content_type,
            message,
        } => {
            let orchestrator = build_orchestrator(&config)?;
            handle_design(
                &orchestrator,
                &intent,
                &content_type,
                message.as_deref(),
                format,
            )
            .await
        }

        Command::Intents => handle_intents(&build_orchestrator(&config)?, format),

        Command::Info => handle_info(&build_orchestrator(&config)?, format),

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(&config_path, format),
        },

        Command::Secret { action } => match action {
            SecretAction::Set { key } => handle_secret_set(&key),
            SecretAction::Delete { key } => handle_secret_delete(&key),
        },
    }
}

fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    Orchestrator::from_config(config).context("Failed to build pipeline")
}
