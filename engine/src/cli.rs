//! CLI interface for Concierge
//!
//! Command-line interface built with clap's derive API. The same pipeline that
//! backs the HTTP server can be driven one query at a time from the shell.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Concierge
///
/// Routes customer questions through intent classification to the data and
/// design services.
#[derive(Parser, Debug)]
#[command(name = "concierge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Address to bind, overriding server.bind
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Run one query through the full pipeline
    Query {
        /// The customer's question
        text: String,

        /// Also fetch a design of this type for the first intent
        #[arg(long, value_name = "TYPE")]
        design_type: Option<String>,
    },

    /// Classify a query without fetching any data
    Classify {
        /// Text to classify
        text: String,
    },

    /// Request a design directly
    Design {
        /// Intent label (e.g. "events")
        intent: String,
        /// Design type (e.g. "Events")
        #[arg(value_name = "TYPE")]
        content_type: String,
        /// Optional context message
        message: Option<String>,
    },

    /// List supported intents
    Intents,

    /// Show model, endpoints and memory settings
    Info,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage secrets in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus environment overrides)
    Show,

    /// Print the configuration file path
    Path,
}

/// Secret management actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a secret (prompts for the value)
    Set {
        /// Secret key (e.g. "openai_api_key")
        key: String,
    },

    /// Remove a secret
    Delete {
        /// Secret key
        key: String,
    },
}
