//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for the server and the CLI.
//! Log level priority: `RUST_LOG` > `--log` flag > `core.log_level` > "info".
//! Debug builds print pretty terminal output; release builds emit JSON lines
//! carrying the current span (and with it the pipeline request id).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is not set.
fn default_filter(log_level: &str) -> String {
    format!("{},concierge_engine={}", log_level, log_level)
}

/// Initialize the tracing subscriber with the given log level.
///
/// Calling this twice is harmless: the second `try_init` is ignored.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}
