use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,courier=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize human-readable console logging.
///
/// Honours `RUST_LOG`, falling back to `info,courier=debug`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_console_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    info!("Console telemetry initialized");
    Ok(())
}

/// Initialize structured JSON logging, one object per line.
///
/// Event fields sit at the top level of each object and the enclosing span
/// (with its `provider` field) is attached.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_json_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true),
        )
        .try_init()?;

    info!("JSON telemetry initialized");
    Ok(())
}
