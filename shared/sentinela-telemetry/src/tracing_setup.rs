//! Tracing Setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Targets that log every outbound request at `info`
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "lettre"];

/// Directive used when `RUST_LOG` is unset
fn default_directive(log_level: &str) -> String {
    QUIET_TARGETS
        .iter()
        .fold(log_level.to_string(), |acc, target| format!("{acc},{target}=warn"))
}

/// Install the global subscriber: one fmt layer, JSON or plain text.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&config.log_level)))
        .map_err(|e| TelemetryError::TracingInit(format!("bad log level: {e}")))?;

    let (json, plain) = if config.json_logs {
        (Some(fmt::layer().json().with_current_span(true)), None)
    } else {
        (None, Some(fmt::layer().compact()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
        .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Logging ready"
    );
    Ok(())
}
