//! Structured logging setup.
//!
//! Library code only emits `tracing` events. Hosts that have no subscriber
//! of their own call [`init_tracing`] once at startup.

use std::sync::OnceLock;

use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber. Safe to call more than once; later calls
/// and calls after another subscriber was installed are no-ops.
pub fn init_tracing(format: LogFormat) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);

        let result = match format {
            LogFormat::Pretty => registry
                .with(fmt::layer().with_target(true).with_level(true))
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true).with_current_span(true))
                .try_init(),
        };

        if result.is_err() {
            tracing::debug!("Global tracing subscriber already set, keeping it");
        } else {
            tracing::debug!(?format, "Tracing initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing(LogFormat::Json);
        init_tracing(LogFormat::Pretty);
        tracing::info!("still logging");
    }

    #[test]
    fn test_format_from_config_value() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
