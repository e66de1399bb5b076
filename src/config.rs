//! Dispatch configuration.
//!
//! Defaults are usable as-is. [`DispatchConfig::load`] layers an optional
//! file and `DISPATCH__*` environment variables on top, e.g.
//! `DISPATCH__RATE_LIMIT__MAX_REQUESTS=20`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Default deferral threshold, under the platform's 3 second deadline.
pub const DEFAULT_DEFER_THRESHOLD: Duration = Duration::from_millis(2500);

/// When to send a deferred acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferralPolicy {
    /// Defer before running the handler.
    Always,
    /// Never defer; the handler must answer within the deadline.
    Never,
    /// Defer only if the handler is still running after the threshold.
    Race,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeferralConfig {
    pub policy: DeferralPolicy,
    pub threshold_ms: u64,
    /// Whether the deferred acknowledgment is ephemeral.
    pub ephemeral: bool,
}

impl Default for DeferralConfig {
    fn default() -> Self {
        Self {
            policy: DeferralPolicy::Race,
            threshold_ms: DEFAULT_DEFER_THRESHOLD.as_millis() as u64,
            ephemeral: false,
        }
    }
}

impl DeferralConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per window.
    pub max_requests: u64,
    pub window_ms: u64,
    /// How often idle buckets are reclaimed.
    pub sweep_interval_ms: u64,
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_ms: 10_000,
            sweep_interval_ms: 60_000,
            message: "You're doing that too fast. Please wait a moment.".to_string(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Keep offering the event to later handlers after one handled it,
    /// until a handler sets `stop_dispatch`.
    pub continue_after_handled: bool,
    /// Ephemeral text sent when no handler claims an event.
    pub unrecognized_message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            continue_after_handled: false,
            unrecognized_message: "Sorry, I don't know how to handle that.".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub deferral: DeferralConfig,
    pub rate_limit: RateLimitConfig,
    pub pipeline: PipelineConfig,
}

impl DispatchConfig {
    /// Load defaults, then an optional file, then `DISPATCH__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("DISPATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
