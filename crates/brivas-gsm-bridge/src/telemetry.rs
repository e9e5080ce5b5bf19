//! Log output of the bridge daemon

use crate::errors::BridgeError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Level for the bridge's own targets
const LEVEL_ENV: &str = "GSM_BRIDGE_LOG";
/// `json` (default) or `text`
const FORMAT_ENV: &str = "GSM_BRIDGE_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub level: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: lookup(LEVEL_ENV).unwrap_or(defaults.level),
            json: lookup(FORMAT_ENV).map_or(defaults.json, |v| !v.eq_ignore_ascii_case("text")),
        }
    }

    /// Filter used when `RUST_LOG` is unset: dependencies only report
    /// warnings, the library and binary log at `level`
    pub fn default_directives(&self) -> String {
        format!("warn,brivas_gsm_bridge={0},gsm_bridge={0}", self.level)
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), BridgeError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::try_new(directives),
        Err(_) => EnvFilter::try_new(config.default_directives()),
    }
    .map_err(|e| BridgeError::TracingInit(e.to_string()))?;

    let output = tracing_subscriber::fmt::layer().with_target(true);
    let output = if config.json {
        output.json().with_current_span(true).boxed()
    } else {
        output.compact().boxed()
    };
    tracing_subscriber::registry()
        .with(output.with_filter(filter))
        .try_init()
        .map_err(|e| BridgeError::TracingInit(e.to_string()))
}
