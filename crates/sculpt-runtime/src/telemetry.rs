//! Tracing subscriber setup

use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sculpt_core::{SculptError, SculptResult};

/// Logging output configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set
    pub filter: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            filter: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Production preset: JSON lines at info
    pub fn production() -> Self {
        TelemetryConfig {
            json: true,
            ..Default::default()
        }
    }

    /// Development preset: readable output with debug for the pipeline crates
    pub fn development() -> Self {
        TelemetryConfig {
            filter: "info,sculpt_capture=debug,sculpt_oracle=debug,sculpt_edit=debug".to_string(),
            ..Default::default()
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> SculptResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| SculptError::Config(format!("invalid log filter '{}': {}", config.filter, e)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(config.with_target)).try_init()
    };

    result.map_err(|e| SculptError::Config(format!("tracing already initialized: {}", e)))
}
