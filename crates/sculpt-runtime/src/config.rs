//! Pipeline configuration file
//!
//! JSON, every field optional. Durations are humantime strings:
//! ```json
//! {
//!   "capture": { "angle_count": 12, "retry": { "max_attempts": 4, "initial_delay": "250ms" } },
//!   "oracle": { "retry": { "max_attempts": 6, "max_delay": "10s" } },
//!   "edit": { "max_command_chars": 400 },
//!   "script": { "dialect": "openscad", "unsupported": "skip" },
//!   "telemetry": { "filter": "sculpt=debug", "json": true },
//!   "output_dir": "out"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use sculpt_capture::{CaptureConfig, CaptureSettings, MIN_ANGLE_COUNT};
use sculpt_core::{RetryConfig, SculptError, SculptResult};
use sculpt_edit::EditConfig;
use sculpt_oracle::OracleConfig;
use sculpt_script::{Dialect, EmitterConfig, UnsupportedPolicy};

use crate::TelemetryConfig;

/// Stops per revolution when the file does not say
pub const DEFAULT_ANGLE_COUNT: u32 = 8;

fn humantime_opt<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// Overrides for a [`RetryConfig`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    #[serde(deserialize_with = "humantime_opt")]
    pub initial_delay: Option<Duration>,
    #[serde(deserialize_with = "humantime_opt")]
    pub max_delay: Option<Duration>,
    pub multiplier: Option<f64>,
    pub jitter: Option<bool>,
}

impl RetrySection {
    pub fn apply(&self, mut base: RetryConfig) -> RetryConfig {
        if let Some(n) = self.max_attempts {
            base = base.max_attempts(n);
        }
        if let Some(d) = self.initial_delay {
            base = base.initial_delay(d);
        }
        if let Some(d) = self.max_delay {
            base = base.max_delay(d);
        }
        if let Some(m) = self.multiplier {
            base = base.multiplier(m);
        }
        if let Some(j) = self.jitter {
            base = base.jitter(j);
        }
        base
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSection {
    pub angle_count: Option<u32>,
    pub retry: RetrySection,
    pub resolution: Option<(u32, u32)>,
    pub zoom: Option<f64>,
    #[serde(deserialize_with = "humantime_opt")]
    pub settle_delay: Option<Duration>,
    /// Directory for `angle_NNN.<ext>` copies of every accepted set
    pub archive_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleSection {
    pub retry: RetrySection,
    pub reconstruct_prompt: Option<String>,
    pub edit_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditSection {
    pub max_command_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptSection {
    pub dialect: Option<Dialect>,
    pub unsupported: Option<UnsupportedPolicy>,
    pub precision: Option<usize>,
}

/// Whole-pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub capture: CaptureSection,
    pub oracle: OracleSection,
    pub edit: EditSection,
    pub script: ScriptSection,
    pub telemetry: TelemetryConfig,
    /// Where `Session::export` writes scripts and history
    pub output_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> SculptResult<Self> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| SculptError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SculptResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SculptError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> SculptResult<()> {
        if self.angle_count() < MIN_ANGLE_COUNT {
            return Err(SculptError::Config(format!(
                "capture.angle_count must be at least {}",
                MIN_ANGLE_COUNT
            )));
        }
        if let Some(zoom) = self.capture.zoom {
            if !zoom.is_finite() || zoom < 1.0 {
                return Err(SculptError::Config("capture.zoom must be >= 1.0".into()));
            }
        }
        if self.edit.max_command_chars == Some(0) {
            return Err(SculptError::Config("edit.max_command_chars must be positive".into()));
        }
        for (name, retry) in [("capture", &self.capture.retry), ("oracle", &self.oracle.retry)] {
            if retry.max_attempts == Some(0) {
                return Err(SculptError::Config(format!("{}.retry.max_attempts must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn angle_count(&self) -> u32 {
        self.capture.angle_count.unwrap_or(DEFAULT_ANGLE_COUNT)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        let base = CaptureConfig::default();
        let defaults = CaptureSettings::default();
        CaptureConfig {
            retry: self.capture.retry.apply(base.retry),
            settings: CaptureSettings {
                resolution: self.capture.resolution.unwrap_or(defaults.resolution),
                zoom: self.capture.zoom.unwrap_or(defaults.zoom),
                settle_delay: self.capture.settle_delay.unwrap_or(defaults.settle_delay),
            },
        }
    }

    pub fn oracle_config(&self) -> OracleConfig {
        let base = OracleConfig::default();
        OracleConfig {
            retry: self.oracle.retry.apply(base.retry),
            reconstruct_prompt: self.oracle.reconstruct_prompt.clone().unwrap_or(base.reconstruct_prompt),
            edit_prompt: self.oracle.edit_prompt.clone().unwrap_or(base.edit_prompt),
        }
    }

    pub fn edit_config(&self) -> EditConfig {
        let base = EditConfig::default();
        EditConfig {
            max_command_chars: self.edit.max_command_chars.unwrap_or(base.max_command_chars),
        }
    }

    pub fn emitter_config(&self) -> EmitterConfig {
        let base = EmitterConfig::default();
        EmitterConfig {
            dialect: self.script.dialect.unwrap_or(base.dialect),
            unsupported: self.script.unsupported.unwrap_or(base.unsupported),
            precision: self.script.precision.unwrap_or(base.precision),
        }
    }
}
