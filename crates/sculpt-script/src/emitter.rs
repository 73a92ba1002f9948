//! Script emitter
//!
//! Rendering is a pure function of the scene and the emitter config. Parts
//! are emitted in name order; version numbers, timestamps and command text
//! never reach the output.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sculpt_core::{SceneDescription, SculptError, SculptResult};
use sculpt_state::Snapshot;

use crate::format::DEFAULT_PRECISION;
use crate::{blender, openscad};

/// Target scripting language
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "blender", alias = "blender_python", alias = "python")]
    BlenderPython,
    #[serde(rename = "openscad", alias = "scad")]
    OpenScad,
}

impl Dialect {
    /// File extension for exported scripts
    pub fn extension(self) -> &'static str {
        match self {
            Dialect::BlenderPython => "py",
            Dialect::OpenScad => "scad",
        }
    }

    fn comment_prefix(self) -> &'static str {
        match self {
            Dialect::BlenderPython => "#",
            Dialect::OpenScad => "//",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::BlenderPython => write!(f, "blender"),
            Dialect::OpenScad => write!(f, "openscad"),
        }
    }
}

/// What to do with parts no dialect can render
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Fail the whole render
    #[default]
    Abort,
    /// Leave the part out and list it in [`Script::skipped`]
    Skip,
}

/// Emitter configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitterConfig {
    pub dialect: Dialect,
    pub unsupported: UnsupportedPolicy,
    /// Decimal places for every emitted number
    pub precision: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        EmitterConfig {
            dialect: Dialect::BlenderPython,
            unsupported: UnsupportedPolicy::Abort,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl EmitterConfig {
    pub fn openscad() -> Self {
        EmitterConfig {
            dialect: Dialect::OpenScad,
            ..Default::default()
        }
    }
}

/// Rendered script
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Script {
    pub dialect: Dialect,
    pub text: String,
    /// Parts left out under [`UnsupportedPolicy::Skip`], in name order
    pub skipped: Vec<String>,
}

impl Script {
    pub fn extension(&self) -> &'static str {
        self.dialect.extension()
    }
}

/// Renders scenes into scripts
#[derive(Clone, Debug, Default)]
pub struct ScriptEmitter {
    config: EmitterConfig,
}

impl ScriptEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        ScriptEmitter { config }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Render a stored snapshot
    pub fn render(&self, snapshot: &Snapshot) -> SculptResult<Script> {
        self.render_scene(snapshot.scene())
    }

    pub fn render_scene(&self, scene: &SceneDescription) -> SculptResult<Script> {
        let dialect = self.config.dialect;
        let precision = self.config.precision;

        let mut body = String::new();
        let mut skipped = Vec::new();
        for (name, part) in scene.iter() {
            let rendered = match dialect {
                Dialect::BlenderPython => blender::part(name, part, precision),
                Dialect::OpenScad => openscad::part(name, part, precision),
            };
            match rendered {
                Some(block) => body.push_str(&block),
                None => match self.config.unsupported {
                    UnsupportedPolicy::Abort => {
                        return Err(SculptError::UnsupportedPrimitive {
                            part: name.to_string(),
                            kind: part.kind.as_str().to_string(),
                        });
                    }
                    UnsupportedPolicy::Skip => {
                        warn!(part = name, kind = part.kind.as_str(), "skipping unsupported primitive");
                        skipped.push(name.to_string());
                    }
                },
            }
        }

        // Header counts rendered parts only
        let mut text = format!(
            "{} Generated by sculpt: {} part(s)\n",
            dialect.comment_prefix(),
            scene.len() - skipped.len()
        );
        text.push_str(&match dialect {
            Dialect::BlenderPython => blender::header(),
            Dialect::OpenScad => openscad::header(),
        });
        text.push_str(&body);

        debug!(%dialect, parts = scene.len(), skipped = skipped.len(), bytes = text.len(), "script rendered");
        Ok(Script { dialect, text, skipped })
    }
}
