//! Model snapshot - one immutable version of a scene

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sculpt_core::{SceneDescription, Timestamp, Version};

/// What produced a snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Reconstruction,
    Edit,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Reconstruction => "reconstruction",
            Origin::Edit => "edit",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable model version.
///
/// Only the store creates snapshots, so `version` and `parent_version`
/// always describe a valid position in its history.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    version: Version,
    scene: Arc<SceneDescription>,
    parent_version: Option<Version>,
    created_by: Origin,
    command_text: Option<String>,
    created_at: Timestamp,
}

impl Snapshot {
    pub(crate) fn initial(scene: SceneDescription, created_at: Timestamp) -> Self {
        Snapshot {
            version: Version::INITIAL,
            scene: Arc::new(scene),
            parent_version: None,
            created_by: Origin::Reconstruction,
            command_text: None,
            created_at,
        }
    }

    pub(crate) fn edit(
        base: Version,
        scene: SceneDescription,
        command_text: String,
        created_at: Timestamp,
    ) -> Self {
        Snapshot {
            version: base.next(),
            scene: Arc::new(scene),
            parent_version: Some(base),
            created_by: Origin::Edit,
            command_text: Some(command_text),
            created_at,
        }
    }

    /// Rebuild from persisted fields; callers validate ordering
    pub(crate) fn restore(
        version: Version,
        scene: SceneDescription,
        parent_version: Option<Version>,
        created_by: Origin,
        command_text: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Snapshot {
            version,
            scene: Arc::new(scene),
            parent_version,
            created_by,
            command_text,
            created_at,
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn scene(&self) -> &SceneDescription {
        &self.scene
    }

    #[inline]
    pub fn parent_version(&self) -> Option<Version> {
        self.parent_version
    }

    #[inline]
    pub fn created_by(&self) -> Origin {
        self.created_by
    }

    /// Edit instruction that produced this version; None for reconstructions
    pub fn command_text(&self) -> Option<&str> {
        self.command_text.as_deref()
    }

    #[inline]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sculpt_core::{Part, ShapeKind};

    #[test]
    fn test_initial_snapshot() {
        let scene = SceneDescription::new().with_part("body", Part::new(ShapeKind::Cube));
        let snap = Snapshot::initial(scene.clone(), Timestamp::ZERO);
        assert_eq!(snap.version(), Version::INITIAL);
        assert_eq!(snap.parent_version(), None);
        assert_eq!(snap.created_by(), Origin::Reconstruction);
        assert_eq!(snap.command_text(), None);
        assert_eq!(snap.scene(), &scene);
    }

    #[test]
    fn test_edit_snapshot_links_parent() {
        let snap = Snapshot::edit(Version(2), SceneDescription::new(), "taller".into(), Timestamp::ZERO);
        assert_eq!(snap.version(), Version(3));
        assert_eq!(snap.parent_version(), Some(Version(2)));
        assert_eq!(snap.created_by(), Origin::Edit);
        assert_eq!(snap.command_text(), Some("taller"));
    }

    #[test]
    fn test_origin_serde() {
        assert_eq!(serde_json::to_string(&Origin::Edit).unwrap(), "\"edit\"");
        assert_eq!(Origin::Reconstruction.to_string(), "reconstruction");
    }
}
