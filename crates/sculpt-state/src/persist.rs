//! Persisted history layout
//!
//! A store is saved as a JSON array of [`SnapshotRecord`], oldest first.
//! Each record carries the SHA-256 of its canonical scene JSON so a
//! hand-edited or truncated file is rejected on load.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use sculpt_core::{SceneDescription, SculptError, SculptResult, Timestamp, Version};

use crate::{ModelStore, Origin, Snapshot};

/// One persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub version: Version,
    pub parent_version: Option<Version>,
    pub created_by: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_text: Option<String>,
    pub created_at: Timestamp,
    pub scene: SceneDescription,
    pub scene_digest: String,
}

impl SnapshotRecord {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        SnapshotRecord {
            version: snapshot.version(),
            parent_version: snapshot.parent_version(),
            created_by: snapshot.created_by(),
            command_text: snapshot.command_text().map(str::to_string),
            created_at: snapshot.created_at(),
            scene: snapshot.scene().clone(),
            scene_digest: scene_digest(snapshot.scene()),
        }
    }
}

/// Hex SHA-256 of the canonical scene encoding
pub fn scene_digest(scene: &SceneDescription) -> String {
    hex::encode(Sha256::digest(scene.canonical_json()))
}

fn invalid<T>(msg: String) -> SculptResult<T> {
    Err(SculptError::Persistence(msg))
}

fn check_record(index: usize, record: &SnapshotRecord) -> SculptResult<()> {
    let expected = Version(index as u64);
    if record.version != expected {
        return invalid(format!("record {} has version {}, expected {}", index, record.version, expected));
    }

    let (parent, origin) = match expected.prev() {
        None => (None, Origin::Reconstruction),
        Some(p) => (Some(p), Origin::Edit),
    };
    if record.parent_version != parent {
        return invalid(format!("{} has parent {:?}, expected {:?}", expected, record.parent_version, parent));
    }
    if record.created_by != origin {
        return invalid(format!("{} created by {}, expected {}", expected, record.created_by, origin));
    }
    if origin == Origin::Edit && record.command_text.is_none() {
        return invalid(format!("{} is an edit without command text", expected));
    }

    let digest = scene_digest(&record.scene);
    if digest != record.scene_digest {
        return invalid(format!("{} scene digest mismatch", expected));
    }
    Ok(())
}

impl ModelStore {
    /// Snapshot history as persisted records, oldest first
    pub fn to_records(&self) -> Vec<SnapshotRecord> {
        self.history().iter().map(|s| SnapshotRecord::from_snapshot(s)).collect()
    }

    /// Rebuild a store, validating ordering, lineage and digests
    pub fn from_records(records: Vec<SnapshotRecord>) -> SculptResult<Self> {
        let mut snapshots = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            check_record(index, &record)?;
            snapshots.push(Arc::new(Snapshot::restore(
                record.version,
                record.scene,
                record.parent_version,
                record.created_by,
                record.command_text,
                record.created_at,
            )));
        }
        Ok(ModelStore::from_snapshots(snapshots))
    }

    pub fn to_json(&self) -> SculptResult<String> {
        serde_json::to_string_pretty(&self.to_records())
            .map_err(|e| SculptError::Persistence(e.to_string()))
    }

    pub fn from_json(json: &str) -> SculptResult<Self> {
        let records: Vec<SnapshotRecord> =
            serde_json::from_str(json).map_err(|e| SculptError::Persistence(e.to_string()))?;
        Self::from_records(records)
    }

    pub async fn save_json(&self, path: impl AsRef<Path>) -> SculptResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        // Readers see either the old file or the new one, never a partial write
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            tokio::fs::remove_file(&tmp).await.ok();
            return Err(e.into());
        }
        info!(path = %path.display(), snapshots = self.len(), "history saved");
        Ok(())
    }

    pub async fn load_json(path: impl AsRef<Path>) -> SculptResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json(&json)?;
        info!(path = %path.display(), snapshots = store.len(), "history loaded");
        Ok(store)
    }
}

/// Sibling of `path` used while a save is in flight
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
