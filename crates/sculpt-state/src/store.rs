//! Model store - append-only snapshot history
//!
//! Versions are dense: the snapshot for version `v` lives at index `v`.
//! Every edit must name the current head as its base; the check and the
//! append happen under one write lock, so concurrent edits computed against
//! the same base resolve first-wins.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use sculpt_core::{SceneDescription, SculptError, SculptResult, Timestamp, Version};

use crate::Snapshot;

/// Versioned model history for one object
#[derive(Debug, Default)]
pub struct ModelStore {
    snapshots: RwLock<Vec<Arc<Snapshot>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        ModelStore::default()
    }

    /// Build from already-validated snapshots
    pub(crate) fn from_snapshots(snapshots: Vec<Arc<Snapshot>>) -> Self {
        ModelStore {
            snapshots: RwLock::new(snapshots),
        }
    }

    /// Store the first reconstruction as version 0
    pub fn append_initial(&self, scene: SceneDescription) -> SculptResult<Arc<Snapshot>> {
        let mut snapshots = self.snapshots.write();
        if !snapshots.is_empty() {
            return Err(SculptError::AlreadyInitialized);
        }

        let snapshot = Arc::new(Snapshot::initial(scene, Timestamp::now()));
        snapshots.push(Arc::clone(&snapshot));

        info!(version = %snapshot.version(), parts = snapshot.scene().len(), "initial snapshot stored");
        Ok(snapshot)
    }

    /// Store an edited scene on top of `base`.
    ///
    /// Fails with `NotFound` if `base` was never stored and `StaleEdit` if it
    /// is no longer the head. Neither failure touches the history.
    pub fn append_edit(
        &self,
        base: Version,
        scene: SceneDescription,
        command_text: &str,
    ) -> SculptResult<Arc<Snapshot>> {
        let mut snapshots = self.snapshots.write();

        let head = match snapshots.last() {
            Some(head) => head.version(),
            None => return Err(SculptError::NotFound(base)),
        };
        if base > head {
            return Err(SculptError::NotFound(base));
        }
        if base != head {
            debug!(base = %base, head = %head, "rejecting stale edit");
            return Err(SculptError::StaleEdit { base, head });
        }

        let snapshot = Arc::new(Snapshot::edit(base, scene, command_text.to_string(), Timestamp::now()));
        snapshots.push(Arc::clone(&snapshot));

        info!(version = %snapshot.version(), parent = %base, "edit snapshot stored");
        Ok(snapshot)
    }

    /// Latest snapshot, if any
    pub fn head(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.read().last().cloned()
    }

    pub fn head_version(&self) -> Option<Version> {
        self.snapshots.read().last().map(|s| s.version())
    }

    pub fn get(&self, version: Version) -> SculptResult<Arc<Snapshot>> {
        self.snapshots
            .read()
            .get(version.as_index())
            .cloned()
            .ok_or(SculptError::NotFound(version))
    }

    /// Parent chain from `version` down to version 0, newest first
    pub fn lineage(&self, version: Version) -> SculptResult<Vec<Arc<Snapshot>>> {
        let snapshots = self.snapshots.read();
        let mut current = snapshots
            .get(version.as_index())
            .ok_or(SculptError::NotFound(version))?;

        let mut chain = vec![Arc::clone(current)];
        while let Some(parent) = current.parent_version() {
            current = snapshots
                .get(parent.as_index())
                .ok_or(SculptError::NotFound(parent))?;
            chain.push(Arc::clone(current));
        }
        Ok(chain)
    }

    /// All snapshots in version order
    pub fn history(&self) -> Vec<Arc<Snapshot>> {
        self.snapshots.read().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Origin;
    use proptest::prelude::*;
    use sculpt_core::{Part, ShapeKind};

    fn scene(size: f64) -> SceneDescription {
        SceneDescription::new().with_part("body", Part::new(ShapeKind::Cube).with_param("size", size))
    }

    #[test]
    fn test_append_initial_once() {
        let store = ModelStore::new();
        assert!(store.head().is_none());

        let v0 = store.append_initial(scene(1.0)).unwrap();
        assert_eq!(v0.version(), Version::INITIAL);
        assert_eq!(v0.created_by(), Origin::Reconstruction);

        assert!(matches!(store.append_initial(scene(2.0)), Err(SculptError::AlreadyInitialized)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_edit_chain() {
        let store = ModelStore::new();
        store.append_initial(scene(1.0)).unwrap();
        let v1 = store.append_edit(Version(0), scene(2.0), "bigger").unwrap();
        let v2 = store.append_edit(Version(1), scene(3.0), "bigger again").unwrap();

        assert_eq!(v1.version(), Version(1));
        assert_eq!(v2.parent_version(), Some(Version(1)));
        assert_eq!(store.head_version(), Some(Version(2)));
        assert_eq!(store.get(Version(1)).unwrap().command_text(), Some("bigger"));

        let lineage: Vec<Version> = store.lineage(Version(2)).unwrap().iter().map(|s| s.version()).collect();
        assert_eq!(lineage, vec![Version(2), Version(1), Version(0)]);
    }

    #[test]
    fn test_stale_edit_rejected() {
        let store = ModelStore::new();
        store.append_initial(scene(1.0)).unwrap();
        store.append_edit(Version(0), scene(2.0), "a").unwrap();

        let err = store.append_edit(Version(0), scene(9.0), "b").unwrap_err();
        assert!(matches!(
            err,
            SculptError::StaleEdit {
                base: Version(0),
                head: Version(1)
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(store.len(), 2);
        assert_eq!(store.head().unwrap().scene(), &scene(2.0));
    }

    #[test]
    fn test_missing_versions() {
        let store = ModelStore::new();
        assert!(matches!(store.append_edit(Version(0), scene(1.0), "x"), Err(SculptError::NotFound(_))));
        store.append_initial(scene(1.0)).unwrap();
        assert!(matches!(store.get(Version(5)), Err(SculptError::NotFound(Version(5)))));
        assert!(matches!(store.lineage(Version(5)), Err(SculptError::NotFound(_))));
        assert!(matches!(store.append_edit(Version(3), scene(1.0), "x"), Err(SculptError::NotFound(_))));
    }

    #[test]
    fn test_concurrent_edits_first_wins() {
        let store = Arc::new(ModelStore::new());
        store.append_initial(scene(1.0)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.append_edit(Version(0), scene(i as f64), "race"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, SculptError::StaleEdit { .. })));
        assert_eq!(store.len(), 2);
    }

    proptest! {
        /// Any interleaving of fresh and stale edits keeps versions dense
        /// and parent links pointing one step back.
        #[test]
        fn prop_history_stays_contiguous(ops in proptest::collection::vec((any::<bool>(), 0u64..4), 0..40)) {
            let store = ModelStore::new();
            store.append_initial(scene(0.0)).unwrap();

            for (fresh, lag) in ops {
                let head = store.head_version().unwrap();
                let base = if fresh { head } else { Version(head.0.saturating_sub(lag + 1)) };
                let before = store.len();
                let result = store.append_edit(base, scene(before as f64), "op");

                if base == head {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(store.len(), before + 1);
                } else {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(store.len(), before);
                }
            }

            for (i, snap) in store.history().iter().enumerate() {
                prop_assert_eq!(snap.version(), Version(i as u64));
                let expected_parent = if i == 0 { None } else { Some(Version(i as u64 - 1)) };
                prop_assert_eq!(snap.parent_version(), expected_parent);
            }
        }
    }
}
