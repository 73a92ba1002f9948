//! Session registry - at most one live session per object

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use sculpt_core::{ObjectId, SculptError, SculptResult, SessionId};

#[derive(Debug, Default)]
struct Inner {
    active: Mutex<HashMap<ObjectId, SessionId>>,
    next_id: AtomicU64,
}

/// Hands out exclusive per-object leases
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Claim `object_id`. Fails with `SessionActive` while another lease is alive.
    pub fn acquire(&self, object_id: ObjectId) -> SculptResult<SessionLease> {
        let mut active = self.inner.active.lock();
        if active.contains_key(&object_id) {
            return Err(SculptError::SessionActive(object_id));
        }
        let session_id = SessionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        active.insert(object_id, session_id);
        debug!(object = %object_id, session = %session_id, "session lease acquired");

        Ok(SessionLease {
            object_id,
            session_id,
            registry: Arc::clone(&self.inner),
        })
    }

    pub fn is_active(&self, object_id: ObjectId) -> bool {
        self.inner.active.lock().contains_key(&object_id)
    }

    /// Session currently holding `object_id`
    pub fn holder(&self, object_id: ObjectId) -> Option<SessionId> {
        self.inner.active.lock().get(&object_id).copied()
    }

    pub fn active_count(&self) -> usize {
        self.inner.active.lock().len()
    }
}

/// Exclusive claim on one object; released on drop
#[derive(Debug)]
pub struct SessionLease {
    object_id: ObjectId,
    session_id: SessionId,
    registry: Arc<Inner>,
}

impl SessionLease {
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.registry.active.lock().remove(&self.object_id);
        debug!(object = %self.object_id, session = %self.session_id, "session lease released");
    }
}
