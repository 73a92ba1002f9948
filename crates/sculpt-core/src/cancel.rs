//! Cooperative cancellation for device and oracle round-trips
//!
//! A token is cloned into every call that may block. Cancelling any clone
//! wakes all waiters; the in-flight future is dropped, which aborts it.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::{SculptError, SculptResult};

/// Shared cancellation flag
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        CancelToken {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Every token holds the sender, so this is unreachable while
                // `self` is alive.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `fut` to completion unless cancelled first.
    /// On cancellation the future is dropped and `Cancelled` is returned.
    pub async fn run<F: Future>(&self, fut: F) -> SculptResult<F::Output> {
        if self.is_cancelled() {
            return Err(SculptError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(SculptError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
