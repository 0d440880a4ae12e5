//! A logging/recording reference `SyncManager` (§1, §6). Suitable for tests
//! and for running the control plane with SGROUP pushes visible only in
//! logs; a production deployment swaps this for a real SGROUP client behind
//! the same trait.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

use super::{ExternalSyncKey, SyncManager, SyncOp};

#[derive(Default)]
pub struct LoggingSyncClient {
    pushed: Mutex<Vec<(String, SyncOp)>>,
}

impl LoggingSyncClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every push observed so far, in order. Used by tests to assert on
    /// coordinator/reconciler behaviour without a real SGROUP endpoint.
    pub fn pushed(&self) -> Vec<(String, SyncOp)> {
        self.pushed.lock().expect("pushed mutex poisoned").clone()
    }
}

#[async_trait]
impl<T> SyncManager<T> for LoggingSyncClient
where
    T: ExternalSyncKey + Send + Sync,
{
    async fn sync_entity(&self, entity: &T, op: SyncOp) -> Result<()> {
        let key = entity.sync_key();
        info!(key = %key, ?op, "sgroup push (logging reference client)");
        self.pushed
            .lock()
            .expect("pushed mutex poisoned")
            .push((key, op));
        Ok(())
    }
}
