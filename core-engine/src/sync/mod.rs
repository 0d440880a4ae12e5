//! The external sync contract (§6): pushing entities to SGROUP. This module
//! defines the trait shape the core needs; `coordinator` wraps any
//! implementation with debouncing and retries (§4.H) and `mock` ships a
//! logging reference client good enough to run the control plane and its
//! tests without a real SGROUP endpoint.

pub mod coordinator;
pub mod mock;

use async_trait::async_trait;

use crate::error::Result;

pub use crate::store::SyncOp;

/// An entity that can be pushed to SGROUP advertises a stable key under
/// which its pushes are identified, debounced and retried.
pub trait ExternalSyncKey {
    fn sync_key(&self) -> String;
}

/// One-shot pushes of `T` to the external enforcement plane. Implementations
/// are expected to be cheap to construct and safe to share behind an `Arc`.
#[async_trait]
pub trait SyncManager<T>: Send + Sync
where
    T: ExternalSyncKey + Send + Sync,
{
    async fn sync_entity(&self, entity: &T, op: SyncOp) -> Result<()>;

    async fn sync_batch(&self, entities: &[T], op: SyncOp) -> Result<()> {
        for entity in entities {
            self.sync_entity(entity, op).await?;
        }
        Ok(())
    }
}
