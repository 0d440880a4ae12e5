//! Resource Services (§4.F): business logic for the externally-owned
//! resources. Each module validates and writes inside one writer session,
//! commits, then performs out-of-transaction side effects (binding splices,
//! forced AddressGroup sync) and triggers the recomputer.

pub mod address_group;
pub mod address_group_binding;
pub mod ieagag_rule;
pub mod network;
pub mod network_binding;
pub mod rule_s2s;
pub mod service;
pub mod service_alias;

use std::sync::Arc;
use std::time::Duration;

use crate::conditions::ConditionRecorder;
use crate::engine::locks::KeyedLockManager;
use crate::model::{AddressGroup, IeAgAgRule};
use crate::store::Registry;
use crate::sync::coordinator::{RetryPolicy, SyncCoordinator};
use crate::sync::mock::LoggingSyncClient;
use crate::sync::SyncManager;

/// Shared context threaded into every resource service and HTTP handler:
/// the collaborators §1 enumerates, wired to their in-process reference
/// implementations. A production deployment swaps `registry`/the sync
/// clients behind `ieagag_sync`/`address_group_sync` for durable/SGROUP
/// backends without touching this struct's shape.
pub struct Engine {
    pub registry: Arc<dyn Registry>,
    pub locks: KeyedLockManager,
    pub ieagag_sync: SyncCoordinator<IeAgAgRule>,
    pub address_group_sync: SyncCoordinator<AddressGroup>,
    pub conditions: ConditionRecorder,
}

impl Engine {
    pub fn new(registry: Arc<dyn Registry>, retry: RetryPolicy, debounce_window: Duration) -> Self {
        Self::with_sync_clients(
            registry,
            Arc::new(LoggingSyncClient::new()),
            Arc::new(LoggingSyncClient::new()),
            retry,
            debounce_window,
        )
    }

    pub fn with_sync_clients(
        registry: Arc<dyn Registry>,
        ieagag_client: Arc<dyn SyncManager<IeAgAgRule>>,
        address_group_client: Arc<dyn SyncManager<AddressGroup>>,
        retry: RetryPolicy,
        debounce_window: Duration,
    ) -> Self {
        Self {
            registry,
            locks: KeyedLockManager::new(),
            ieagag_sync: SyncCoordinator::new(ieagag_client, retry, debounce_window),
            address_group_sync: SyncCoordinator::new(address_group_client, retry, debounce_window),
            conditions: ConditionRecorder::new(),
        }
    }
}
