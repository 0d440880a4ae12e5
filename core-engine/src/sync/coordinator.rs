//! The External Sync Coordinator (§4.H): per-key debouncing, bounded
//! exponential retries, and a small state machine exposed for
//! introspection/tests. Wraps any `SyncManager` implementation.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{ExternalSyncKey, SyncManager, SyncOp};

/// Bounded exponential backoff parameters (§4.H expansion). Defaults:
/// base 100ms, factor 2, 5 attempts total, capped at 2s.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub factor: u32,
    pub max_attempts: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            factor: 2,
            max_attempts: 5,
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(self.factor.saturating_pow(attempt));
        scaled.min(self.max_delay)
    }
}

/// Per-sync-key lifecycle, exposed read-only for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    InFlight,
    Success,
    Failed,
}

/// Debounces and retries pushes of `T` through an inner `SyncManager`.
///
/// One coordinator instance is shared process-wide per entity type, the way
/// the aggregation lock manager (`engine::locks`) shares one `DashMap`
/// process-wide for its own keyspace.
pub struct SyncCoordinator<T>
where
    T: ExternalSyncKey + Send + Sync,
{
    client: Arc<dyn SyncManager<T>>,
    retry: RetryPolicy,
    debounce_window: Duration,
    last_attempt: DashMap<String, Instant>,
    state: DashMap<String, SyncState>,
    in_flight: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl<T> SyncCoordinator<T>
where
    T: ExternalSyncKey + Send + Sync,
{
    pub fn new(client: Arc<dyn SyncManager<T>>, retry: RetryPolicy, debounce_window: Duration) -> Self {
        Self {
            client,
            retry,
            debounce_window,
            last_attempt: DashMap::new(),
            state: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    pub fn state_of(&self, entity: &T, op: SyncOp) -> SyncState {
        self.state
            .get(&debounce_key(entity, op))
            .map(|s| *s)
            .unwrap_or(SyncState::Idle)
    }

    /// Debounced push: if a push for the same `(op, key)` happened within
    /// the debounce window, this call is dropped (returns `Ok(())` without
    /// touching the client).
    pub async fn sync(&self, entity: &T, op: SyncOp, cancel: &CancellationToken) -> Result<()> {
        self.sync_inner(entity, op, false, cancel).await
    }

    /// Bypasses debouncing. Used when freshness is required, e.g. after an
    /// AddressGroup's Networks changed (§4.D, §4.H).
    pub async fn sync_forced(&self, entity: &T, op: SyncOp, cancel: &CancellationToken) -> Result<()> {
        self.sync_inner(entity, op, true, cancel).await
    }

    async fn sync_inner(
        &self,
        entity: &T,
        op: SyncOp,
        forced: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let key = debounce_key(entity, op);

        if !forced {
            if let Some(last) = self.last_attempt.get(&key) {
                if last.elapsed() < self.debounce_window {
                    debug!(key = %key, "sync debounced");
                    return Ok(());
                }
            }
        }

        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        self.state.insert(key.clone(), SyncState::InFlight);
        self.last_attempt.insert(key.clone(), Instant::now());

        let mut last_err = None;
        for attempt in 0..self.retry.max_attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled(format!("sync cancelled for {key}")));
            }

            match self.client.sync_entity(entity, op).await {
                Ok(()) => {
                    self.state.insert(key, SyncState::Success);
                    return Ok(());
                }
                Err(err) => {
                    warn!(key = %key, attempt, error = %err, "sgroup push failed");
                    last_err = Some(err);
                    if attempt + 1 < self.retry.max_attempts {
                        let delay = self.retry.delay_for_attempt(attempt);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => {
                                return Err(Error::Cancelled(format!("sync cancelled for {key}")));
                            }
                        }
                    }
                }
            }
        }

        self.state.insert(key.clone(), SyncState::Failed);
        Err(Error::ExternalSyncError(format!(
            "{key}: exhausted {} attempts: {}",
            self.retry.max_attempts,
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

fn debounce_key<T: ExternalSyncKey>(entity: &T, op: SyncOp) -> String {
    format!("{:?}:{}", op, entity.sync_key())
}
