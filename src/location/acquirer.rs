//! Location acquirer — permission-gated one-shot and watched acquisition.
//!
//! Every successful fix is written to the GeofixCache and mirrored into the
//! durable store before the call returns, so concurrent readers always see a
//! consistent latest-fix view. Watch updates and `cancel_watch` serialize on
//! a per-watch gate: once `cancel_watch` returns, no in-flight update can
//! touch the cache.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::store::{keys, KeyValueStore};
use crate::types::GeoFix;

use super::cache::GeofixCache;
use super::source::{LocationSource, RawPosition, WatchId};
use super::{LocationError, LocationOptions, PermissionState};

/// Token for a live continuous watch, owned by the caller (the session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchHandle {
    id: WatchId,
}

struct ActiveWatch {
    id: WatchId,
    /// Gate shared with the update task. `true` while the watch is live;
    /// `cancel_watch` flips it under the lock, which is what makes
    /// cancellation race-free against in-flight updates.
    gate: Arc<Mutex<bool>>,
}

/// Fronts a `LocationSource` with permission handling, timeouts, coordinate
/// validation, and cache/store mirroring.
pub struct LocationAcquirer {
    source: Arc<dyn LocationSource>,
    cache: Arc<GeofixCache>,
    store: Arc<dyn KeyValueStore>,
    watch: Mutex<Option<ActiveWatch>>,
}

impl LocationAcquirer {
    pub fn new(
        source: Arc<dyn LocationSource>,
        cache: Arc<GeofixCache>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            source,
            cache,
            store,
            watch: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<GeofixCache> {
        &self.cache
    }

    /// Seed the cache from the fix persisted in a previous run, if any.
    pub async fn restore_last_fix(&self) {
        match self.store.get(keys::LAST_LOCATION).await {
            Ok(Some(value)) => match serde_json::from_value::<GeoFix>(value) {
                Ok(fix) => self.cache.store(fix),
                Err(e) => log::warn!("Ignoring malformed persisted fix: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read persisted fix: {}", e),
        }
    }

    /// Resolve the current position once.
    ///
    /// The call is bounded by `options.timeout` and fails with
    /// `LocationError::Timeout` rather than hanging. The returned fix has
    /// already been written to the cache and the durable store.
    pub async fn get_once(&self, options: &LocationOptions) -> Result<GeoFix, LocationError> {
        self.ensure_permission().await?;
        let raw = tokio::time::timeout(options.timeout, self.source.current_position(options))
            .await
            .map_err(|_| LocationError::Timeout)??;
        self.accept_fix(raw).await
    }

    /// Start a continuous watch. At most one watch is live at a time: while
    /// one is active, further calls return the existing handle unchanged.
    pub async fn watch(&self, options: &LocationOptions) -> Result<WatchHandle, LocationError> {
        let mut guard = self.watch.lock().await;
        if let Some(active) = guard.as_ref() {
            return Ok(WatchHandle { id: active.id });
        }

        self.ensure_permission().await?;
        let (id, rx) = self.source.watch_position(options).await?;
        let gate = Arc::new(Mutex::new(true));

        self.spawn_update_task(rx, Arc::clone(&gate));
        *guard = Some(ActiveWatch { id, gate });
        Ok(WatchHandle { id })
    }

    /// Cancel a watch. After this returns, no update from the canceled watch
    /// will mutate the cache. Unknown or already-canceled handles are a
    /// no-op.
    pub async fn cancel_watch(&self, handle: WatchHandle) -> Result<(), LocationError> {
        let mut guard = self.watch.lock().await;
        match guard.take() {
            Some(active) if active.id == handle.id => {
                // Holding the gate while flipping it means any update that
                // started before cancellation has finished its cache write
                // by the time we proceed.
                *active.gate.lock().await = false;
                self.source.clear_watch(active.id).await
            }
            Some(other) => {
                *guard = Some(other);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// The handle of the live watch, if one exists.
    pub async fn active_watch(&self) -> Option<WatchHandle> {
        self.watch.lock().await.as_ref().map(|a| WatchHandle { id: a.id })
    }

    /// Cancel whatever watch is live. Used by session teardown, where the
    /// caller may not hold the handle.
    pub async fn cancel_active_watch(&self) -> Result<(), LocationError> {
        match self.active_watch().await {
            Some(handle) => self.cancel_watch(handle).await,
            None => Ok(()),
        }
    }

    fn spawn_update_task(
        &self,
        mut rx: broadcast::Receiver<RawPosition>,
        gate: Arc<Mutex<bool>>,
    ) {
        let cache = Arc::clone(&self.cache);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(raw) => {
                        let live = gate.lock().await;
                        if !*live {
                            break;
                        }
                        if !GeoFix::in_range(raw.latitude, raw.longitude) {
                            log::warn!(
                                "Discarding out-of-range watch update ({}, {})",
                                raw.latitude,
                                raw.longitude
                            );
                            continue;
                        }
                        let fix = GeoFix::new(raw.latitude, raw.longitude);
                        cache.store(fix);
                        persist_fix(&*store, &fix).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Only the latest position matters.
                        log::debug!("Watch lagged, skipped {} updates", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Check permission and, when undecided or previously denied, request it
    /// exactly once. A denial after that single request surfaces as
    /// `PermissionDenied` — there is no prompt loop.
    async fn ensure_permission(&self) -> Result<(), LocationError> {
        if self.source.check_permissions().await == PermissionState::Granted {
            return Ok(());
        }
        match self.source.request_permissions().await {
            PermissionState::Granted => Ok(()),
            _ => Err(LocationError::PermissionDenied),
        }
    }

    async fn accept_fix(&self, raw: RawPosition) -> Result<GeoFix, LocationError> {
        if !GeoFix::in_range(raw.latitude, raw.longitude) {
            log::warn!(
                "Location source returned out-of-range coordinates ({}, {})",
                raw.latitude,
                raw.longitude
            );
            return Err(LocationError::Unavailable);
        }
        let fix = GeoFix::new(raw.latitude, raw.longitude);
        self.cache.store(fix);
        persist_fix(&*self.store, &fix).await;
        Ok(fix)
    }
}

/// Mirror a fix into the durable store. Persistence is best-effort: a store
/// failure degrades restart recovery but must not fail the acquisition that
/// produced the fix.
async fn persist_fix(store: &dyn KeyValueStore, fix: &GeoFix) {
    match serde_json::to_value(fix) {
        Ok(value) => {
            if let Err(e) = store.set(keys::LAST_LOCATION, value).await {
                log::warn!("Failed to persist fix: {}", e);
            }
        }
        Err(e) => log::warn!("Failed to serialize fix: {}", e),
    }
}
