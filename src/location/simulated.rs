//! In-process location source simulator
//!
//! Scriptable positioning for integration tests: a settable current
//! position, injectable watch updates, configurable permission flow, and an
//! artificial response delay for timeout tests (tokio virtual time — paused
//! clocks advance instantly).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::source::{LocationSource, RawPosition, WatchId};
use super::{LocationError, LocationOptions, PermissionState};

pub struct SimulatedLocationSource {
    position: Mutex<RawPosition>,
    permission: Mutex<PermissionState>,
    permission_on_request: Mutex<PermissionState>,
    permission_requests: AtomicUsize,
    position_requests: AtomicUsize,
    response_delay: Mutex<Duration>,
    unavailable: AtomicBool,
    watch_tx: broadcast::Sender<RawPosition>,
    watches: Mutex<HashSet<WatchId>>,
}

impl SimulatedLocationSource {
    pub fn new() -> Arc<Self> {
        let (watch_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            position: Mutex::new(RawPosition {
                latitude: 0.0,
                longitude: 0.0,
            }),
            permission: Mutex::new(PermissionState::Granted),
            permission_on_request: Mutex::new(PermissionState::Granted),
            permission_requests: AtomicUsize::new(0),
            position_requests: AtomicUsize::new(0),
            response_delay: Mutex::new(Duration::ZERO),
            unavailable: AtomicBool::new(false),
            watch_tx,
            watches: Mutex::new(HashSet::new()),
        })
    }

    /// Set the position returned by `current_position`.
    pub fn set_position(&self, latitude: f64, longitude: f64) {
        *self.position.lock().unwrap() = RawPosition {
            latitude,
            longitude,
        };
    }

    /// Set the state reported by `check_permissions`.
    pub fn set_permission(&self, state: PermissionState) {
        *self.permission.lock().unwrap() = state;
    }

    /// Set the state the user "chooses" when prompted.
    pub fn set_permission_on_request(&self, state: PermissionState) {
        *self.permission_on_request.lock().unwrap() = state;
    }

    /// Delay every `current_position` response, for timeout tests.
    pub fn set_response_delay(&self, delay: Duration) {
        *self.response_delay.lock().unwrap() = delay;
    }

    /// Make `current_position` and `watch_position` fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Deliver a position update to all live watches.
    pub fn emit_position(&self, latitude: f64, longitude: f64) {
        let _ = self.watch_tx.send(RawPosition {
            latitude,
            longitude,
        });
    }

    /// How many times the user has been prompted.
    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// How many one-shot position requests have been made.
    pub fn position_requests(&self) -> usize {
        self.position_requests.load(Ordering::SeqCst)
    }

    /// Number of watches registered and not yet cleared.
    pub fn live_watch_count(&self) -> usize {
        self.watches.lock().unwrap().len()
    }
}

#[async_trait]
impl LocationSource for SimulatedLocationSource {
    async fn current_position(
        &self,
        _options: &LocationOptions,
    ) -> Result<RawPosition, LocationError> {
        self.position_requests.fetch_add(1, Ordering::SeqCst);
        let delay = *self.response_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LocationError::Unavailable);
        }
        Ok(*self.position.lock().unwrap())
    }

    async fn watch_position(
        &self,
        _options: &LocationOptions,
    ) -> Result<(WatchId, broadcast::Receiver<RawPosition>), LocationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LocationError::Unavailable);
        }
        let id = WatchId::new();
        self.watches.lock().unwrap().insert(id);
        Ok((id, self.watch_tx.subscribe()))
    }

    async fn clear_watch(&self, id: WatchId) -> Result<(), LocationError> {
        self.watches.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn check_permissions(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permissions(&self) -> PermissionState {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let granted = *self.permission_on_request.lock().unwrap();
        *self.permission.lock().unwrap() = granted;
        granted
    }
}
