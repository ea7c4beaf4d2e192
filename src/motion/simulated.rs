//! In-process motion source simulator
//!
//! Provides a scriptable acceleration source for integration testing without
//! real sensor hardware. Samples are injected with `emit()`; failure modes
//! (sensor unavailable, permission denied) are toggled per test.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::types::AccelerationSample;

use super::source::{ListenerHandle, MotionSource};
use super::SensorError;

/// A simulated accelerometer. Cheap to clone; clones share the same
/// subscriber registry and sample channel.
pub struct SimulatedMotionSource {
    sample_tx: broadcast::Sender<AccelerationSample>,
    subscriptions: Mutex<HashSet<ListenerHandle>>,
    unavailable: AtomicBool,
    permission_denied: AtomicBool,
    unsubscribes: AtomicUsize,
}

impl SimulatedMotionSource {
    pub fn new() -> Arc<Self> {
        let (sample_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            sample_tx,
            subscriptions: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
            permission_denied: AtomicBool::new(false),
            unsubscribes: AtomicUsize::new(0),
        })
    }

    /// Make subsequent `subscribe()` calls fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make subsequent `subscribe()` calls fail with `PermissionDenied`.
    pub fn set_permission_denied(&self, denied: bool) {
        self.permission_denied.store(denied, Ordering::SeqCst);
    }

    /// Inject a sample into the stream. Samples are delivered whether or not
    /// a subscription is live; consumers gate on their own state, matching a
    /// real sensor whose callback can race a stop request.
    pub fn emit(&self, x: f64, y: f64, z: f64) {
        let _ = self.sample_tx.send(AccelerationSample::new(x, y, z));
    }

    /// Number of currently live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Total `unsubscribe()` calls observed (for idempotence assertions).
    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MotionSource for SimulatedMotionSource {
    async fn subscribe(&self) -> Result<ListenerHandle, SensorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SensorError::Unavailable);
        }
        if self.permission_denied.load(Ordering::SeqCst) {
            return Err(SensorError::PermissionDenied);
        }
        let handle = ListenerHandle::new();
        self.subscriptions.lock().unwrap().insert(handle);
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: ListenerHandle) -> Result<(), SensorError> {
        self.subscriptions.lock().unwrap().remove(&handle);
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn samples(&self) -> broadcast::Receiver<AccelerationSample> {
        self.sample_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let source = SimulatedMotionSource::new();
        let mut rx = source.samples();

        source.emit(1.0, 2.0, 3.0);

        let sample = rx.recv().await.unwrap();
        assert_eq!(sample.x, 1.0);
        assert_eq!(sample.y, 2.0);
        assert_eq!(sample.z, 3.0);
    }

    #[tokio::test]
    async fn test_permission_denied_mode() {
        let source = SimulatedMotionSource::new();
        source.set_permission_denied(true);
        assert_eq!(
            source.subscribe().await,
            Err(SensorError::PermissionDenied)
        );

        source.set_permission_denied(false);
        assert!(source.subscribe().await.is_ok());
    }

    #[tokio::test]
    async fn test_subscription_tracking() {
        let source = SimulatedMotionSource::new();
        let a = source.subscribe().await.unwrap();
        let b = source.subscribe().await.unwrap();
        assert_eq!(source.subscription_count(), 2);

        source.unsubscribe(a).await.unwrap();
        source.unsubscribe(b).await.unwrap();
        assert_eq!(source.subscription_count(), 0);
        assert_eq!(source.unsubscribe_count(), 2);
    }
}
