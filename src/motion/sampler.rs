//! Motion sampler — owns the sensor subscription lifecycle.
//!
//! Wraps a `MotionSource` and guarantees at most one live subscription:
//! `start()` while already started returns the existing handle, `stop()`
//! twice in a row is a no-op. The session relies on both guarantees to keep
//! its own state machine simple.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::types::AccelerationSample;

use super::source::{ListenerHandle, MotionSource};
use super::SensorError;

/// Owns the start/stop lifecycle for a motion source subscription.
pub struct MotionSampler {
    source: Arc<dyn MotionSource>,
    handle: Mutex<Option<ListenerHandle>>,
}

impl MotionSampler {
    pub fn new(source: Arc<dyn MotionSource>) -> Self {
        Self {
            source,
            handle: Mutex::new(None),
        }
    }

    /// Start sampling. Idempotent: if a subscription is already live, the
    /// existing handle is returned and no second subscription is made.
    pub async fn start(&self) -> Result<ListenerHandle, SensorError> {
        let mut guard = self.handle.lock().await;
        if let Some(existing) = *guard {
            return Ok(existing);
        }
        let handle = self.source.subscribe().await?;
        *guard = Some(handle);
        Ok(handle)
    }

    /// Stop sampling and release the subscription. Idempotent: stopping an
    /// already-stopped sampler does nothing and succeeds.
    pub async fn stop(&self) -> Result<(), SensorError> {
        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.take() {
            self.source.unsubscribe(handle).await?;
        }
        Ok(())
    }

    /// Whether a subscription is currently live.
    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Subscribe to the sample stream. Lagged receivers skip the oldest
    /// samples (drop-oldest backpressure).
    pub fn samples(&self) -> broadcast::Receiver<AccelerationSample> {
        self.source.samples()
    }
}
