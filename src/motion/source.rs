//! Motion source trait definitions
//!
//! Defines the abstract acceleration-sensor interface that both the
//! simulated source and platform-specific implementations conform to.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::AccelerationSample;

use super::SensorError;

/// Token identifying an active sensor subscription. Owned by the sampler;
/// releasing it through `unsubscribe` is the only way to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub Uuid);

impl ListenerHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A source of three-axis acceleration samples.
///
/// Samples arrive at sensor-driven cadence on the broadcast channel. The
/// channel has drop-oldest semantics: a consumer that falls behind skips the
/// oldest samples, which is the intended backpressure policy — impact
/// detection only needs the latest delta.
#[async_trait]
pub trait MotionSource: Send + Sync {
    /// Begin sample delivery. Fails with `Unavailable` when no sensor is
    /// present or `PermissionDenied` when the platform refuses access;
    /// neither is retried automatically.
    async fn subscribe(&self) -> Result<ListenerHandle, SensorError>;

    /// Release a subscription. Unknown handles are a no-op so teardown
    /// races stay harmless.
    async fn unsubscribe(&self, handle: ListenerHandle) -> Result<(), SensorError>;

    /// Subscribe to the sample stream.
    fn samples(&self) -> broadcast::Receiver<AccelerationSample>;
}
