//! Location source trait definitions
//!
//! Defines the abstract positioning interface that both the simulated source
//! and platform-specific implementations conform to. Raw positions carry no
//! timestamp; the acquirer stamps and validates them at the boundary.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{LocationError, LocationOptions, PermissionState};

/// Token identifying a continuous position watch on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub Uuid);

impl WatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WatchId {
    fn default() -> Self {
        Self::new()
    }
}

/// An unvalidated position as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// A source of device position fixes.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Resolve the current position once.
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<RawPosition, LocationError>;

    /// Start a continuous watch. Updates arrive on the returned channel
    /// until `clear_watch` releases the id.
    async fn watch_position(
        &self,
        options: &LocationOptions,
    ) -> Result<(WatchId, broadcast::Receiver<RawPosition>), LocationError>;

    /// Release a watch. Unknown ids are a no-op.
    async fn clear_watch(&self, id: WatchId) -> Result<(), LocationError>;

    /// Current permission state without prompting the user.
    async fn check_permissions(&self) -> PermissionState;

    /// Prompt the user for permission and return the resulting state.
    async fn request_permissions(&self) -> PermissionState;
}
