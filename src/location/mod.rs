//! Location acquisition: one-shot fixes, cancelable watches, and the
//! last-known-position cache.
//!
//! The acquirer fronts a platform `LocationSource`, gates every acquisition
//! on permission state, validates coordinates, and mirrors each successful
//! fix into the in-memory cache and the durable store.

pub mod acquirer;
pub mod cache;
pub mod simulated;
pub mod source;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location unavailable")]
    Unavailable,
}

/// Options for a position acquisition, one-shot or watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    /// Prefer GPS over network positioning.
    pub high_accuracy: bool,

    /// How long a single acquisition may take before it fails with
    /// `LocationError::Timeout`.
    pub timeout: Duration,

    /// Maximum acceptable age of a cached platform fix.
    pub max_age: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_age: Duration::ZERO,
        }
    }
}

/// Platform permission state for location access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not yet decided; the user has to be prompted.
    Prompt,
}
