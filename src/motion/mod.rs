//! Motion sensing: the sampler lifecycle and threshold-based impact detection.
//!
//! Provides the motion-source abstraction trait, the sampler that owns the
//! subscription lifecycle, the impact detector, and a simulated source for
//! testing without real sensor hardware.

pub mod impact;
pub mod sampler;
pub mod simulated;
pub mod source;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("Motion sensor unavailable")]
    Unavailable,

    #[error("Motion sensor permission denied")]
    PermissionDenied,
}
