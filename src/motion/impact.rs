//! Threshold-based impact detection over consecutive acceleration samples.
//!
//! The detector keeps a one-sample lookback window and fires when the
//! magnitude of the acceleration change between consecutive samples exceeds
//! the configured threshold. After firing, the lookback resets to the
//! current sample, so a single pass through the threshold yields exactly one
//! event rather than a cascade. A sustained shake can still refire on a
//! later delta; in practice the session stops sampling on the first trigger.

use chrono::Utc;

use crate::types::{AccelerationSample, ImpactEvent};

/// Default acceleration-change magnitude above which an impact is inferred.
pub const DEFAULT_IMPACT_THRESHOLD: f64 = 20.0;

/// Stateful detector: one sample of lookback, pure computation otherwise.
#[derive(Debug, Clone)]
pub struct ImpactDetector {
    threshold: f64,
    last_sample: Option<AccelerationSample>,
}

impl ImpactDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_sample: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Feed one sample. Returns an event when the delta against the previous
    /// sample breaches the threshold; the first sample after construction or
    /// `reset()` is the warm-up case and never fires.
    pub fn process(&mut self, sample: AccelerationSample) -> Option<ImpactEvent> {
        let event = match self.last_sample {
            None => None,
            Some(previous) => {
                let magnitude = sample.delta_magnitude(&previous);
                if magnitude > self.threshold {
                    Some(ImpactEvent {
                        magnitude,
                        detected_at: Utc::now(),
                        triggering_sample: sample,
                    })
                } else {
                    None
                }
            }
        };
        self.last_sample = Some(sample);
        event
    }

    /// Clear the lookback window. The next sample becomes warm-up again.
    pub fn reset(&mut self) {
        self.last_sample = None;
    }
}

impl Default for ImpactDetector {
    fn default() -> Self {
        Self::new(DEFAULT_IMPACT_THRESHOLD)
    }
}
