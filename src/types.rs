//! Core data types for the impact detection and emergency alert pipeline.
//!
//! Everything that crosses a module boundary gets a named type here: raw
//! acceleration samples, the impact events derived from them, resolved
//! positions, and trusted contacts. Types that reach the durable store
//! (GeoFix, Contact) carry serde derives; transient types (samples, events)
//! do not — they are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single three-axis acceleration sample from the motion source.
///
/// Samples arrive at sensor-driven intervals; no fixed rate is guaranteed.
/// Immutable once created, consumed synchronously by the impact detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// When the motion source delivered this sample.
    pub captured_at: DateTime<Utc>,
}

impl AccelerationSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            captured_at: Utc::now(),
        }
    }

    /// Magnitude of the acceleration change between this sample and a
    /// previous one: `sqrt((x−x')² + (y−y')² + (z−z')²)`.
    pub fn delta_magnitude(&self, previous: &AccelerationSample) -> f64 {
        let dx = self.x - previous.x;
        let dy = self.y - previous.y;
        let dz = self.z - previous.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A detected impact: the delta magnitude that breached the threshold and
/// the sample that produced it. Created exactly once per detection, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEvent {
    /// The acceleration-change magnitude that exceeded the threshold.
    pub magnitude: f64,

    pub detected_at: DateTime<Utc>,

    /// The sample whose delta against the previous sample breached.
    pub triggering_sample: AccelerationSample,
}

/// A single resolved device position with its acquisition time.
///
/// Invariant: latitude ∈ [-90, 90], longitude ∈ [-180, 180]. The location
/// acquirer enforces this at the source boundary; a GeoFix that exists is
/// in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub acquired_at: DateTime<Utc>,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            acquired_at: Utc::now(),
        }
    }

    /// Whether the coordinates are within valid WGS84 bounds.
    pub fn in_range(latitude: f64, longitude: f64) -> bool {
        (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
    }

    /// A shareable map link for this position.
    pub fn maps_link(&self) -> String {
        format!(
            "http://maps.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// A trusted contact: someone who receives the emergency alert.
///
/// The contact list is owned by the contact store; the session holds only a
/// read-only snapshot taken at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub display_name: String,
    pub phone_number: String,
}

impl Contact {
    pub fn new(display_name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            phone_number: phone_number.into(),
        }
    }

    /// The phone number with every non-digit character stripped. An empty
    /// result means the contact has no usable number.
    pub fn normalized_phone(&self) -> String {
        self.phone_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_magnitude() {
        let a = AccelerationSample::new(0.0, 0.0, 0.0);
        let b = AccelerationSample::new(15.0, 15.0, 15.0);
        let delta = b.delta_magnitude(&a);
        assert!((delta - 675.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_delta_magnitude_is_symmetric() {
        let a = AccelerationSample::new(1.0, -2.0, 3.0);
        let b = AccelerationSample::new(-4.0, 5.0, -6.0);
        assert_eq!(a.delta_magnitude(&b), b.delta_magnitude(&a));
    }

    #[test]
    fn test_geofix_range_check() {
        assert!(GeoFix::in_range(53.3498, -6.2603));
        assert!(GeoFix::in_range(-90.0, 180.0));
        assert!(!GeoFix::in_range(90.0001, 0.0));
        assert!(!GeoFix::in_range(0.0, -180.5));
    }

    #[test]
    fn test_maps_link_format() {
        let fix = GeoFix::new(53.3498, -6.2603);
        assert_eq!(
            fix.maps_link(),
            "http://maps.google.com/maps?q=53.3498,-6.2603"
        );
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(Contact::new("A", "123-456").normalized_phone(), "123456");
        assert_eq!(Contact::new("B", "abc").normalized_phone(), "");
        assert_eq!(
            Contact::new("C", "+353 (86) 123-4567").normalized_phone(),
            "353861234567"
        );
    }

    #[test]
    fn test_contact_serde_round_trip() {
        let contact = Contact::new("Aoife", "086-123-4567");
        let json = serde_json::to_string(&contact).unwrap();
        let back: Contact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contact);
    }
}
