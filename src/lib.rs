// TrekGuard - Impact Detection & Emergency Alert core

pub mod alert;
pub mod location;
pub mod motion;
pub mod session;
pub mod store;
pub mod types;

pub use alert::{AlertDispatcher, DispatchConfig, DispatchReport};
pub use location::acquirer::{LocationAcquirer, WatchHandle};
pub use location::cache::GeofixCache;
pub use motion::impact::{ImpactDetector, DEFAULT_IMPACT_THRESHOLD};
pub use motion::sampler::MotionSampler;
pub use session::{MonitoringSession, SessionEvent, SessionState};
pub use types::{AccelerationSample, Contact, GeoFix, ImpactEvent};
