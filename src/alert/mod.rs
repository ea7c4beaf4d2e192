//! Alert composition and dispatch.
//!
//! On trigger, the dispatcher reconciles the latest location, formats an
//! emergency message per contact, and invokes the notification transport
//! once per trusted contact with a valid number. Dispatch is best-effort and
//! non-transactional: the report records each contact's outcome and partial
//! completion is an expected result, not a failure.

pub mod dispatcher;
pub mod transport;

pub use dispatcher::{AlertDispatcher, DispatchConfig};
pub use transport::NotificationTransport;

use thiserror::Error;

use crate::types::{Contact, GeoFix};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Notification transport failed: {0}")]
    Failed(String),
}

/// Where the coordinates in the alert message came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationStatus {
    /// A fix acquired during this dispatch.
    Fresh(GeoFix),
    /// The fresh acquisition failed; this is the last cached fix.
    Cached(GeoFix),
    /// No fix was available at all; the message went out degraded.
    Unavailable,
}

impl LocationStatus {
    pub fn fix(&self) -> Option<GeoFix> {
        match self {
            LocationStatus::Fresh(fix) | LocationStatus::Cached(fix) => Some(*fix),
            LocationStatus::Unavailable => None,
        }
    }
}

/// Why a contact was skipped without a transport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The phone number normalized to an empty string.
    InvalidNumber,
}

/// The result of one contact's notification attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    Sent,
    Skipped(SkipReason),
    TransportFailed(String),
}

/// Per-contact record in the dispatch report.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactOutcome {
    pub contact: Contact,
    pub status: OutcomeStatus,
}

/// The outcome of one alert attempt, for the presentation layer to render.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchReport {
    /// No trusted contacts were configured; nothing was attempted.
    NoContacts,

    Dispatched {
        location: LocationStatus,
        outcomes: Vec<ContactOutcome>,
    },
}

impl DispatchReport {
    /// Number of contacts actually notified.
    pub fn sent_count(&self) -> usize {
        match self {
            DispatchReport::NoContacts => 0,
            DispatchReport::Dispatched { outcomes, .. } => outcomes
                .iter()
                .filter(|o| o.status == OutcomeStatus::Sent)
                .count(),
        }
    }
}
