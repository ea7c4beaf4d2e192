//! Alert dispatcher — location reconciliation, message formatting, and the
//! per-contact notification loop.

use std::sync::Arc;

use crate::location::acquirer::LocationAcquirer;
use crate::location::LocationOptions;
use crate::types::Contact;

use super::transport::NotificationTransport;
use super::{ContactOutcome, DispatchReport, LocationStatus, OutcomeStatus, SkipReason};

/// Dispatch-time configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Options for the fresh-fix acquisition attempted at dispatch time.
    pub location: LocationOptions,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            location: LocationOptions::default(),
        }
    }
}

pub struct AlertDispatcher {
    acquirer: Arc<LocationAcquirer>,
    transport: Arc<dyn NotificationTransport>,
    config: DispatchConfig,
}

impl AlertDispatcher {
    pub fn new(
        acquirer: Arc<LocationAcquirer>,
        transport: Arc<dyn NotificationTransport>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            acquirer,
            transport,
            config,
        }
    }

    /// Notify every trusted contact of a detected impact.
    ///
    /// Best-effort throughout: a missing location degrades the message, one
    /// contact's bad number or transport failure never blocks the others,
    /// and the report records each outcome. With no contacts configured
    /// nothing is attempted — not even the location fetch.
    pub async fn dispatch(&self, contacts: &[Contact]) -> DispatchReport {
        if contacts.is_empty() {
            log::warn!("No trusted contacts configured; alert not sent");
            return DispatchReport::NoContacts;
        }

        let location = self.resolve_location().await;
        let message = emergency_message(&location);
        let outcomes = self.notify_each(contacts, &message).await;

        DispatchReport::Dispatched { location, outcomes }
    }

    /// Notify only the first trusted contact — the manual "immediate help"
    /// action, which does not wait for an impact.
    pub async fn dispatch_first(&self, contacts: &[Contact]) -> DispatchReport {
        if contacts.is_empty() {
            log::warn!("No trusted contacts configured; immediate alert not sent");
            return DispatchReport::NoContacts;
        }

        let location = self.resolve_location().await;
        let message = immediate_message(&location);
        let outcomes = self.notify_each(&contacts[..1], &message).await;

        DispatchReport::Dispatched { location, outcomes }
    }

    /// Try for a fresh fix; fall back to the cache; proceed degraded when
    /// neither is available.
    async fn resolve_location(&self) -> LocationStatus {
        match self.acquirer.get_once(&self.config.location).await {
            Ok(fix) => LocationStatus::Fresh(fix),
            Err(e) => {
                log::warn!("Fresh fix failed ({}); falling back to cache", e);
                match self.acquirer.cache().latest() {
                    Some(fix) => LocationStatus::Cached(fix),
                    None => LocationStatus::Unavailable,
                }
            }
        }
    }

    async fn notify_each(&self, contacts: &[Contact], message: &str) -> Vec<ContactOutcome> {
        let mut outcomes = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let number = contact.normalized_phone();
            let status = if number.is_empty() {
                log::warn!(
                    "Contact {} has no valid phone number; skipping",
                    contact.display_name
                );
                OutcomeStatus::Skipped(SkipReason::InvalidNumber)
            } else {
                match self.transport.open(&number, message).await {
                    Ok(()) => OutcomeStatus::Sent,
                    Err(e) => {
                        log::warn!("Transport failed for {}: {}", contact.display_name, e);
                        OutcomeStatus::TransportFailed(e.to_string())
                    }
                }
            };
            outcomes.push(ContactOutcome {
                contact: contact.clone(),
                status,
            });
        }
        outcomes
    }
}

fn emergency_message(location: &LocationStatus) -> String {
    match location.fix() {
        Some(fix) => format!(
            "EMERGENCY! I need help!\nImpact detected at my location.\nMy current location: {}",
            fix.maps_link()
        ),
        None => "EMERGENCY! I need help!\nImpact detected at my location.\nMy current location is unavailable.".to_string(),
    }
}

fn immediate_message(location: &LocationStatus) -> String {
    match location.fix() {
        Some(fix) => format!(
            "IMMEDIATE HELP NEEDED! I am sending this message from TrekGuard.\nMy current location: {}",
            fix.maps_link()
        ),
        None => "IMMEDIATE HELP NEEDED! I am sending this message from TrekGuard.\nMy current location is unavailable.".to_string(),
    }
}
