//! Monitoring session — the state machine binding sensor sampling to impact
//! detection and alerting.
//!
//! One session per process. The cycle is Idle → Monitoring → Triggered →
//! Idle: `start()` arms the sampler, a threshold breach moves to Triggered
//! and dispatches the alert, and only an explicit `stop()` re-arms — a
//! device that keeps moving after a collision must not re-alert on its own.
//!
//! The session publishes `SessionEvent`s on a broadcast channel; rendering
//! them (toasts, map updates) is entirely the presentation layer's business.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

use crate::alert::{AlertDispatcher, DispatchReport};
use crate::location::acquirer::LocationAcquirer;
use crate::motion::impact::ImpactDetector;
use crate::motion::sampler::MotionSampler;
use crate::motion::SensorError;
use crate::store::contacts::ContactStore;
use crate::store::{keys, KeyValueStore};
use crate::types::{AccelerationSample, Contact, ImpactEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Monitoring,
    Triggered,
}

/// State-transition results for the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started,
    ImpactDetected(ImpactEvent),
    AlertDispatched(DispatchReport),
    Stopped,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("Threshold can only be changed while idle")]
    ConfigLocked,
}

struct SessionInner {
    state: SessionState,
    detector: ImpactDetector,
    /// Read-only contact snapshot taken at session start.
    contacts: Vec<Contact>,
}

/// The single active monitoring context.
pub struct MonitoringSession {
    inner: Arc<Mutex<SessionInner>>,
    sampler: Arc<MotionSampler>,
    dispatcher: Arc<AlertDispatcher>,
    acquirer: Arc<LocationAcquirer>,
    contact_store: Arc<ContactStore>,
    store: Arc<dyn KeyValueStore>,
    events_tx: broadcast::Sender<SessionEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MonitoringSession {
    pub fn new(
        sampler: Arc<MotionSampler>,
        dispatcher: Arc<AlertDispatcher>,
        acquirer: Arc<LocationAcquirer>,
        contact_store: Arc<ContactStore>,
        store: Arc<dyn KeyValueStore>,
    ) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(32);
        let (shutdown_tx, _) = broadcast::channel(1);
        Arc::new(Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Idle,
                detector: ImpactDetector::default(),
                contacts: Vec::new(),
            })),
            sampler,
            dispatcher,
            acquirer,
            contact_store,
            store,
            events_tx,
            shutdown_tx,
        })
    }

    /// Subscribe to session events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn threshold(&self) -> f64 {
        self.inner.lock().await.detector.threshold()
    }

    /// Change the impact threshold. Only valid while Idle; mid-session
    /// changes are rejected rather than applied to a running detector. The
    /// value is persisted so the next run starts with it.
    pub async fn set_threshold(&self, threshold: f64) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Idle {
            return Err(SessionError::ConfigLocked);
        }
        inner.detector = ImpactDetector::new(threshold);
        drop(inner);

        match serde_json::to_value(threshold) {
            Ok(value) => {
                if let Err(e) = self.store.set(keys::IMPACT_THRESHOLD, value).await {
                    log::warn!("Failed to persist threshold: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize threshold: {}", e),
        }
        Ok(())
    }

    /// Restore a persisted threshold from a previous run. No-op unless Idle.
    pub async fn restore_configuration(&self) {
        let value = match self.store.get(keys::IMPACT_THRESHOLD).await {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                log::warn!("Could not read persisted threshold: {}", e);
                return;
            }
        };
        match serde_json::from_value::<f64>(value) {
            Ok(threshold) => {
                let mut inner = self.inner.lock().await;
                if inner.state == SessionState::Idle {
                    inner.detector = ImpactDetector::new(threshold);
                }
            }
            Err(e) => log::warn!("Ignoring malformed persisted threshold: {}", e),
        }
    }

    /// Start monitoring. Only meaningful from Idle — a second start while
    /// active is a no-op, preserving the single-subscription invariant. On
    /// sensor failure the session stays Idle and the error surfaces to the
    /// caller; nothing retries automatically.
    pub async fn start(self: &Arc<Self>) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Idle {
            return Ok(());
        }

        let contacts = match self.contact_store.contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                log::warn!("Could not read contacts at session start: {}", e);
                Vec::new()
            }
        };

        self.sampler.start().await.map_err(SessionError::Sensor)?;

        inner.contacts = contacts;
        inner.detector.reset();
        inner.state = SessionState::Monitoring;
        drop(inner);

        self.spawn_sample_loop();
        let _ = self.events_tx.send(SessionEvent::Started);
        log::info!("Impact monitoring started");
        Ok(())
    }

    /// Stop monitoring. Valid from any state and always succeeds: the
    /// sampler stop and watch cancellation are idempotent, so teardown races
    /// and double-stops are harmless.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let was_active = inner.state != SessionState::Idle;
        inner.state = SessionState::Idle;
        inner.detector.reset();
        inner.contacts.clear();
        drop(inner);

        if let Err(e) = self.sampler.stop().await {
            log::warn!("Sampler stop failed during teardown: {}", e);
        }
        if let Err(e) = self.acquirer.cancel_active_watch().await {
            log::warn!("Watch cancellation failed during teardown: {}", e);
        }
        let _ = self.shutdown_tx.send(());

        if was_active {
            let _ = self.events_tx.send(SessionEvent::Stopped);
            log::info!("Impact monitoring stopped");
        }
    }

    /// Manual "immediate help" action: alert the first trusted contact now,
    /// in any session state, without touching the state machine.
    pub async fn trigger_manual_alert(&self) -> DispatchReport {
        let contacts = self.current_contacts().await;
        let report = self.dispatcher.dispatch_first(&contacts).await;
        let _ = self
            .events_tx
            .send(SessionEvent::AlertDispatched(report.clone()));
        report
    }

    /// Run the full alert pipeline as if an impact had been detected,
    /// without a sensor event and without transitioning the state machine.
    pub async fn simulate_impact(&self) -> DispatchReport {
        log::info!("Simulating impact");
        let contacts = self.current_contacts().await;
        let report = self.dispatcher.dispatch(&contacts).await;
        let _ = self
            .events_tx
            .send(SessionEvent::AlertDispatched(report.clone()));
        report
    }

    /// The session snapshot while active, otherwise a fresh read — manual
    /// actions work without an armed session.
    async fn current_contacts(&self) -> Vec<Contact> {
        let inner = self.inner.lock().await;
        if inner.state != SessionState::Idle {
            return inner.contacts.clone();
        }
        drop(inner);
        match self.contact_store.contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                log::warn!("Could not read contacts: {}", e);
                Vec::new()
            }
        }
    }

    fn spawn_sample_loop(self: &Arc<Self>) {
        let session = Arc::clone(self);
        let mut samples = self.sampler.samples();
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = samples.recv() => match result {
                        Ok(sample) => {
                            if session.handle_sample(sample).await {
                                break;
                            }
                        }
                        // Drop-oldest backpressure: a lagged receiver just
                        // skips to the newest samples.
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    /// Feed one sample through the detector. Returns true when the loop
    /// should end (session no longer monitoring, or an impact was handled).
    async fn handle_sample(self: &Arc<Self>, sample: AccelerationSample) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Monitoring {
            return true;
        }
        let Some(event) = inner.detector.process(sample) else {
            return false;
        };
        inner.state = SessionState::Triggered;
        let contacts = inner.contacts.clone();
        drop(inner);

        log::warn!("Impact detected, magnitude {:.2}", event.magnitude);

        // Stop sampling before dispatching so the event that fired cannot
        // produce further alerts.
        if let Err(e) = self.sampler.stop().await {
            log::warn!("Sampler stop after trigger failed: {}", e);
        }
        let _ = self.events_tx.send(SessionEvent::ImpactDetected(event));

        let report = self.dispatcher.dispatch(&contacts).await;
        let _ = self
            .events_tx
            .send(SessionEvent::AlertDispatched(report));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::transport::RecordingTransport;
    use crate::alert::{DispatchConfig, OutcomeStatus};
    use crate::location::cache::GeofixCache;
    use crate::location::simulated::SimulatedLocationSource;
    use crate::motion::simulated::SimulatedMotionSource;
    use crate::store::MemoryStore;
    use crate::types::Contact;
    use std::time::Duration;

    struct Fixture {
        motion: Arc<SimulatedMotionSource>,
        location: Arc<SimulatedLocationSource>,
        transport: Arc<RecordingTransport>,
        store: Arc<MemoryStore>,
        session: Arc<MonitoringSession>,
    }

    async fn fixture_with_contacts(contacts: &[Contact]) -> Fixture {
        let motion = SimulatedMotionSource::new();
        let location = SimulatedLocationSource::new();
        location.set_position(53.3498, -6.2603);
        let transport = RecordingTransport::new();
        let store = MemoryStore::new();

        let contact_store = Arc::new(ContactStore::new(store.clone()));
        for contact in contacts.iter().rev() {
            contact_store.save(contact.clone()).await.unwrap();
        }

        let acquirer = Arc::new(LocationAcquirer::new(
            location.clone(),
            Arc::new(GeofixCache::new()),
            store.clone(),
        ));
        let dispatcher = Arc::new(AlertDispatcher::new(
            Arc::clone(&acquirer),
            transport.clone(),
            DispatchConfig::default(),
        ));
        let sampler = Arc::new(MotionSampler::new(motion.clone()));
        let session = MonitoringSession::new(
            sampler,
            dispatcher,
            acquirer,
            contact_store,
            store.clone(),
        );

        Fixture {
            motion,
            location,
            transport,
            store,
            session,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_contacts(&[Contact::new("Aoife", "086-123-4567")]).await
    }

    async fn wait_for_state(session: &Arc<MonitoringSession>, state: SessionState) {
        for _ in 0..200 {
            if session.state().await == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session never reached {:?}", state);
    }

    #[tokio::test]
    async fn test_start_moves_to_monitoring() {
        let f = fixture().await;
        f.session.start().await.unwrap();
        assert_eq!(f.session.state().await, SessionState::Monitoring);
        assert_eq!(f.motion.subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_double_start_keeps_single_subscription() {
        let f = fixture().await;
        f.session.start().await.unwrap();
        f.session.start().await.unwrap();
        assert_eq!(f.motion.subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_start_failure_stays_idle() {
        let f = fixture().await;
        f.motion.set_permission_denied(true);

        let result = f.session.start().await;
        assert_eq!(
            result,
            Err(SessionError::Sensor(SensorError::PermissionDenied))
        );
        assert_eq!(f.session.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let f = fixture().await;
        f.session.start().await.unwrap();
        f.session.stop().await;
        f.session.stop().await;

        assert_eq!(f.session.state().await, SessionState::Idle);
        assert_eq!(f.motion.subscription_count(), 0);
        assert_eq!(f.motion.unsubscribe_count(), 1);
    }

    #[tokio::test]
    async fn test_impact_triggers_alert_and_stops_sampling() {
        let f = fixture().await;
        let mut events = f.session.events();
        f.session.start().await.unwrap();

        f.motion.emit(0.0, 0.0, 0.0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        f.motion.emit(15.0, 15.0, 15.0);

        wait_for_state(&f.session, SessionState::Triggered).await;
        assert!(!f.session.sampler.is_running().await);

        // Started, ImpactDetected, AlertDispatched in order.
        assert!(matches!(events.recv().await.unwrap(), SessionEvent::Started));
        let SessionEvent::ImpactDetected(event) = events.recv().await.unwrap() else {
            panic!("expected ImpactDetected");
        };
        assert!((event.magnitude - 675.0_f64.sqrt()).abs() < 1e-9);
        let SessionEvent::AlertDispatched(report) = events.recv().await.unwrap() else {
            panic!("expected AlertDispatched");
        };
        assert_eq!(report.sent_count(), 1);

        let sends = f.transport.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].address, "0861234567");
        assert!(sends[0].text.contains("maps.google.com"));
    }

    #[tokio::test]
    async fn test_below_threshold_stays_monitoring() {
        let f = fixture().await;
        f.session.start().await.unwrap();

        f.motion.emit(0.0, 0.0, 0.0);
        f.motion.emit(3.0, 4.0, 0.0);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(f.session.state().await, SessionState::Monitoring);
        assert_eq!(f.transport.send_count(), 0);
    }

    #[tokio::test]
    async fn test_triggered_requires_explicit_rearm() {
        let f = fixture().await;
        f.session.start().await.unwrap();
        f.motion.emit(0.0, 0.0, 0.0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        f.motion.emit(40.0, 0.0, 0.0);
        wait_for_state(&f.session, SessionState::Triggered).await;

        // start() from Triggered is a no-op.
        f.session.start().await.unwrap();
        assert_eq!(f.session.state().await, SessionState::Triggered);
        assert_eq!(f.motion.subscription_count(), 0);

        // stop() then start() re-arms.
        f.session.stop().await;
        f.session.start().await.unwrap();
        assert_eq!(f.session.state().await, SessionState::Monitoring);
        assert_eq!(f.motion.subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_threshold_locked_while_active() {
        let f = fixture().await;
        f.session.set_threshold(25.0).await.unwrap();
        assert_eq!(f.session.threshold().await, 25.0);

        f.session.start().await.unwrap();
        assert_eq!(
            f.session.set_threshold(30.0).await,
            Err(SessionError::ConfigLocked)
        );

        f.session.stop().await;
        f.session.set_threshold(30.0).await.unwrap();
        assert_eq!(f.session.threshold().await, 30.0);
    }

    #[tokio::test]
    async fn test_threshold_persists_and_restores() {
        let f = fixture().await;
        f.session.set_threshold(42.0).await.unwrap();

        // A fresh session over the same store picks the threshold up.
        let motion = SimulatedMotionSource::new();
        let acquirer = Arc::new(LocationAcquirer::new(
            f.location.clone(),
            Arc::new(GeofixCache::new()),
            f.store.clone(),
        ));
        let dispatcher = Arc::new(AlertDispatcher::new(
            Arc::clone(&acquirer),
            f.transport.clone(),
            DispatchConfig::default(),
        ));
        let session = MonitoringSession::new(
            Arc::new(MotionSampler::new(motion)),
            dispatcher,
            acquirer,
            Arc::new(ContactStore::new(f.store.clone())),
            f.store.clone(),
        );
        session.restore_configuration().await;
        assert_eq!(session.threshold().await, 42.0);
    }

    #[tokio::test]
    async fn test_manual_alert_without_session() {
        let f = fixture_with_contacts(&[
            Contact::new("First", "111-222"),
            Contact::new("Second", "333-444"),
        ])
        .await;

        let report = f.session.trigger_manual_alert().await;
        assert_eq!(report.sent_count(), 1);

        let sends = f.transport.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].address, "111222");
        assert!(sends[0].text.starts_with("IMMEDIATE HELP NEEDED!"));
    }

    #[tokio::test]
    async fn test_simulate_impact_dispatches_without_transition() {
        let f = fixture().await;
        f.session.start().await.unwrap();

        let report = f.session.simulate_impact().await;
        assert_eq!(report.sent_count(), 1);
        // Simulation exercises the pipeline, not the state machine.
        assert_eq!(f.session.state().await, SessionState::Monitoring);
    }

    #[tokio::test]
    async fn test_simulate_impact_with_no_contacts() {
        let f = fixture_with_contacts(&[]).await;
        let report = f.session.simulate_impact().await;
        assert_eq!(report, DispatchReport::NoContacts);
        assert_eq!(f.transport.send_count(), 0);
    }

    #[tokio::test]
    async fn test_contact_snapshot_taken_at_start() {
        let f = fixture().await;
        f.session.start().await.unwrap();

        // A contact added mid-session is not in the snapshot.
        let contact_store = ContactStore::new(f.store.clone());
        contact_store
            .save(Contact::new("Late", "999"))
            .await
            .unwrap();

        f.motion.emit(0.0, 0.0, 0.0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        f.motion.emit(40.0, 0.0, 0.0);
        wait_for_state(&f.session, SessionState::Triggered).await;

        // Wait until dispatch has finished.
        for _ in 0..200 {
            if f.transport.send_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let sends = f.transport.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].address, "0861234567");
    }

    #[tokio::test]
    async fn test_skipped_contact_recorded_in_report() {
        let f = fixture_with_contacts(&[
            Contact::new("Valid", "123-456"),
            Contact::new("Invalid", "abc"),
        ])
        .await;
        let report = f.session.simulate_impact().await;

        let DispatchReport::Dispatched { outcomes, .. } = report else {
            panic!("expected Dispatched");
        };
        assert_eq!(outcomes[0].status, OutcomeStatus::Sent);
        assert_eq!(
            outcomes[1].status,
            OutcomeStatus::Skipped(crate::alert::SkipReason::InvalidNumber)
        );
    }
}
