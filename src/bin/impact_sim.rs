// src/bin/impact_sim.rs
//! Scripted end-to-end run of the impact detection and alert pipeline over
//! the simulated collaborators: arm a session, replay an acceleration trace
//! containing a collision, and print the resulting dispatch report.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use trekguard::alert::transport::DeepLinkTransport;
use trekguard::alert::{AlertDispatcher, DispatchConfig, DispatchReport};
use trekguard::location::cache::GeofixCache;
use trekguard::location::simulated::SimulatedLocationSource;
use trekguard::motion::sampler::MotionSampler;
use trekguard::motion::simulated::SimulatedMotionSource;
use trekguard::session::{MonitoringSession, SessionEvent};
use trekguard::store::contacts::ContactStore;
use trekguard::store::MemoryStore;
use trekguard::types::Contact;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let motion = SimulatedMotionSource::new();
    let location = SimulatedLocationSource::new();
    location.set_position(53.3498, -6.2603);

    let store = MemoryStore::new();
    let contact_store = Arc::new(ContactStore::new(store.clone()));
    contact_store
        .save(Contact::new("Aoife", "086-123-4567"))
        .await?;
    contact_store
        .save(Contact::new("Brian", "+353 1 555 0199"))
        .await?;

    let acquirer = Arc::new(trekguard::LocationAcquirer::new(
        location.clone(),
        Arc::new(GeofixCache::new()),
        store.clone(),
    ));
    let dispatcher = Arc::new(AlertDispatcher::new(
        Arc::clone(&acquirer),
        Arc::new(DeepLinkTransport),
        DispatchConfig::default(),
    ));
    let sampler = Arc::new(MotionSampler::new(motion.clone()));
    let session = MonitoringSession::new(
        sampler,
        dispatcher,
        acquirer,
        contact_store,
        store,
    );

    let mut events = session.events();
    session.start().await?;
    println!("Monitoring armed, replaying acceleration trace...");

    // A quiet ride, then a collision.
    let trace = [
        (0.1, 0.0, 9.8),
        (0.2, 0.1, 9.7),
        (0.0, 0.2, 9.9),
        (-0.1, 0.0, 9.8),
        (18.0, -12.0, 25.0),
    ];
    for (x, y, z) in trace {
        motion.emit(x, y, z);
        sleep(Duration::from_millis(50)).await;
    }

    loop {
        match events.recv().await? {
            SessionEvent::Started => {}
            SessionEvent::ImpactDetected(event) => {
                println!("Impact detected: magnitude {:.2}", event.magnitude);
            }
            SessionEvent::AlertDispatched(report) => {
                print_report(&report);
                break;
            }
            SessionEvent::Stopped => break,
        }
    }

    session.stop().await;
    Ok(())
}

fn print_report(report: &DispatchReport) {
    match report {
        DispatchReport::NoContacts => println!("No trusted contacts configured."),
        DispatchReport::Dispatched { location, outcomes } => {
            println!("Alert dispatched ({:?}):", location);
            for outcome in outcomes {
                println!("  {} -> {:?}", outcome.contact.display_name, outcome.status);
            }
        }
    }
}
