//! Notification transport trait definitions
//!
//! The transport opens an outbound channel (a prefilled-message deep link)
//! to one destination number. Fire-and-forget: the core never learns whether
//! the message was delivered, only whether the channel could be opened.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::TransportError;

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Open an outbound message channel to `address` (a normalized,
    /// digits-only phone number) prefilled with `text`.
    async fn open(&self, address: &str, text: &str) -> Result<(), TransportError>;
}

/// Transport that renders the WhatsApp deep link and hands it to the log.
/// The presentation layer owns actually launching it; this is what the demo
/// binary uses.
pub struct DeepLinkTransport;

#[async_trait]
impl NotificationTransport for DeepLinkTransport {
    async fn open(&self, address: &str, text: &str) -> Result<(), TransportError> {
        log::info!("Opening https://wa.me/{} with message: {}", address, text);
        Ok(())
    }
}

/// A send captured by the recording transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub address: String,
    pub text: String,
}

/// Transport that records every send, for tests. Individual addresses can be
/// made to fail to exercise per-contact failure handling.
pub struct RecordingTransport {
    sends: Mutex<Vec<RecordedSend>>,
    failing_addresses: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sends: Mutex::new(Vec::new()),
            failing_addresses: Mutex::new(Vec::new()),
        })
    }

    /// Make sends to `address` fail with a transport error.
    pub fn fail_address(&self, address: impl Into<String>) {
        self.failing_addresses.lock().unwrap().push(address.into());
    }

    /// All successful sends, in order.
    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn open(&self, address: &str, text: &str) -> Result<(), TransportError> {
        if self
            .failing_addresses
            .lock()
            .unwrap()
            .iter()
            .any(|a| a == address)
        {
            return Err(TransportError::Failed(format!(
                "simulated failure for {}",
                address
            )));
        }
        self.sends.lock().unwrap().push(RecordedSend {
            address: address.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_transport_captures_sends() {
        let transport = RecordingTransport::new();
        transport.open("123456", "hello").await.unwrap();

        let sends = transport.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].address, "123456");
        assert_eq!(sends[0].text, "hello");
    }

    #[tokio::test]
    async fn test_failing_address() {
        let transport = RecordingTransport::new();
        transport.fail_address("999");

        assert!(transport.open("999", "x").await.is_err());
        assert!(transport.open("111", "x").await.is_ok());
        assert_eq!(transport.send_count(), 1);
    }
}
