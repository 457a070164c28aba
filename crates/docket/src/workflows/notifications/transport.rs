use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use super::domain::Channel;

/// Outbound delivery hook (message gateway, alerting provider, in-app inbox).
/// Calls may block; the dispatcher isolates their failures per notification.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        channel: Channel,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;
}

/// Delivery error reported by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}

/// One message handed to an [`OutboxTransport`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Delivery {
    pub channel: Channel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Transport that keeps delivered messages in memory and logs them. It can be
/// switched offline to exercise retry paths.
#[derive(Debug, Default)]
pub struct OutboxTransport {
    sent: Mutex<Vec<Delivery>>,
    offline: AtomicBool,
}

impl OutboxTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Delivery> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Transport for OutboxTransport {
    fn send(
        &self,
        channel: Channel,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("outbox offline".to_string()));
        }

        let mut guard = self
            .sent
            .lock()
            .map_err(|_| TransportError::Unavailable("outbox mutex poisoned".to_string()))?;
        guard.push(Delivery {
            channel,
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        debug!(channel = channel.label(), recipient, subject, "message placed in outbox");
        Ok(())
    }
}
