use std::sync::Mutex;

use super::publish::PublishCommand;
use crate::workflows::documents::{InboundMessage, OutboundMail};

/// Fire-and-forget queue for external side effects. Enqueueing never blocks
/// the desk; delivery outcomes are reported back separately.
pub trait Outbox: Send + Sync {
    fn enqueue_mail(&self, mail: OutboundMail);
    fn enqueue_publish(&self, command: PublishCommand);
}

/// Outbox that only records what it was given.
#[derive(Debug, Default)]
pub struct RecordingOutbox {
    mails: Mutex<Vec<OutboundMail>>,
    publishes: Mutex<Vec<PublishCommand>>,
}

impl RecordingOutbox {
    pub fn mails(&self) -> Vec<OutboundMail> {
        self.mails.lock().expect("outbox mutex poisoned").clone()
    }

    pub fn publishes(&self) -> Vec<PublishCommand> {
        self.publishes.lock().expect("outbox mutex poisoned").clone()
    }
}

impl Outbox for RecordingOutbox {
    fn enqueue_mail(&self, mail: OutboundMail) {
        self.mails.lock().expect("outbox mutex poisoned").push(mail);
    }

    fn enqueue_publish(&self, command: PublishCommand) {
        self.publishes
            .lock()
            .expect("outbox mutex poisoned")
            .push(command);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Temporary failure; the dispatcher retries.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("rejected by remote: {0}")]
    Rejected(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

/// Outbound mail transport. Returns the provider's message ID.
pub trait MailTransport: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, TransportError>;
}

/// Portal or social channel connector. Returns the remote listing reference
/// when the platform provides one.
pub trait PortalGateway: Send + Sync {
    fn publish(&self, command: &PublishCommand) -> Result<Option<String>, TransportError>;
}

/// Source of normalized inbound replies.
pub trait MailboxConnector: Send + Sync {
    fn poll(&self) -> Result<Vec<InboundMessage>, TransportError>;
}
