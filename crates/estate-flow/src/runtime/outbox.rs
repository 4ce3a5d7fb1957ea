use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use crate::workflows::desk::{Outbox, PublishCommand};
use crate::workflows::documents::OutboundMail;

/// Outbox backed by unbounded tokio channels, drained by the dispatchers.
#[derive(Debug, Clone)]
pub struct ChannelOutbox {
    mail: UnboundedSender<OutboundMail>,
    publish: UnboundedSender<PublishCommand>,
}

/// Receiving halves handed to the dispatcher tasks.
#[derive(Debug)]
pub struct OutboxReceivers {
    pub mail: UnboundedReceiver<OutboundMail>,
    pub publish: UnboundedReceiver<PublishCommand>,
}

impl ChannelOutbox {
    pub fn new() -> (Self, OutboxReceivers) {
        let (mail, mail_rx) = mpsc::unbounded_channel();
        let (publish, publish_rx) = mpsc::unbounded_channel();
        (
            Self { mail, publish },
            OutboxReceivers {
                mail: mail_rx,
                publish: publish_rx,
            },
        )
    }
}

impl Outbox for ChannelOutbox {
    fn enqueue_mail(&self, mail: OutboundMail) {
        if let Err(err) = self.mail.send(mail) {
            warn!(message = %err.0.message_id, "mail dispatcher stopped, outbound mail dropped");
        }
    }

    fn enqueue_publish(&self, command: PublishCommand) {
        if let Err(err) = self.publish.send(command) {
            warn!(listing = %err.0.listing_id, platform = %err.0.platform, "publish dispatcher stopped, command dropped");
        }
    }
}
