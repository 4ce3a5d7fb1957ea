use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use crate::audit::AuditLog;
use crate::workflows::desk::{
    DeliveryOutcome, ListingDesk, MailTransport, Outbox, PortalGateway, PublishCommand,
    PublishResult, TransportError,
};
use crate::workflows::documents::OutboundMail;

fn join_failure(err: tokio::task::JoinError) -> TransportError {
    TransportError::Rejected(format!("transport task failed: {err}"))
}

/// Drain the mail queue until every sender is gone.
pub async fn run_mail_dispatcher<L, O, T>(
    mut queue: UnboundedReceiver<OutboundMail>,
    transport: Arc<T>,
    policy: RetryPolicy,
    desk: Arc<ListingDesk<L, O>>,
) where
    L: AuditLog + 'static,
    O: Outbox + 'static,
    T: MailTransport + 'static,
{
    while let Some(mail) = queue.recv().await {
        deliver_mail(&mail, &transport, policy, &desk).await;
    }
    debug!("mail dispatcher stopped");
}

/// Send one mail and report the outcome to the desk.
pub async fn deliver_mail<L, O, T>(
    mail: &OutboundMail,
    transport: &Arc<T>,
    policy: RetryPolicy,
    desk: &ListingDesk<L, O>,
) -> DeliveryOutcome
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
    T: MailTransport + 'static,
{
    let result = policy
        .run("mail", || {
            let transport = Arc::clone(transport);
            let mail = mail.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    transport.send(&mail.to, &mail.subject, &mail.body)
                })
                .await
                .unwrap_or_else(|err| Err(join_failure(err)))
            }
        })
        .await;

    let outcome = match result {
        Ok(external_id) => {
            info!(message = %mail.message_id, %external_id, "mail delivered");
            DeliveryOutcome::Delivered { external_id }
        }
        Err(err) => DeliveryOutcome::Failed {
            reason: err.to_string(),
        },
    };

    if let Err(err) = desk.record_delivery(&mail.message_id, outcome.clone()) {
        warn!(message = %mail.message_id, error = %err, "could not record delivery outcome");
    }
    outcome
}

/// Drain the publish queue until every sender is gone.
pub async fn run_publish_dispatcher<L, O, G>(
    mut queue: UnboundedReceiver<PublishCommand>,
    gateway: Arc<G>,
    policy: RetryPolicy,
    desk: Arc<ListingDesk<L, O>>,
) where
    L: AuditLog + 'static,
    O: Outbox + 'static,
    G: PortalGateway + 'static,
{
    while let Some(command) = queue.recv().await {
        publish_listing(&command, &gateway, policy, &desk).await;
    }
    debug!("publish dispatcher stopped");
}

pub async fn publish_listing<L, O, G>(
    command: &PublishCommand,
    gateway: &Arc<G>,
    policy: RetryPolicy,
    desk: &ListingDesk<L, O>,
) -> PublishResult
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
    G: PortalGateway + 'static,
{
    let result = policy
        .run("publish", || {
            let gateway = Arc::clone(gateway);
            let command = command.clone();
            async move {
                tokio::task::spawn_blocking(move || gateway.publish(&command))
                    .await
                    .unwrap_or_else(|err| Err(join_failure(err)))
            }
        })
        .await;

    let report = match result {
        Ok(external_ref) => PublishResult {
            ok: true,
            external_ref,
            error: None,
        },
        Err(err) => PublishResult {
            ok: false,
            external_ref: None,
            error: Some(err.to_string()),
        },
    };

    if let Err(err) = desk.on_publish_result(&command.listing_id, command.platform, report.clone())
    {
        warn!(listing = %command.listing_id, platform = %command.platform, error = %err, "could not record publish result");
    }
    report
}
