use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::workflows::desk::{
    DeskError, ListingDesk, MailboxConnector, Outbox, ReplyOutcome, TransportError,
};
use crate::workflows::documents::{InboundMessage, ThreadId};
use crate::workflows::listing::Actor;

const WORKER_ACTOR: &str = "reply worker";

#[derive(Debug, Error)]
#[error("reply worker {0} is no longer running")]
pub struct WorkerGone(pub usize);

impl From<WorkerGone> for DeskError {
    fn from(err: WorkerGone) -> Self {
        DeskError::Unavailable(err.to_string())
    }
}

type Responder = oneshot::Sender<Result<ReplyOutcome, DeskError>>;

/// An inbound reply queued for a worker. Submitted replies carry a channel
/// for the outcome; polled ones do not.
#[derive(Debug)]
pub struct ReplyJob {
    pub message: InboundMessage,
    respond: Option<Responder>,
}

/// Fans inbound replies out to a fixed set of workers. Every reply of a
/// thread lands on the same worker, so a thread is processed in order.
#[derive(Debug, Clone)]
pub struct ReplyRouter {
    workers: Vec<UnboundedSender<ReplyJob>>,
}

impl ReplyRouter {
    pub fn new(workers: usize) -> (Self, Vec<UnboundedReceiver<ReplyJob>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..workers.max(1))
            .map(|_| mpsc::unbounded_channel())
            .unzip();
        (Self { workers: senders }, receivers)
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn worker_for(&self, thread: &ThreadId) -> usize {
        let mut hasher = DefaultHasher::new();
        thread.hash(&mut hasher);
        (hasher.finish() % self.workers.len() as u64) as usize
    }

    /// Queue a reply without waiting for it.
    pub fn route(&self, message: InboundMessage) -> Result<usize, WorkerGone> {
        self.dispatch(ReplyJob {
            message,
            respond: None,
        })
    }

    /// Queue a reply on its thread's worker and wait until the worker has
    /// appended it and ingested its attachments.
    pub async fn submit(&self, message: InboundMessage) -> Result<ReplyOutcome, DeskError> {
        let (respond, outcome) = oneshot::channel();
        let index = self.dispatch(ReplyJob {
            message,
            respond: Some(respond),
        })?;
        outcome.await.map_err(|_| WorkerGone(index))?
    }

    fn dispatch(&self, job: ReplyJob) -> Result<usize, WorkerGone> {
        let index = self.worker_for(&job.message.thread_id);
        self.workers[index]
            .send(job)
            .map_err(|_| WorkerGone(index))?;
        Ok(index)
    }
}

/// Process replies of one partition: append each to its thread, then ingest
/// the attachments it carried.
pub async fn run_reply_worker<L, O>(
    index: usize,
    mut inbox: UnboundedReceiver<ReplyJob>,
    desk: Arc<ListingDesk<L, O>>,
) where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let actor = Actor::agent(WORKER_ACTOR);
    while let Some(ReplyJob { message, respond }) = inbox.recv().await {
        let outcome = process_reply(index, message, &desk, &actor);
        if let Some(respond) = respond {
            // The submitter may have gone away; the reply is processed either way.
            let _ = respond.send(outcome);
        }
    }
    debug!(worker = index, "reply worker stopped");
}

fn process_reply<L, O>(
    index: usize,
    message: InboundMessage,
    desk: &ListingDesk<L, O>,
    actor: &Actor,
) -> Result<ReplyOutcome, DeskError>
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let thread = message.thread_id.clone();
    let has_attachments = !message.attachments.is_empty();

    let outcome = match desk.receive_reply(message) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(worker = index, %thread, error = %err, "reply could not be routed");
            return Err(err);
        }
    };
    let message_id = match &outcome {
        ReplyOutcome::Appended { message_id, .. } => message_id,
        ReplyOutcome::Ignored { reason } => {
            debug!(worker = index, %thread, %reason, "reply ignored");
            return Ok(outcome);
        }
    };

    if has_attachments {
        match desk.ingest_attachments(message_id, actor) {
            Ok(items) => {
                info!(worker = index, %thread, message = %message_id, received = items.len(), "attachments ingested")
            }
            Err(err) => {
                warn!(worker = index, %thread, message = %message_id, error = %err, "attachment ingestion failed")
            }
        }
    }
    Ok(outcome)
}

/// Poll the connector once and route whatever it returned.
pub async fn pump_mailbox<C>(connector: &Arc<C>, router: &ReplyRouter) -> Result<usize, TransportError>
where
    C: MailboxConnector + 'static,
{
    let polling = Arc::clone(connector);
    let messages = tokio::task::spawn_blocking(move || polling.poll())
        .await
        .map_err(|err| TransportError::Unavailable(format!("mailbox poll failed: {err}")))??;

    let mut routed = 0;
    for message in messages {
        match router.route(message) {
            Ok(_) => routed += 1,
            Err(err) => warn!(error = %err, "dropping inbound reply"),
        }
    }
    Ok(routed)
}

/// Poll the connector every `period` until shutdown is signalled.
pub async fn run_mailbox_poller<C>(
    connector: Arc<C>,
    router: ReplyRouter,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    C: MailboxConnector + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                match pump_mailbox(&connector, &router).await {
                    Ok(0) => {}
                    Ok(routed) => debug!(routed, "mailbox poll routed replies"),
                    Err(err) => warn!(error = %err, "mailbox poll failed"),
                }
            }
        }
    }
    debug!("mailbox poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::runtime::fixtures::{channel_desk, seller_packet};
    use crate::workflows::documents::InboundAttachment;
    use crate::workflows::listing::ChecklistStatus;

    fn reply(thread: &ThreadId, attachments: Vec<InboundAttachment>) -> InboundMessage {
        InboundMessage {
            thread_id: thread.clone(),
            from: "krueger@example.org".to_string(),
            subject: "Re: Unterlagenanforderung".to_string(),
            body: "Anbei der Grundbuchauszug.".to_string(),
            attachments,
            received_at: None,
        }
    }

    #[derive(Default)]
    struct QueuedConnector {
        pending: Mutex<Vec<InboundMessage>>,
    }

    impl MailboxConnector for QueuedConnector {
        fn poll(&self) -> Result<Vec<InboundMessage>, TransportError> {
            Ok(std::mem::take(
                &mut *self.pending.lock().expect("queue poisoned"),
            ))
        }
    }

    #[test]
    fn a_thread_always_maps_to_the_same_worker() {
        let (router, _receivers) = ReplyRouter::new(4);
        let thread = ThreadId("thr-000042".to_string());

        let first = router.worker_for(&thread);
        assert!(first < 4);
        for _ in 0..10 {
            assert_eq!(router.worker_for(&thread), first);
        }
    }

    #[test]
    fn routing_to_a_stopped_worker_fails() {
        let (router, receivers) = ReplyRouter::new(1);
        drop(receivers);

        let err = router
            .route(reply(&ThreadId("thr-000001".to_string()), Vec::new()))
            .expect_err("worker gone");
        assert_eq!(err.0, 0);
    }

    #[tokio::test]
    async fn submitted_replies_return_once_ingested() {
        let (desk, _receivers) = channel_desk();
        let (listing, thread) = seller_packet(&desk);
        let desk = Arc::new(desk);

        let (router, mut inboxes) = ReplyRouter::new(2);
        let workers: Vec<_> = inboxes
            .drain(..)
            .enumerate()
            .map(|(index, inbox)| tokio::spawn(run_reply_worker(index, inbox, desk.clone())))
            .collect();

        let outcome = router
            .submit(reply(
                &thread,
                vec![InboundAttachment {
                    filename: "Grundbuchauszug_Krueger.pdf".to_string(),
                    content_type: Some("application/pdf".to_string()),
                    size: 220_000,
                }],
            ))
            .await
            .expect("submitted");
        assert!(matches!(outcome, ReplyOutcome::Appended { .. }));

        let item = desk
            .checklist(&listing)
            .expect("checklist")
            .into_iter()
            .find(|item| item.name == "Grundbuchauszug")
            .expect("item");
        assert_eq!(item.status, ChecklistStatus::Received);

        let err = router
            .submit(reply(&ThreadId("thr-999999".to_string()), Vec::new()))
            .await
            .expect_err("unknown thread");
        assert_eq!(err.kind(), crate::workflows::desk::DeskErrorKind::NotFound);

        drop(router);
        for worker in workers {
            worker.await.expect("worker finished");
        }
    }

    #[tokio::test]
    async fn submitting_without_workers_is_unavailable() {
        let (router, receivers) = ReplyRouter::new(1);
        drop(receivers);

        let err = router
            .submit(reply(&ThreadId("thr-000001".to_string()), Vec::new()))
            .await
            .expect_err("no worker");
        assert_eq!(err.kind(), crate::workflows::desk::DeskErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn worker_ingests_attachments_and_stops_with_the_router() {
        let (desk, _receivers) = channel_desk();
        let (listing, thread) = seller_packet(&desk);
        let desk = Arc::new(desk);

        let (router, mut inboxes) = ReplyRouter::new(1);
        let worker = tokio::spawn(run_reply_worker(0, inboxes.remove(0), desk.clone()));

        let connector = Arc::new(QueuedConnector::default());
        connector
            .pending
            .lock()
            .expect("queue")
            .push(reply(
                &thread,
                vec![InboundAttachment {
                    filename: "Grundbuchauszug_Krueger.pdf".to_string(),
                    content_type: Some("application/pdf".to_string()),
                    size: 220_000,
                }],
            ));

        assert_eq!(pump_mailbox(&connector, &router).await.expect("poll"), 1);
        assert_eq!(pump_mailbox(&connector, &router).await.expect("poll"), 0);
        drop(router);
        worker.await.expect("worker finished");

        let item = desk
            .checklist(&listing)
            .expect("checklist")
            .into_iter()
            .find(|item| item.name == "Grundbuchauszug")
            .expect("item");
        assert_eq!(item.status, ChecklistStatus::Received);
    }
}
