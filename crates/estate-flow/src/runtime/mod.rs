//! Tokio plumbing around the listing desk: outbound dispatchers with retry,
//! per-thread reply workers and the periodic follow-up loop.

pub mod dispatch;
pub mod outbox;
pub mod replies;
pub mod retry;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod fixtures;

pub use dispatch::{deliver_mail, publish_listing, run_mail_dispatcher, run_publish_dispatcher};
pub use outbox::{ChannelOutbox, OutboxReceivers};
pub use replies::{
    pump_mailbox, run_mailbox_poller, run_reply_worker, ReplyJob, ReplyRouter, WorkerGone,
};
pub use retry::RetryPolicy;
pub use scheduler::run_follow_up_loop;
