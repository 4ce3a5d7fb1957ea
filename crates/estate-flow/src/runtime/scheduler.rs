use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::workflows::desk::{ListingDesk, Outbox};

/// Run the follow-up tick every `period` until shutdown is signalled. The
/// first tick fires right away.
pub async fn run_follow_up_loop<L, O>(
    desk: Arc<ListingDesk<L, O>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = interval.tick() => {
                let now = desk.now();
                match desk.tick(now) {
                    Ok(drafts) if drafts.is_empty() => debug!(%now, "follow-up tick, nothing due"),
                    Ok(drafts) => info!(%now, drafts = drafts.len(), "follow-up tick"),
                    Err(err) => warn!(error = %err, "follow-up tick failed"),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("follow-up loop stopped");
}
