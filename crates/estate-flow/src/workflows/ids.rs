use std::sync::atomic::{AtomicU64, Ordering};

use super::documents::{AttachmentId, ExceptionId, MessageId, PacketId, ThreadId};
use super::listing::ListingId;

/// Per-desk identifier source. Each entity kind has its own counter so IDs
/// read as `pkt-000001`, `thr-000001` and so on. A desk reopened over
/// persisted state feeds every known ID through [`IdSequence::observe`] so
/// numbering continues after the highest one.
#[derive(Debug, Default)]
pub struct IdSequence {
    listings: AtomicU64,
    packets: AtomicU64,
    threads: AtomicU64,
    messages: AtomicU64,
    attachments: AtomicU64,
    exceptions: AtomicU64,
}

fn next(counter: &AtomicU64, prefix: &str) -> String {
    let id = counter.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{prefix}-{id:06}")
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the matching counter to at least the number in `id`. Strings
    /// that are not of the form `<prefix>-<digits>` are ignored.
    pub fn observe(&self, id: &str) {
        let Some((prefix, digits)) = id.split_once('-') else {
            return;
        };
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return;
        }
        let Ok(seen) = digits.parse::<u64>() else {
            return;
        };
        let counter = match prefix {
            "lst" => &self.listings,
            "pkt" => &self.packets,
            "thr" => &self.threads,
            "msg" => &self.messages,
            "att" => &self.attachments,
            "exc" => &self.exceptions,
            _ => return,
        };
        counter.fetch_max(seen, Ordering::Relaxed);
    }

    pub fn listing(&self) -> ListingId {
        ListingId(next(&self.listings, "lst"))
    }

    pub fn packet(&self) -> PacketId {
        PacketId(next(&self.packets, "pkt"))
    }

    pub fn thread(&self) -> ThreadId {
        ThreadId(next(&self.threads, "thr"))
    }

    pub fn message(&self) -> MessageId {
        MessageId(next(&self.messages, "msg"))
    }

    pub fn attachment(&self) -> AttachmentId {
        AttachmentId(next(&self.attachments, "att"))
    }

    pub fn exception(&self) -> ExceptionId {
        ExceptionId(next(&self.exceptions, "exc"))
    }
}
