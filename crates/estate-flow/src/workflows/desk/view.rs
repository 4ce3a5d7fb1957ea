use serde::Serialize;

use super::publish::Publication;
use crate::workflows::documents::{
    ExceptionRecord, MessageId, PacketStatus, RequestPacket, Thread, ThreadId, ThreadStatus,
};
use crate::workflows::listing::{ChecklistItem, GateCheck, GateOverride, Listing};

#[derive(Debug, Clone, Serialize)]
pub struct PacketView {
    #[serde(flatten)]
    pub packet: RequestPacket,
    pub status: PacketStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    #[serde(flatten)]
    pub thread: Thread,
    pub status: ThreadStatus,
}

/// Read model of one listing, taken under its lock.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub listing: Listing,
    pub gate_check: GateCheck,
    pub checklist: Vec<ChecklistItem>,
    pub packets: Vec<PacketView>,
    pub threads: Vec<ThreadView>,
    pub exceptions: Vec<ExceptionRecord>,
    pub overrides: Vec<GateOverride>,
    pub publications: Vec<Publication>,
}

impl ListingView {
    pub fn open_exceptions(&self) -> impl Iterator<Item = &ExceptionRecord> {
        self.exceptions.iter().filter(|record| !record.is_resolved())
    }

    pub fn thread(&self, id: &ThreadId) -> Option<&ThreadView> {
        self.threads.iter().find(|view| &view.thread.id == id)
    }

    pub fn drafts(&self) -> Vec<MessageId> {
        self.threads
            .iter()
            .flat_map(|view| view.thread.messages.iter())
            .filter(|message| message.is_draft)
            .map(|message| message.id.clone())
            .collect()
    }
}

/// Outcome of routing an inbound reply.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Internal mail while only external threads are tracked.
    Ignored { reason: String },
    Appended {
        message_id: MessageId,
        thread_status: ThreadStatus,
        exceptions: Vec<ExceptionRecord>,
    },
}

impl ReplyOutcome {
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            ReplyOutcome::Ignored { .. } => None,
            ReplyOutcome::Appended { message_id, .. } => Some(message_id),
        }
    }
}
