use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::publish::{Platform, Publication};
use super::view::{ListingView, PacketView, ThreadView};
use crate::workflows::documents::{
    PacketStatus, RequestPacket, RequestTracker, Thread, ThreadStatus, ThreadStore,
};
use crate::workflows::listing::{ChecklistStore, GateCheck, GateOverride, Listing};

/// Everything owned by one listing. Guarded by a single per-listing lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    pub listing: Listing,
    pub checklist: ChecklistStore,
    pub overrides: Vec<GateOverride>,
    pub requests: RequestTracker,
    pub threads: ThreadStore,
    pub publications: BTreeMap<Platform, Publication>,
}

impl ListingRecord {
    pub fn new(listing: Listing, checklist: ChecklistStore) -> Self {
        Self {
            listing,
            checklist,
            overrides: Vec::new(),
            requests: RequestTracker::new(),
            threads: ThreadStore::new(),
            publications: BTreeMap::new(),
        }
    }

    pub fn packet_status(&self, packet: &RequestPacket) -> PacketStatus {
        let thread = packet
            .thread_id
            .as_ref()
            .and_then(|id| self.threads.get(id).ok());
        packet.status(thread, &self.checklist)
    }

    pub fn thread_status(&self, thread: &Thread) -> ThreadStatus {
        let packet_complete = thread
            .packet_id
            .as_ref()
            .and_then(|id| self.requests.get(id).ok())
            .is_some_and(|packet| self.packet_status(packet) == PacketStatus::Complete);
        self.threads
            .status(&thread.id, packet_complete)
            .expect("thread taken from this record's store")
    }

    pub fn view(&self, gate_check: GateCheck) -> ListingView {
        ListingView {
            listing: self.listing.clone(),
            gate_check,
            checklist: self.checklist.snapshot(),
            packets: self
                .requests
                .packets()
                .map(|packet| PacketView {
                    status: self.packet_status(packet),
                    packet: packet.clone(),
                })
                .collect(),
            threads: self
                .threads
                .threads()
                .map(|thread| ThreadView {
                    status: self.thread_status(thread),
                    thread: thread.clone(),
                })
                .collect(),
            exceptions: self.threads.exceptions().to_vec(),
            overrides: self.overrides.clone(),
            publications: self.publications.values().cloned().collect(),
        }
    }
}
