use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cadence::FollowUpCadence;
use super::domain::{Holder, PacketId, PacketStatus, Thread, ThreadId};
use crate::workflows::listing::{ChecklistStatus, ChecklistStore, ListingId};

/// Outbound request for a set of checklist items addressed to one holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPacket {
    pub id: PacketId,
    pub listing_id: ListingId,
    pub holder: Holder,
    pub items: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub thread_id: Option<ThreadId>,
    /// Cadence resolved at send time (holder override, then workspace default).
    pub cadence: Option<FollowUpCadence>,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub follow_ups_paused: bool,
    pub follow_ups_drafted: u32,
}

impl RequestPacket {
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    /// Derived status; never persisted.
    pub fn status(&self, thread: Option<&Thread>, checklist: &ChecklistStore) -> PacketStatus {
        if !self.is_sent() {
            return PacketStatus::NotStarted;
        }

        let all_verified = !self.items.is_empty()
            && self.items.iter().all(|item| {
                checklist
                    .get(item)
                    .is_some_and(|entry| entry.status == ChecklistStatus::Verified)
            });
        if all_verified {
            return PacketStatus::Complete;
        }

        if thread.is_some_and(Thread::has_incoming_attachments) {
            PacketStatus::Waiting
        } else {
            PacketStatus::Sent
        }
    }

    /// Items not yet back from the holder.
    pub fn outstanding<'a>(&'a self, checklist: &'a ChecklistStore) -> Vec<&'a str> {
        self.items
            .iter()
            .filter(|item| {
                checklist
                    .get(item)
                    .map_or(true, |entry| !entry.status.at_least(ChecklistStatus::Received))
            })
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request packet '{0}' not found")]
    NotFound(PacketId),
    #[error("request packet '{0}' has no items to request")]
    EmptyItemList(PacketId),
    #[error("request packet '{0}' was already sent")]
    AlreadySent(PacketId),
    #[error("request packet '{0}' was not sent yet")]
    NotSent(PacketId),
    #[error("cadence {cadence} needs a deadline on packet '{packet}'")]
    DeadlineRequired {
        packet: PacketId,
        cadence: FollowUpCadence,
    },
    #[error("requested item '{0}' is not on the listing checklist")]
    UnknownItem(String),
}

/// Request packets of one listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestTracker {
    packets: BTreeMap<PacketId, RequestPacket>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a packet in `not_started`. Items are deduplicated and must be
    /// on the checklist; an empty list is accepted until send.
    pub fn create_packet(
        &mut self,
        id: PacketId,
        listing_id: ListingId,
        holder: Holder,
        items: Vec<String>,
        deadline: Option<DateTime<Utc>>,
        checklist: &ChecklistStore,
        now: DateTime<Utc>,
    ) -> Result<&RequestPacket, RequestError> {
        let mut unique: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let item = item.trim().to_string();
            if checklist.get(&item).is_none() {
                return Err(RequestError::UnknownItem(item));
            }
            if !unique.contains(&item) {
                unique.push(item);
            }
        }

        let packet = RequestPacket {
            id: id.clone(),
            listing_id,
            holder,
            items: unique,
            created_at: now,
            deadline,
            sent_at: None,
            thread_id: None,
            cadence: None,
            next_follow_up: None,
            follow_ups_paused: false,
            follow_ups_drafted: 0,
        };

        Ok(self.packets.entry(id).or_insert(packet))
    }

    /// Check that `id` may be sent with `cadence` without mutating anything.
    pub fn ensure_sendable(
        &self,
        id: &PacketId,
        cadence: FollowUpCadence,
    ) -> Result<&RequestPacket, RequestError> {
        let packet = self.get(id)?;
        if packet.is_sent() {
            return Err(RequestError::AlreadySent(id.clone()));
        }
        if packet.items.is_empty() {
            return Err(RequestError::EmptyItemList(id.clone()));
        }
        if cadence.requires_deadline() && packet.deadline.is_none() {
            return Err(RequestError::DeadlineRequired {
                packet: id.clone(),
                cadence,
            });
        }
        Ok(packet)
    }

    pub fn mark_sent(
        &mut self,
        id: &PacketId,
        thread_id: ThreadId,
        cadence: FollowUpCadence,
        now: DateTime<Utc>,
    ) -> Result<&RequestPacket, RequestError> {
        self.ensure_sendable(id, cadence)?;
        let packet = self.get_mut(id)?;
        packet.sent_at = Some(now);
        packet.thread_id = Some(thread_id);
        packet.cadence = Some(cadence);
        packet.next_follow_up = cadence.next_after(now, packet.deadline);
        Ok(packet)
    }

    /// Toggle the pause flag. Returns whether the flag changed.
    pub fn set_paused(&mut self, id: &PacketId, paused: bool) -> Result<bool, RequestError> {
        let packet = self.get_mut(id)?;
        let changed = packet.follow_ups_paused != paused;
        packet.follow_ups_paused = paused;
        Ok(changed)
    }

    /// Record a drafted follow-up and schedule the next one from `now`.
    pub fn record_follow_up(
        &mut self,
        id: &PacketId,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, RequestError> {
        let packet = self.get_mut(id)?;
        let cadence = packet
            .cadence
            .ok_or_else(|| RequestError::NotSent(packet.id.clone()))?;
        packet.follow_ups_drafted += 1;
        packet.next_follow_up = cadence.next_after(now, packet.deadline);
        Ok(packet.next_follow_up)
    }

    /// Push the next follow-up out without counting a reminder.
    pub fn reschedule(
        &mut self,
        id: &PacketId,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, RequestError> {
        let packet = self.get_mut(id)?;
        let cadence = packet
            .cadence
            .ok_or_else(|| RequestError::NotSent(packet.id.clone()))?;
        packet.next_follow_up = cadence.next_after(now, packet.deadline);
        Ok(packet.next_follow_up)
    }

    pub fn get(&self, id: &PacketId) -> Result<&RequestPacket, RequestError> {
        self.packets
            .get(id)
            .ok_or_else(|| RequestError::NotFound(id.clone()))
    }

    fn get_mut(&mut self, id: &PacketId) -> Result<&mut RequestPacket, RequestError> {
        self.packets
            .get_mut(id)
            .ok_or_else(|| RequestError::NotFound(id.clone()))
    }

    pub fn packets(&self) -> impl Iterator<Item = &RequestPacket> {
        self.packets.values()
    }
}
