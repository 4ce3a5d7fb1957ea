use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use super::outbox::{ChannelOutbox, OutboxReceivers};
use crate::audit::InMemoryAuditLog;
use crate::clock::ManualClock;
use crate::config::WorkspaceConfig;
use crate::workflows::desk::{ListingDesk, NewListing, NewPacket};
use crate::workflows::documents::{Holder, ThreadId};
use crate::workflows::listing::{Actor, HolderRole, ListingId};

pub(crate) type ChannelDesk = ListingDesk<InMemoryAuditLog, ChannelOutbox>;

/// Monday, 2025-09-22 09:00 UTC.
pub(crate) fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 22, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn clocked_desk() -> (ChannelDesk, OutboxReceivers, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(monday()));
    let (outbox, receivers) = ChannelOutbox::new();
    let desk = ListingDesk::new(
        Arc::new(InMemoryAuditLog::new()),
        Arc::new(outbox),
        clock.clone(),
        WorkspaceConfig::default(),
    );
    (desk, receivers, clock)
}

pub(crate) fn channel_desk() -> (ChannelDesk, OutboxReceivers) {
    let (desk, receivers, _) = clocked_desk();
    (desk, receivers)
}

pub(crate) fn operator() -> Actor {
    Actor::user("Lena Vogt")
}

/// Listing with a sent seller packet asking for the land register extract.
pub(crate) fn seller_packet(desk: &ChannelDesk) -> (ListingId, ThreadId) {
    let listing = desk
        .create_listing(
            NewListing {
                title: "Altbauwohnung Prenzlauer Berg".to_string(),
                initial_state: None,
            },
            &operator(),
        )
        .expect("listing")
        .listing
        .id;
    let packet = desk
        .create_packet(
            &listing,
            NewPacket {
                holder: Holder {
                    role: HolderRole::Seller,
                    name: "Familie Krüger".to_string(),
                    email: "krueger@example.org".to_string(),
                    cadence: None,
                },
                items: vec!["Grundbuchauszug".to_string()],
                deadline: None,
            },
            &operator(),
        )
        .expect("packet");
    let sent = desk
        .send_packet(&packet.packet.id, "", &operator())
        .expect("sent");
    let thread = sent.packet.thread_id.expect("sent packet has a thread");
    (listing, thread)
}
