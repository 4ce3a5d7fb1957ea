use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::audit::{AuditAction, AuditFilter, AuditLog, InMemoryAuditLog};
use crate::clock::ManualClock;
use crate::config::WorkspaceConfig;
use crate::workflows::desk::{ListingDesk, NewListing, NewPacket, PacketView, RecordingOutbox};
use crate::workflows::documents::{Holder, InboundAttachment, InboundMessage, ThreadId};
use crate::workflows::listing::{Actor, ChecklistStatus, HolderRole, ListingId, WorkflowState};

pub(super) type TestDesk = ListingDesk<InMemoryAuditLog, RecordingOutbox>;

/// Monday, 2025-09-22 09:00 UTC.
pub(super) fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 22, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn day(offset: i64) -> DateTime<Utc> {
    monday() + Duration::days(offset)
}

pub(super) struct Harness {
    pub(super) desk: Arc<TestDesk>,
    pub(super) audit: Arc<InMemoryAuditLog>,
    pub(super) outbox: Arc<RecordingOutbox>,
    pub(super) clock: Arc<ManualClock>,
}

impl Harness {
    pub(super) fn actions(&self, listing: &ListingId) -> Vec<AuditAction> {
        self.audit
            .query(Some(listing), &AuditFilter::default())
            .expect("in-memory query")
            .into_iter()
            .map(|entry| entry.action)
            .collect()
    }

    pub(super) fn status_of(&self, listing: &ListingId, item: &str) -> ChecklistStatus {
        self.desk
            .checklist(listing)
            .expect("listing exists")
            .into_iter()
            .find(|entry| entry.name == item)
            .map(|entry| entry.status)
            .expect("item on checklist")
    }
}

pub(super) fn harness() -> Harness {
    harness_with(WorkspaceConfig::default())
}

pub(super) fn harness_with(workspace: WorkspaceConfig) -> Harness {
    let audit = Arc::new(InMemoryAuditLog::new());
    let outbox = Arc::new(RecordingOutbox::default());
    let clock = Arc::new(ManualClock::new(monday()));
    let desk = Arc::new(ListingDesk::new(
        audit.clone(),
        outbox.clone(),
        clock.clone(),
        workspace,
    ));
    Harness {
        desk,
        audit,
        outbox,
        clock,
    }
}

pub(super) fn operator() -> Actor {
    Actor::user("Lena Vogt")
}

pub(super) fn seller() -> Holder {
    Holder {
        role: HolderRole::Seller,
        name: "Familie Krüger".to_string(),
        email: "krueger@example.org".to_string(),
        cadence: None,
    }
}

pub(super) fn management() -> Holder {
    Holder {
        role: HolderRole::PropertyManagement,
        name: "Hausverwaltung Schmidt".to_string(),
        email: "verwaltung@hv-schmidt.de".to_string(),
        cadence: None,
    }
}

pub(super) fn listing_in(harness: &Harness, state: WorkflowState) -> ListingId {
    harness
        .desk
        .create_listing(
            NewListing {
                title: "Altbauwohnung Prenzlauer Berg".to_string(),
                initial_state: Some(state),
            },
            &operator(),
        )
        .expect("listing created")
        .listing
        .id
}

pub(super) fn listing(harness: &Harness) -> ListingId {
    listing_in(harness, WorkflowState::Mandate)
}

pub(super) fn sent_packet(
    harness: &Harness,
    listing: &ListingId,
    holder: Holder,
    items: &[&str],
) -> PacketView {
    let created = harness
        .desk
        .create_packet(
            listing,
            NewPacket {
                holder,
                items: items.iter().map(|item| item.to_string()).collect(),
                deadline: None,
            },
            &operator(),
        )
        .expect("packet created");
    harness
        .desk
        .send_packet(&created.packet.id, "", &operator())
        .expect("packet sent")
}

pub(super) fn thread_of(packet: &PacketView) -> ThreadId {
    packet.packet.thread_id.clone().expect("sent packet has a thread")
}

pub(super) fn pdf(filename: &str, size: u64) -> InboundAttachment {
    InboundAttachment {
        filename: filename.to_string(),
        content_type: Some("application/pdf".to_string()),
        size,
    }
}

pub(super) fn reply(
    thread: &ThreadId,
    from: &str,
    body: &str,
    attachments: Vec<InboundAttachment>,
) -> InboundMessage {
    InboundMessage {
        thread_id: thread.clone(),
        from: from.to_string(),
        subject: "Re: Unterlagenanforderung".to_string(),
        body: body.to_string(),
        attachments,
        received_at: None,
    }
}

/// Drive `item` through manual updates until it is verified.
pub(super) fn verify(harness: &Harness, listing: &ListingId, item: &str) {
    for status in [ChecklistStatus::Received, ChecklistStatus::Verified] {
        harness
            .desk
            .set_item_status(listing, item, status, &operator())
            .expect("manual update accepted");
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
