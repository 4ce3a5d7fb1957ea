use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::common::*;

use crate::audit::{
    AuditAction, AuditEntry, AuditError, AuditFilter, AuditLog, AuditRecord, InMemoryAuditLog,
    JsonLinesAuditLog,
};
use crate::clock::ManualClock;
use crate::config::WorkspaceConfig;
use crate::workflows::desk::{
    DeskErrorKind, InMemoryListingStore, JsonFileListingStore, ListingDesk, ListingRecord,
    ListingStore, NewListing, NewPacket, RecordingOutbox, StoreError,
};
use crate::workflows::documents::PacketStatus;
use crate::workflows::listing::{ChecklistStatus, ListingId, WorkflowState};

/// Audit log that refuses appends while `failing` is set.
#[derive(Default)]
struct FlakyAuditLog {
    inner: InMemoryAuditLog,
    failing: AtomicBool,
}

impl FlakyAuditLog {
    fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AuditLog for FlakyAuditLog {
    fn append(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Io(std::io::Error::other("audit volume full")));
        }
        self.inner.append(record)
    }

    fn query(
        &self,
        listing_id: Option<&ListingId>,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        self.inner.query(listing_id, filter)
    }
}

/// Listing store that refuses saves while `failing` is set.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryListingStore,
    failing: AtomicBool,
}

impl ListingStore for FlakyStore {
    fn save(&self, record: &ListingRecord) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("snapshot volume full")));
        }
        self.inner.save(record)
    }

    fn load(&self) -> Result<Vec<ListingRecord>, StoreError> {
        self.inner.load()
    }
}

fn flaky_desk() -> (ListingDesk<FlakyAuditLog, RecordingOutbox>, Arc<FlakyAuditLog>) {
    let audit = Arc::new(FlakyAuditLog::default());
    let desk = ListingDesk::new(
        audit.clone(),
        Arc::new(RecordingOutbox::default()),
        Arc::new(ManualClock::new(monday())),
        WorkspaceConfig::default(),
    );
    (desk, audit)
}

fn new_listing(title: &str) -> NewListing {
    NewListing {
        title: title.to_string(),
        initial_state: None,
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "estate-flow-desk-{}-{name}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn failed_audit_append_leaves_advance_undone() {
    let (desk, audit) = flaky_desk();
    let id = desk
        .create_listing(new_listing("Reihenhaus Pankow"), &operator())
        .expect("listing")
        .listing
        .id;
    for status in [ChecklistStatus::Received, ChecklistStatus::Verified] {
        desk.set_item_status(&id, "Maklerauftrag", status, &operator())
            .expect("manual update");
    }

    audit.fail(true);
    let err = desk.advance(&id, &operator()).expect_err("audit down");
    assert_eq!(err.kind(), DeskErrorKind::Storage);
    assert_eq!(
        desk.listing(&id).expect("view").listing.state,
        WorkflowState::Mandate
    );

    audit.fail(false);
    assert_eq!(
        desk.advance(&id, &operator()).expect("audit back"),
        WorkflowState::Capture
    );
    let advanced = audit
        .query(Some(&id), &AuditFilter::action(AuditAction::StateAdvanced))
        .expect("query");
    assert_eq!(advanced.len(), 1);
}

#[test]
fn failed_audit_append_leaves_no_override_behind() {
    let (desk, audit) = flaky_desk();
    let id = desk
        .create_listing(new_listing("Reihenhaus Pankow"), &operator())
        .expect("listing")
        .listing
        .id;

    audit.fail(true);
    let err = desk
        .override_gate(&id, "mandate_signed", "Mandat telefonisch bestätigt", &operator())
        .expect_err("audit down");
    assert_eq!(err.kind(), DeskErrorKind::Storage);
    assert!(desk.listing(&id).expect("view").overrides.is_empty());

    audit.fail(false);
    desk.override_gate(&id, "mandate_signed", "Mandat telefonisch bestätigt", &operator())
        .expect("retry is not a duplicate");
    assert_eq!(desk.listing(&id).expect("view").overrides.len(), 1);
}

#[test]
fn failed_snapshot_rolls_back_and_sends_nothing() {
    let store = Arc::new(FlakyStore::default());
    let outbox = Arc::new(RecordingOutbox::default());
    let desk = ListingDesk::new(
        Arc::new(InMemoryAuditLog::new()),
        outbox.clone(),
        Arc::new(ManualClock::new(monday())),
        WorkspaceConfig::default(),
    )
    .with_store(store.clone())
    .expect("empty store");

    let id = desk
        .create_listing(new_listing("Altbauwohnung Prenzlauer Berg"), &operator())
        .expect("listing")
        .listing
        .id;
    let packet = desk
        .create_packet(
            &id,
            NewPacket {
                holder: seller(),
                items: vec!["Grundbuchauszug".to_string()],
                deadline: None,
            },
            &operator(),
        )
        .expect("packet")
        .packet
        .id;

    store.failing.store(true, Ordering::SeqCst);
    let err = desk
        .send_packet(&packet, "", &operator())
        .expect_err("store down");
    assert_eq!(err.kind(), DeskErrorKind::Storage);
    assert!(outbox.mails().is_empty());

    let view = desk.listing(&id).expect("view");
    assert_eq!(view.packets[0].status, PacketStatus::NotStarted);
    assert!(view.threads.is_empty());
    assert_eq!(
        view.checklist
            .iter()
            .find(|item| item.name == "Grundbuchauszug")
            .map(|item| item.status),
        Some(ChecklistStatus::Missing)
    );

    store.failing.store(false, Ordering::SeqCst);
    desk.send_packet(&packet, "", &operator())
        .expect("store back");
    assert_eq!(outbox.mails().len(), 1);
}

#[test]
fn reopened_audit_log_continues_listing_numbering() {
    let dir = scratch_dir("audit-reopen");
    let path = dir.join("audit.jsonl");
    let open_desk = || {
        ListingDesk::new(
            Arc::new(JsonLinesAuditLog::open(&path).expect("open audit log")),
            Arc::new(RecordingOutbox::default()),
            Arc::new(ManualClock::new(monday())),
            WorkspaceConfig::default(),
        )
    };

    let first = open_desk()
        .create_listing(new_listing("Reihenhaus Pankow"), &operator())
        .expect("first listing")
        .listing
        .id;

    let reopened = open_desk();
    let second = reopened
        .create_listing(new_listing("Altbauwohnung Prenzlauer Berg"), &operator())
        .expect("second listing")
        .listing
        .id;
    assert_ne!(first, second);

    let created = reopened
        .audit_trail(None, &AuditFilter::action(AuditAction::ListingCreated))
        .expect("trail");
    assert_eq!(created.len(), 2);
    for id in [&first, &second] {
        let per_id = created
            .iter()
            .filter(|entry| entry.listing_id.as_ref() == Some(id))
            .count();
        assert_eq!(per_id, 1, "{id} created once");
    }

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn file_store_restores_listings_and_their_routes() {
    let dir = scratch_dir("snapshots");
    let open_desk = || {
        ListingDesk::new(
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(RecordingOutbox::default()),
            Arc::new(ManualClock::new(monday())),
            WorkspaceConfig::default(),
        )
        .with_store(Arc::new(
            JsonFileListingStore::open(&dir).expect("open store"),
        ))
        .expect("load snapshots")
    };

    let (id, thread) = {
        let desk = open_desk();
        let id = desk
            .create_listing(new_listing("Reihenhaus Pankow"), &operator())
            .expect("listing")
            .listing
            .id;
        let packet = desk
            .create_packet(
                &id,
                NewPacket {
                    holder: seller(),
                    items: vec!["Grundbuchauszug".to_string()],
                    deadline: None,
                },
                &operator(),
            )
            .expect("packet")
            .packet
            .id;
        let sent = desk
            .send_packet(&packet, "", &operator())
            .expect("sent");
        (id, thread_of(&sent))
    };

    let desk = open_desk();
    let view = desk.listing(&id).expect("restored");
    assert_eq!(view.listing.title, "Reihenhaus Pankow");
    assert_eq!(view.packets[0].status, PacketStatus::Sent);
    assert_eq!(
        desk.checklist(&id)
            .expect("checklist")
            .into_iter()
            .find(|item| item.name == "Grundbuchauszug")
            .map(|item| item.status),
        Some(ChecklistStatus::Requested)
    );

    desk.receive_reply(reply(
        &thread,
        "krueger@example.org",
        "Anbei.",
        vec![pdf("Grundbuchauszug.pdf", 300_000)],
    ))
    .expect("restored thread is routed");

    let next = desk
        .create_listing(new_listing("Altbauwohnung Prenzlauer Berg"), &operator())
        .expect("new listing")
        .listing
        .id;
    assert_ne!(next, id);
    assert_eq!(desk.listings().len(), 2);

    let _ = std::fs::remove_dir_all(dir);
}
