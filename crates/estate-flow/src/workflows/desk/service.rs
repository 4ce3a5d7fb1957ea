use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::DeskError;
use super::ports::Outbox;
use super::publish::{Platform, Publication, PublicationStatus, PublishCommand};
use super::record::ListingRecord;
use super::store::{InMemoryListingStore, ListingStore};
use super::view::{ListingView, PacketView, ReplyOutcome};
use crate::audit::{AuditAction, AuditEntry, AuditFilter, AuditLog, AuditRecord};
use crate::clock::Clock;
use crate::config::WorkspaceConfig;
use crate::workflows::documents::{
    declared_type, email_domain, Attachment, AttachmentClassifier, AttachmentId, DeliveryStatus,
    Direction, DispatchMode, DocumentInspector, ExceptionDetector, ExceptionId, ExceptionRecord,
    FollowUpDraft, FollowUpScheduler, Holder, InboundMessage, Message, MessageId,
    MetadataInspector, OutboundMail, PacketId, QaOutcome, QaResult, QaVerdict, RequestError,
    Resolution, Thread, ThreadId,
};
use crate::workflows::ids::IdSequence;
use crate::workflows::listing::{
    Actor, ChecklistItem, ChecklistStatus, ChecklistStore, ChecklistTransition, GateBlueprint,
    GateCheck, GateEngine, GateError, GateOverride, HolderRole, ItemCategory, Listing, ListingId,
    StatusSource, WorkflowState, PORTAL_MILESTONE,
};

const MAILBOX_ACTOR: &str = "mailbox";
const SCHEDULER_ACTOR: &str = "follow-up scheduler";
const DISPATCH_ACTOR: &str = "dispatcher";
const PORTAL_ACTOR: &str = "portal gateway";

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub title: String,
    /// Import an in-flight listing directly into this state.
    #[serde(default)]
    pub initial_state: Option<WorkflowState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklistItem {
    pub name: String,
    pub category: ItemCategory,
    pub holder: HolderRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPacket {
    pub holder: Holder,
    pub items: Vec<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { external_id: String },
    Failed { reason: String },
}

/// Callback payload of a portal gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishResult {
    pub ok: bool,
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Routes {
    threads: BTreeMap<ThreadId, ListingId>,
    packets: BTreeMap<PacketId, ListingId>,
    messages: BTreeMap<MessageId, ListingId>,
    exceptions: BTreeMap<ExceptionId, ListingId>,
}

type SharedRecord = Arc<Mutex<ListingRecord>>;

fn lock(record: &SharedRecord) -> MutexGuard<'_, ListingRecord> {
    record.lock().expect("listing mutex poisoned")
}

/// Status moves issued by the desk itself are pre-checked, so a refusal here
/// means the checklist invariants are broken.
fn move_item(
    checklist: &mut ChecklistStore,
    item: &str,
    to: ChecklistStatus,
    source: StatusSource,
    now: DateTime<Utc>,
) -> Option<ChecklistTransition> {
    checklist
        .set_status(item, to, source, now)
        .unwrap_or_else(|err| panic!("checklist invariant violated: {err}"))
}

/// Facade over every listing of a workspace. Each listing is mutated under its
/// own lock; the audit log and the listing store are only touched while that
/// lock is held.
pub struct ListingDesk<L, O> {
    engine: GateEngine,
    audit: Arc<L>,
    outbox: Arc<O>,
    store: Arc<dyn ListingStore>,
    clock: Arc<dyn Clock>,
    inspector: Arc<dyn DocumentInspector>,
    detector: ExceptionDetector,
    classifier: AttachmentClassifier,
    scheduler: FollowUpScheduler,
    workspace: WorkspaceConfig,
    ids: IdSequence,
    listings: RwLock<BTreeMap<ListingId, SharedRecord>>,
    routes: RwLock<Routes>,
}

impl<L, O> ListingDesk<L, O>
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    /// Desk over an in-memory listing store. IDs continue after the highest
    /// one already present in `audit`.
    pub fn new(
        audit: Arc<L>,
        outbox: Arc<O>,
        clock: Arc<dyn Clock>,
        workspace: WorkspaceConfig,
    ) -> Self {
        let inspector = Arc::new(MetadataInspector {
            min_document_bytes: workspace.min_document_bytes,
        });
        let scheduler =
            FollowUpScheduler::new(workspace.follow_up_cadence, workspace.dispatch_mode());

        let desk = Self {
            engine: GateEngine::new(Arc::new(GateBlueprint::standard())),
            audit,
            outbox,
            store: Arc::new(InMemoryListingStore::new()),
            clock,
            inspector,
            detector: ExceptionDetector::new(),
            classifier: AttachmentClassifier::new(),
            scheduler,
            workspace,
            ids: IdSequence::new(),
            listings: RwLock::new(BTreeMap::new()),
            routes: RwLock::new(Routes::default()),
        };
        desk.observe_audited_ids();
        desk
    }

    /// Persist listings in `store`, restoring every record it already holds.
    pub fn with_store(mut self, store: Arc<dyn ListingStore>) -> Result<Self, DeskError> {
        let records = store.load()?;
        let restored = records.len();
        for record in records {
            self.restore(record);
        }
        self.store = store;
        if restored > 0 {
            info!(listings = restored, "listings restored from store");
        }
        Ok(self)
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn DocumentInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn workspace(&self) -> &WorkspaceConfig {
        &self.workspace
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn blueprint(&self) -> &GateBlueprint {
        self.engine.blueprint()
    }

    // ---- listings and gates -------------------------------------------------

    pub fn create_listing(
        &self,
        request: NewListing,
        actor: &Actor,
    ) -> Result<ListingView, DeskError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(DeskError::Validation(
                "listing title must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let listing = Listing {
            id: self.ids.listing(),
            title: title.to_string(),
            state: request.initial_state.unwrap_or(WorkflowState::Mandate),
            created_at: now,
        };
        let checklist = ChecklistStore::from_templates(self.engine.blueprint().item_templates(), now);
        let record = ListingRecord::new(listing, checklist);
        let id = record.listing.id.clone();

        self.append(
            AuditRecord::new(AuditAction::ListingCreated, actor, now)
                .listing(&id)
                .detail("title", &record.listing.title)
                .detail("state", record.listing.state),
        )?;
        self.store.save(&record)?;
        info!(listing = %id, state = %record.listing.state, "listing created");

        let view = self.view_of(&record);
        self.listings
            .write()
            .expect("listing index poisoned")
            .insert(id, Arc::new(Mutex::new(record)));
        Ok(view)
    }

    pub fn listing(&self, id: &ListingId) -> Result<ListingView, DeskError> {
        let shared = self.shared(id)?;
        let record = lock(&shared);
        Ok(self.view_of(&record))
    }

    pub fn listings(&self) -> Vec<Listing> {
        let shared: Vec<SharedRecord> = self
            .listings
            .read()
            .expect("listing index poisoned")
            .values()
            .cloned()
            .collect();
        shared
            .iter()
            .map(|record| lock(record).listing.clone())
            .collect()
    }

    /// Consistent copy of the checklist.
    pub fn checklist(&self, id: &ListingId) -> Result<Vec<ChecklistItem>, DeskError> {
        let shared = self.shared(id)?;
        let record = lock(&shared);
        Ok(record.checklist.snapshot())
    }

    pub fn set_item_status(
        &self,
        id: &ListingId,
        item: &str,
        status: ChecklistStatus,
        actor: &Actor,
    ) -> Result<Option<ChecklistTransition>, DeskError> {
        let shared = self.shared(id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let transition = self.commit(&mut record, |record| {
            let transition = record
                .checklist
                .set_status(item, status, StatusSource::Manual, now)?;
            if let Some(transition) = &transition {
                self.audit_transition(id, transition, actor, now)?;
            }
            Ok(transition)
        })?;
        if let Some(transition) = &transition {
            info!(listing = %id, item = %transition.item, from = %transition.from, to = %transition.to, "checklist item updated");
        }
        Ok(transition)
    }

    pub fn add_checklist_item(
        &self,
        id: &ListingId,
        request: NewChecklistItem,
        actor: &Actor,
    ) -> Result<ChecklistItem, DeskError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(DeskError::Validation(
                "checklist item name must not be empty".to_string(),
            ));
        }

        let shared = self.shared(id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        self.commit(&mut record, |record| {
            let item = record
                .checklist
                .add_item(name, request.category, request.holder, now)?
                .clone();
            self.append(
                AuditRecord::new(AuditAction::ChecklistItemAdded, actor, now)
                    .listing(id)
                    .detail("item", &item.name)
                    .detail("category", item.category.label())
                    .detail("holder", item.holder.label()),
            )?;
            Ok(item)
        })
    }

    pub fn can_advance(&self, id: &ListingId) -> Result<GateCheck, DeskError> {
        let shared = self.shared(id)?;
        let record = lock(&shared);
        Ok(self.evaluate(&record))
    }

    /// Move one state forward. Refusals are audited as declined attempts.
    pub fn advance(&self, id: &ListingId, actor: &Actor) -> Result<WorkflowState, DeskError> {
        let shared = self.shared(id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let (from, state) = self.commit(&mut record, |record| {
            let ListingRecord {
                listing,
                checklist,
                overrides,
                ..
            } = record;
            let from = listing.state;

            match self.engine.advance(listing, checklist, overrides) {
                Ok(state) => {
                    self.append(
                        AuditRecord::new(AuditAction::StateAdvanced, actor, now)
                            .listing(id)
                            .detail("from", from)
                            .detail("to", state),
                    )?;
                    Ok((from, state))
                }
                Err(GateError::GateNotMet { target, unmet }) => {
                    let gates: Vec<&str> = unmet.iter().map(|gate| gate.gate).collect();
                    let reasons: Vec<String> = unmet.iter().map(|gate| gate.describe()).collect();
                    self.append(
                        AuditRecord::new(AuditAction::AdvanceDeclined, actor, now)
                            .listing(id)
                            .detail("target", target)
                            .detail("unmet_gates", gates.join(","))
                            .detail("reasons", reasons.join(" | ")),
                    )?;
                    warn!(listing = %id, %target, unmet = gates.len(), "advance declined");
                    Err(GateError::GateNotMet { target, unmet }.into())
                }
                Err(err) => Err(err.into()),
            }
        })?;
        info!(listing = %id, %from, to = %state, "listing advanced");
        Ok(state)
    }

    /// Force-satisfy one gate of an upcoming state.
    pub fn override_gate(
        &self,
        id: &ListingId,
        gate: &str,
        reason: &str,
        actor: &Actor,
    ) -> Result<GateOverride, DeskError> {
        let shared = self.shared(id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let entry = self
            .engine
            .record_override(gate, reason, actor.clone(), now)?;
        if entry.state <= record.listing.state {
            return Err(DeskError::InvalidState(format!(
                "gate '{}' guards {} which the listing has already reached",
                entry.gate, entry.state
            )));
        }
        if record.overrides.iter().any(|existing| existing.gate == entry.gate) {
            return Err(DeskError::InvalidState(format!(
                "gate '{}' is already overridden",
                entry.gate
            )));
        }

        self.commit(&mut record, |record| {
            record.overrides.push(entry.clone());
            self.append(
                AuditRecord::new(AuditAction::GateOverridden, actor, now)
                    .listing(id)
                    .detail("gate", &entry.gate)
                    .detail("state", entry.state)
                    .detail("reason", &entry.reason),
            )?;
            Ok(())
        })?;
        warn!(listing = %id, gate = %entry.gate, actor = %actor.name, "gate overridden");
        Ok(entry)
    }

    // ---- request packets ----------------------------------------------------

    pub fn create_packet(
        &self,
        id: &ListingId,
        request: NewPacket,
        actor: &Actor,
    ) -> Result<PacketView, DeskError> {
        let NewPacket {
            holder,
            items,
            deadline,
        } = request;
        if holder.name.trim().is_empty() {
            return Err(DeskError::Validation(
                "holder name must not be empty".to_string(),
            ));
        }
        if email_domain(&holder.email).is_none() {
            return Err(DeskError::Validation(format!(
                "holder email '{}' is not a valid address",
                holder.email
            )));
        }

        let shared = self.shared(id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let view = self.commit(&mut record, |record| {
            let ListingRecord {
                checklist,
                requests,
                ..
            } = &mut *record;
            let packet = requests
                .create_packet(
                    self.ids.packet(),
                    id.clone(),
                    holder,
                    items,
                    deadline,
                    checklist,
                    now,
                )?
                .clone();
            self.append(
                AuditRecord::new(AuditAction::PacketCreated, actor, now)
                    .listing(id)
                    .detail("packet", &packet.id)
                    .detail("holder", &packet.holder.name)
                    .detail("items", packet.items.join(", ")),
            )?;

            let status = record.packet_status(&packet);
            Ok(PacketView { packet, status })
        })?;

        self.routes
            .write()
            .expect("route index poisoned")
            .packets
            .insert(view.packet.id.clone(), id.clone());
        Ok(view)
    }

    /// Send a packet: opens its thread with the request mail and marks the
    /// missing items as requested. A blank body is replaced by a generated one.
    pub fn send_packet(
        &self,
        packet_id: &PacketId,
        body: &str,
        actor: &Actor,
    ) -> Result<PacketView, DeskError> {
        let shared = self.by_packet(packet_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let (view, message) = self.commit(&mut record, |record| {
            let ListingRecord {
                listing,
                checklist,
                requests,
                threads,
                ..
            } = &mut *record;

            let holder = requests.get(packet_id)?.holder.clone();
            let cadence = self.scheduler.cadence_for(&holder);
            requests.ensure_sendable(packet_id, cadence)?;

            let thread_id = self.ids.thread();
            let packet = requests
                .mark_sent(packet_id, thread_id.clone(), cadence, now)?
                .clone();

            let body = if body.trim().is_empty() {
                request_body(&holder, listing, &packet.items)
            } else {
                body.to_string()
            };

            threads.open(Thread {
                id: thread_id.clone(),
                listing_id: listing.id.clone(),
                packet_id: Some(packet_id.clone()),
                holder: holder.clone(),
                messages: Vec::new(),
                deliveries: BTreeMap::new(),
            });
            let message = threads
                .push_outgoing(Message {
                    id: self.ids.message(),
                    thread_id: thread_id.clone(),
                    direction: Direction::Outgoing,
                    from: self.workspace.sending_identity.clone(),
                    to: holder.email.clone(),
                    subject: format!("Unterlagenanforderung: {} ({})", listing.title, listing.id),
                    body,
                    at: now,
                    attachments: Vec::new(),
                    is_follow_up: false,
                    is_draft: false,
                })?
                .clone();

            let mut transitions = Vec::new();
            for item in &packet.items {
                if checklist.status(item)? == ChecklistStatus::Missing {
                    transitions.extend(move_item(
                        checklist,
                        item,
                        ChecklistStatus::Requested,
                        StatusSource::Request {
                            packet: packet_id.clone(),
                        },
                        now,
                    ));
                }
            }

            let mut audit = AuditRecord::new(AuditAction::PacketSent, actor, now)
                .listing(&listing.id)
                .detail("packet", packet_id)
                .detail("thread", &thread_id)
                .detail("to", &holder.email)
                .detail("cadence", cadence);
            if let Some(next) = packet.next_follow_up {
                audit = audit.detail("next_follow_up", next.to_rfc3339());
            }
            self.append(audit)?;
            for transition in &transitions {
                self.audit_transition(&listing.id, transition, actor, now)?;
            }

            let status = record.packet_status(&packet);
            Ok((PacketView { packet, status }, message))
        })?;

        let listing_id = record.listing.id.clone();
        {
            let mut routes = self.routes.write().expect("route index poisoned");
            routes
                .threads
                .insert(message.thread_id.clone(), listing_id.clone());
            routes.messages.insert(message.id.clone(), listing_id.clone());
        }
        self.outbox
            .enqueue_mail(OutboundMail::from_message(&listing_id, &message));
        info!(listing = %listing_id, packet = %packet_id, thread = %message.thread_id, holder = %view.packet.holder.name, "request packet sent");

        Ok(view)
    }

    pub fn pause_follow_ups(
        &self,
        packet_id: &PacketId,
        actor: &Actor,
    ) -> Result<PacketView, DeskError> {
        self.toggle_follow_ups(packet_id, true, actor)
    }

    pub fn resume_follow_ups(
        &self,
        packet_id: &PacketId,
        actor: &Actor,
    ) -> Result<PacketView, DeskError> {
        self.toggle_follow_ups(packet_id, false, actor)
    }

    fn toggle_follow_ups(
        &self,
        packet_id: &PacketId,
        paused: bool,
        actor: &Actor,
    ) -> Result<PacketView, DeskError> {
        let shared = self.by_packet(packet_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        self.commit(&mut record, |record| {
            if record.requests.set_paused(packet_id, paused)? {
                let action = if paused {
                    AuditAction::FollowUpsPaused
                } else {
                    AuditAction::FollowUpsResumed
                };
                self.append(
                    AuditRecord::new(action, actor, now)
                        .listing(&record.listing.id)
                        .detail("packet", packet_id),
                )?;
            }

            let packet = record.requests.get(packet_id)?.clone();
            let status = record.packet_status(&packet);
            Ok(PacketView { packet, status })
        })
    }

    // ---- replies, ingestion and QA -----------------------------------------

    /// Append a holder reply to its thread. Exceptions are raised for replies
    /// without attachments whose text matches the detector heuristics.
    pub fn receive_reply(&self, inbound: InboundMessage) -> Result<ReplyOutcome, DeskError> {
        let shared = self.by_thread(&inbound.thread_id)?;

        if self.workspace.track_external_threads_only {
            if let (Some(own), Some(sender)) =
                (self.workspace.own_domain(), email_domain(&inbound.from))
            {
                if own == sender {
                    debug!(thread = %inbound.thread_id, from = %inbound.from, "ignoring internal reply");
                    return Ok(ReplyOutcome::Ignored {
                        reason: format!("sender domain {sender} is the workspace's own"),
                    });
                }
            }
        }

        let mut record = lock(&shared);
        let now = inbound.received_at.unwrap_or_else(|| self.clock.now());
        let actor = Actor::agent(MAILBOX_ACTOR);
        let from = inbound.from.clone();
        let thread_id = inbound.thread_id.clone();

        let attachments = inbound
            .attachments
            .into_iter()
            .map(|attachment| Attachment {
                id: self.ids.attachment(),
                declared_type: declared_type(
                    &attachment.filename,
                    attachment.content_type.as_deref(),
                ),
                filename: attachment.filename,
                size: attachment.size,
                classified: false,
                ingested: false,
                resolved_type: None,
                reviewed: false,
            })
            .collect::<Vec<_>>();
        let attachment_count = attachments.len();
        let message = Message {
            id: self.ids.message(),
            thread_id: thread_id.clone(),
            direction: Direction::Incoming,
            from: inbound.from,
            to: self.workspace.sending_identity.clone(),
            subject: inbound.subject,
            body: inbound.body,
            at: now,
            attachments,
            is_follow_up: false,
            is_draft: false,
        };
        let message_id = message.id.clone();

        let (raised, thread_status) = self.commit(&mut record, |record| {
            let raised =
                record
                    .threads
                    .append_incoming(message, &self.detector, &self.ids, now)?;

            self.append(
                AuditRecord::new(AuditAction::ReplyReceived, &actor, now)
                    .listing(&record.listing.id)
                    .detail("thread", &thread_id)
                    .detail("message", &message_id)
                    .detail("from", &from)
                    .detail("attachments", attachment_count),
            )?;
            for exception in &raised {
                self.audit_exception(exception, &actor, now)?;
            }

            let thread = record.threads.get(&thread_id)?;
            let thread_status = record.thread_status(thread);
            Ok((raised, thread_status))
        })?;

        let listing_id = record.listing.id.clone();
        {
            let mut routes = self.routes.write().expect("route index poisoned");
            routes.messages.insert(message_id.clone(), listing_id.clone());
            for exception in &raised {
                routes
                    .exceptions
                    .insert(exception.id.clone(), listing_id.clone());
            }
        }
        info!(listing = %listing_id, thread = %thread_id, attachments = attachment_count, exceptions = raised.len(), "reply received");

        Ok(ReplyOutcome::Appended {
            message_id,
            thread_status,
            exceptions: raised,
        })
    }

    /// Classify and ingest the attachments of an incoming message. Matched
    /// items move to `received`; repeated calls change nothing.
    pub fn ingest_attachments(
        &self,
        message_id: &MessageId,
        actor: &Actor,
    ) -> Result<Vec<ChecklistItem>, DeskError> {
        let shared = self.by_message(message_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let (items, ingested) = self.commit(&mut record, |record| {
            let ListingRecord {
                listing,
                checklist,
                requests,
                threads,
                ..
            } = record;

            let message = threads.message(message_id)?;
            if message.direction != Direction::Incoming {
                return Err(DeskError::Validation(format!(
                    "message '{message_id}' is outgoing and carries no evidence"
                )));
            }
            let thread_id = message.thread_id.clone();

            let candidates: Vec<String> = threads
                .get(&thread_id)?
                .packet_id
                .as_ref()
                .and_then(|packet_id| requests.get(packet_id).ok())
                .map(|packet| packet.items.clone())
                .filter(|items| !items.is_empty())
                .unwrap_or_else(|| checklist.names().map(str::to_string).collect());
            let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();

            let mut ingested = Vec::new();
            for attachment in threads.attachments_mut(message_id)?.iter_mut() {
                if !attachment.classified {
                    attachment.resolved_type = self
                        .classifier
                        .classify(&attachment.filename, &candidates)
                        .map(str::to_string);
                    attachment.classified = true;
                }
                if attachment.ingested {
                    continue;
                }
                if let Some(item) = &attachment.resolved_type {
                    attachment.ingested = true;
                    ingested.push((attachment.filename.clone(), item.clone()));
                }
            }

            if ingested.is_empty() {
                return Ok((Vec::new(), 0));
            }

            let mut transitions = Vec::new();
            for (_, item) in &ingested {
                if checklist.status(item)? < ChecklistStatus::Received {
                    transitions.extend(move_item(
                        checklist,
                        item,
                        ChecklistStatus::Received,
                        StatusSource::Ingestion {
                            message: message_id.clone(),
                        },
                        now,
                    ));
                }
            }

            let files: Vec<String> = ingested
                .iter()
                .map(|(filename, item)| format!("{filename} -> {item}"))
                .collect();
            self.append(
                AuditRecord::new(AuditAction::AttachmentsIngested, actor, now)
                    .listing(&listing.id)
                    .detail("message", message_id)
                    .detail("files", files.join("; ")),
            )?;
            for transition in &transitions {
                self.audit_transition(&listing.id, transition, actor, now)?;
            }

            let items = transitions
                .iter()
                .filter_map(|transition| checklist.get(&transition.item).cloned())
                .collect();
            Ok((items, ingested.len()))
        })?;

        if ingested > 0 {
            info!(listing = %record.listing.id, message = %message_id, ingested, "attachments ingested");
        }
        Ok(items)
    }

    /// Inspect every ingested, unreviewed attachment of a message. Copies of
    /// the same item are judged together: one passing copy verifies the item,
    /// and the item is rejected only when every copy fails. Attachments whose
    /// item is not in `received` stay unreviewed for a later run.
    pub fn run_qa(&self, message_id: &MessageId, actor: &Actor) -> Result<Vec<QaResult>, DeskError> {
        let shared = self.by_message(message_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let (results, raised) = self.commit(&mut record, |record| {
            let ListingRecord {
                listing,
                checklist,
                threads,
                ..
            } = record;

            let message = threads.message(message_id)?;
            let thread_id = message.thread_id.clone();
            let pending: Vec<(Attachment, String)> = message
                .attachments
                .iter()
                .filter(|attachment| attachment.ingested && !attachment.reviewed)
                .filter_map(|attachment| {
                    attachment
                        .resolved_type
                        .clone()
                        .map(|item| (attachment.clone(), item))
                })
                .collect();

            let mut copies: Vec<(&str, Vec<&Attachment>)> = Vec::new();
            for (attachment, item) in &pending {
                match copies.iter_mut().find(|(name, _)| *name == item.as_str()) {
                    Some((_, attachments)) => attachments.push(attachment),
                    None => copies.push((item.as_str(), vec![attachment])),
                }
            }

            let mut outcomes: BTreeMap<AttachmentId, QaOutcome> = BTreeMap::new();
            let mut raised = Vec::new();
            for (item, attachments) in copies {
                let source = StatusSource::Qa {
                    message: message_id.clone(),
                };
                match checklist.status(item)? {
                    ChecklistStatus::Verified => {
                        for attachment in attachments {
                            outcomes.insert(attachment.id.clone(), QaOutcome::AlreadyVerified);
                        }
                    }
                    ChecklistStatus::Missing | ChecklistStatus::Requested => {
                        for attachment in attachments {
                            outcomes.insert(attachment.id.clone(), QaOutcome::Skipped);
                        }
                    }
                    ChecklistStatus::Received => {
                        let verdicts: Vec<(&Attachment, QaVerdict)> = attachments
                            .into_iter()
                            .map(|attachment| (attachment, self.inspector.inspect(attachment, item)))
                            .collect();
                        let accepted = verdicts
                            .iter()
                            .find(|(_, verdict)| *verdict == QaVerdict::Verified)
                            .map(|(attachment, _)| *attachment);

                        match accepted {
                            Some(accepted) => {
                                let transition =
                                    move_item(checklist, item, ChecklistStatus::Verified, source, now);
                                self.append(
                                    AuditRecord::new(AuditAction::DocumentVerified, actor, now)
                                        .listing(&listing.id)
                                        .detail("item", item)
                                        .detail("file", &accepted.filename),
                                )?;
                                if let Some(transition) = &transition {
                                    self.audit_transition(&listing.id, transition, actor, now)?;
                                }
                                for (attachment, verdict) in &verdicts {
                                    let outcome = if attachment.id == accepted.id {
                                        QaOutcome::Verified
                                    } else if *verdict == QaVerdict::Verified {
                                        QaOutcome::AlreadyVerified
                                    } else {
                                        debug!(listing = %listing.id, file = %attachment.filename, %item, "failed copy superseded");
                                        QaOutcome::Superseded {
                                            by: accepted.id.clone(),
                                        }
                                    };
                                    outcomes.insert(attachment.id.clone(), outcome);
                                }
                            }
                            None => {
                                for (attachment, verdict) in &verdicts {
                                    let Some(kind) = verdict.exception(attachment, item) else {
                                        continue;
                                    };
                                    let exception =
                                        threads.raise(&thread_id, message_id, kind, &self.ids, now)?;
                                    self.audit_exception(&exception, actor, now)?;
                                    outcomes.insert(
                                        attachment.id.clone(),
                                        QaOutcome::Rejected {
                                            verdict: *verdict,
                                            exception: exception.id.clone(),
                                        },
                                    );
                                    raised.push(exception.id);
                                }
                                let transition =
                                    move_item(checklist, item, ChecklistStatus::Missing, source, now);
                                if let Some(transition) = &transition {
                                    self.audit_transition(&listing.id, transition, actor, now)?;
                                }
                            }
                        }
                    }
                }
            }

            for stored in threads.attachments_mut(message_id)?.iter_mut() {
                if outcomes
                    .get(&stored.id)
                    .is_some_and(|outcome| *outcome != QaOutcome::Skipped)
                {
                    stored.reviewed = true;
                }
            }

            let results = pending
                .into_iter()
                .map(|(attachment, item)| QaResult {
                    message_id: message_id.clone(),
                    outcome: outcomes
                        .remove(&attachment.id)
                        .unwrap_or(QaOutcome::Skipped),
                    attachment_id: attachment.id,
                    filename: attachment.filename,
                    item,
                })
                .collect::<Vec<_>>();
            Ok((results, raised))
        })?;

        let listing_id = record.listing.id.clone();
        if !raised.is_empty() {
            let mut routes = self.routes.write().expect("route index poisoned");
            for exception in raised {
                routes.exceptions.insert(exception, listing_id.clone());
            }
        }
        let rejected = results
            .iter()
            .filter(|result| matches!(result.outcome, QaOutcome::Rejected { .. }))
            .count();
        info!(listing = %listing_id, message = %message_id, reviewed = results.len(), rejected, "document QA finished");
        Ok(results)
    }

    /// Close an exception. The checklist is left as is.
    pub fn resolve_exception(
        &self,
        exception_id: &ExceptionId,
        action: &str,
        actor: &Actor,
    ) -> Result<ExceptionRecord, DeskError> {
        let action = action.trim();
        if action.is_empty() {
            return Err(DeskError::Validation(
                "resolving an exception requires the action taken".to_string(),
            ));
        }

        let shared = self.by_exception(exception_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let resolved = self.commit(&mut record, |record| {
            let resolved = record
                .threads
                .resolve(
                    exception_id,
                    Resolution {
                        action: action.to_string(),
                        actor: actor.clone(),
                        at: now,
                    },
                )?
                .clone();
            self.append(
                AuditRecord::new(AuditAction::ExceptionResolved, actor, now)
                    .listing(&resolved.listing_id)
                    .detail("exception", exception_id)
                    .detail("kind", resolved.kind.code())
                    .detail("action", action),
            )?;
            Ok(resolved)
        })?;
        info!(listing = %resolved.listing_id, exception = %exception_id, "exception resolved");
        Ok(resolved)
    }

    // ---- follow-ups and drafts ---------------------------------------------

    /// Draft (or, in auto-send mode, send) a follow-up for every due packet.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<Vec<FollowUpDraft>, DeskError> {
        let shared: Vec<SharedRecord> = self
            .listings
            .read()
            .expect("listing index poisoned")
            .values()
            .cloned()
            .collect();
        let actor = Actor::agent(SCHEDULER_ACTOR);

        let mut drafts = Vec::new();
        for listing in shared {
            let mut record = lock(&listing);
            let due: Vec<PacketId> = record
                .requests
                .packets()
                .filter(|packet| {
                    self.scheduler
                        .is_due(packet, record.packet_status(packet), now)
                })
                .map(|packet| packet.id.clone())
                .collect();
            if due.is_empty() {
                continue;
            }

            let produced = self.commit(&mut record, |record| {
                let mut produced = Vec::new();
                for packet_id in &due {
                    produced.extend(self.follow_up(record, packet_id, now, &actor)?);
                }
                Ok(produced)
            })?;

            let listing_id = record.listing.id.clone();
            for (draft, mail) in produced {
                self.routes
                    .write()
                    .expect("route index poisoned")
                    .messages
                    .insert(draft.message_id.clone(), listing_id.clone());
                if let Some(mail) = mail {
                    self.outbox.enqueue_mail(mail);
                }
                info!(listing = %listing_id, packet = %draft.packet_id, message = %draft.message_id, dispatched = draft.dispatched, "follow-up drafted");
                drafts.push(draft);
            }
        }

        if !drafts.is_empty() {
            info!(drafts = drafts.len(), "follow-up tick produced drafts");
        }
        Ok(drafts)
    }

    /// Draft one follow-up inside a commit. In auto-send mode the dispatched
    /// mail is handed back for the caller to enqueue.
    fn follow_up(
        &self,
        record: &mut ListingRecord,
        packet_id: &PacketId,
        now: DateTime<Utc>,
        actor: &Actor,
    ) -> Result<Option<(FollowUpDraft, Option<OutboundMail>)>, DeskError> {
        let packet = record.requests.get(packet_id)?.clone();
        let thread_id = packet
            .thread_id
            .clone()
            .ok_or_else(|| RequestError::NotSent(packet_id.clone()))?;

        let outstanding = packet.outstanding(&record.checklist);
        if outstanding.is_empty() {
            // Everything is back and waiting on our own QA; nothing to chase.
            record.requests.reschedule(packet_id, now)?;
            debug!(packet = %packet_id, "follow-up skipped, nothing outstanding");
            return Ok(None);
        }

        let original_subject = record
            .threads
            .get(&thread_id)?
            .first_subject()
            .map(str::to_string);
        let (subject, body) = self.scheduler.compose(
            &packet.holder,
            original_subject.as_deref(),
            &outstanding,
            packet.follow_ups_drafted + 1,
        );

        let message = record
            .threads
            .push_outgoing(Message {
                id: self.ids.message(),
                thread_id: thread_id.clone(),
                direction: Direction::Outgoing,
                from: self.workspace.sending_identity.clone(),
                to: packet.holder.email.clone(),
                subject,
                body,
                at: now,
                attachments: Vec::new(),
                is_follow_up: true,
                is_draft: true,
            })?
            .clone();
        let next_follow_up = record.requests.record_follow_up(packet_id, now)?;
        let listing_id = record.listing.id.clone();

        let mut audit = AuditRecord::new(AuditAction::FollowUpDrafted, actor, now)
            .listing(&listing_id)
            .detail("packet", packet_id)
            .detail("message", &message.id);
        if let Some(next) = next_follow_up {
            audit = audit.detail("next_follow_up", next.to_rfc3339());
        }
        self.append(audit)?;

        let mut mail = None;
        if self.scheduler.mode() == DispatchMode::AutoSend {
            let sent = record.threads.dispatch_draft(&message.id, now)?;
            mail = Some(OutboundMail::from_message(&listing_id, sent));
            self.append(
                AuditRecord::new(AuditAction::FollowUpSent, actor, now)
                    .listing(&listing_id)
                    .detail("packet", packet_id)
                    .detail("message", &message.id),
            )?;
        }

        let draft = FollowUpDraft {
            listing_id,
            packet_id: packet_id.clone(),
            thread_id,
            message_id: message.id,
            to: message.to,
            subject: message.subject,
            body: message.body,
            dispatched: mail.is_some(),
            next_follow_up,
        };
        Ok(Some((draft, mail)))
    }

    pub fn dispatch_draft(&self, message_id: &MessageId, actor: &Actor) -> Result<Message, DeskError> {
        let shared = self.by_message(message_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let message = self.commit(&mut record, |record| {
            let message = record.threads.dispatch_draft(message_id, now)?.clone();
            self.append(
                AuditRecord::new(AuditAction::DraftDispatched, actor, now)
                    .listing(&record.listing.id)
                    .detail("message", message_id)
                    .detail("to", &message.to),
            )?;
            Ok(message)
        })?;

        let listing_id = record.listing.id.clone();
        self.outbox
            .enqueue_mail(OutboundMail::from_message(&listing_id, &message));
        info!(listing = %listing_id, message = %message_id, "draft dispatched");
        Ok(message)
    }

    pub fn discard_draft(&self, message_id: &MessageId, actor: &Actor) -> Result<Message, DeskError> {
        let shared = self.by_message(message_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        let message = self.commit(&mut record, |record| {
            let message = record.threads.discard_draft(message_id)?;
            self.append(
                AuditRecord::new(AuditAction::DraftDiscarded, actor, now)
                    .listing(&record.listing.id)
                    .detail("message", message_id),
            )?;
            Ok(message)
        })?;

        self.routes
            .write()
            .expect("route index poisoned")
            .messages
            .remove(message_id);
        Ok(message)
    }

    /// Delivery report from the mail dispatcher.
    pub fn record_delivery(
        &self,
        message_id: &MessageId,
        outcome: DeliveryOutcome,
    ) -> Result<(), DeskError> {
        let shared = self.by_message(message_id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();
        let actor = Actor::agent(DISPATCH_ACTOR);
        let listing_id = record.listing.id.clone();

        let audit = match &outcome {
            DeliveryOutcome::Delivered { external_id } => {
                AuditRecord::new(AuditAction::MessageDelivered, &actor, now)
                    .detail("external_id", external_id)
            }
            DeliveryOutcome::Failed { reason } => {
                warn!(listing = %listing_id, message = %message_id, %reason, "mail delivery failed");
                AuditRecord::new(AuditAction::DeliveryFailed, &actor, now).detail("reason", reason)
            }
        };
        let status = match outcome {
            DeliveryOutcome::Delivered { external_id } => DeliveryStatus::Delivered { external_id },
            DeliveryOutcome::Failed { reason } => DeliveryStatus::Failed { reason },
        };

        self.commit(&mut record, |record| {
            record.threads.record_delivery(message_id, status)?;
            self.append(
                audit
                    .listing(&listing_id)
                    .detail("message", message_id),
            )?;
            Ok(())
        })
    }

    // ---- publication ---------------------------------------------------------

    pub fn publish(
        &self,
        id: &ListingId,
        platforms: &[Platform],
        actor: &Actor,
    ) -> Result<Vec<Publication>, DeskError> {
        if platforms.is_empty() {
            return Err(DeskError::Validation(
                "publish needs at least one platform".to_string(),
            ));
        }

        let shared = self.shared(id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();

        if record.listing.state < WorkflowState::Published {
            return Err(DeskError::InvalidState(format!(
                "listing is in {}; publishing is allowed from {} on",
                record.listing.state,
                WorkflowState::Published
            )));
        }

        let (requested, commands) = self.commit(&mut record, |record| {
            let ListingRecord {
                listing,
                checklist,
                publications,
                ..
            } = record;

            let unique: BTreeSet<Platform> = platforms.iter().copied().collect();
            let mut requested = Vec::new();
            let mut commands = Vec::new();
            for platform in unique {
                if publications.get(&platform).is_some_and(Publication::is_live) {
                    debug!(listing = %listing.id, %platform, "already live, skipping");
                    continue;
                }
                let publication = publications.entry(platform).or_insert(Publication {
                    platform,
                    status: PublicationStatus::Pending,
                    requested_at: now,
                    updated_at: now,
                    attempts: 0,
                });
                publication.status = PublicationStatus::Pending;
                publication.updated_at = now;
                publication.attempts += 1;

                self.append(
                    AuditRecord::new(AuditAction::PublishRequested, actor, now)
                        .listing(&listing.id)
                        .detail("platform", platform.as_str()),
                )?;
                requested.push(publication.clone());
                commands.push(PublishCommand {
                    listing_id: listing.id.clone(),
                    platform,
                    title: listing.title.clone(),
                });
            }

            if let Some(first) = requested.first() {
                let milestone = checklist.get(PORTAL_MILESTONE).map(|item| item.status);
                if milestone == Some(ChecklistStatus::Missing) {
                    let transition = move_item(
                        checklist,
                        PORTAL_MILESTONE,
                        ChecklistStatus::Requested,
                        StatusSource::Publication {
                            platform: first.platform,
                        },
                        now,
                    );
                    if let Some(transition) = &transition {
                        self.audit_transition(&listing.id, transition, actor, now)?;
                    }
                }
            }
            Ok((requested, commands))
        })?;

        for command in commands {
            self.outbox.enqueue_publish(command);
        }
        if !requested.is_empty() {
            info!(listing = %id, platforms = requested.len(), "publication requested");
        }
        Ok(requested)
    }

    /// Gateway callback for one platform.
    pub fn on_publish_result(
        &self,
        id: &ListingId,
        platform: Platform,
        result: PublishResult,
    ) -> Result<Publication, DeskError> {
        let shared = self.shared(id)?;
        let mut record = lock(&shared);
        let now = self.clock.now();
        let actor = Actor::agent(PORTAL_ACTOR);

        self.commit(&mut record, |record| {
            let ListingRecord {
                listing,
                checklist,
                publications,
                ..
            } = record;

            let publication = publications
                .get_mut(&platform)
                .ok_or_else(|| DeskError::UnknownRoute {
                    kind: "publication",
                    id: format!("{}/{}", listing.id, platform.as_str()),
                })?;
            publication.updated_at = now;

            if result.ok {
                publication.status = PublicationStatus::Live {
                    external_ref: result.external_ref.clone(),
                };
                let publication = publication.clone();

                let mut audit = AuditRecord::new(AuditAction::PublishSucceeded, &actor, now)
                    .listing(&listing.id)
                    .detail("platform", platform.as_str());
                if let Some(reference) = &result.external_ref {
                    audit = audit.detail("external_ref", reference);
                }
                self.append(audit)?;

                let milestone = checklist.get(PORTAL_MILESTONE).map(|item| item.status);
                if milestone.is_some_and(|status| status < ChecklistStatus::Received) {
                    let transition = move_item(
                        checklist,
                        PORTAL_MILESTONE,
                        ChecklistStatus::Received,
                        StatusSource::Publication { platform },
                        now,
                    );
                    if let Some(transition) = &transition {
                        self.audit_transition(&listing.id, transition, &actor, now)?;
                    }
                }
                info!(listing = %listing.id, %platform, "listing live");
                Ok(publication)
            } else {
                let error = result
                    .error
                    .clone()
                    .filter(|error| !error.trim().is_empty())
                    .unwrap_or_else(|| "unspecified gateway error".to_string());
                publication.status = PublicationStatus::Failed {
                    error: error.clone(),
                };
                let publication = publication.clone();
                self.append(
                    AuditRecord::new(AuditAction::PublishFailed, &actor, now)
                        .listing(&listing.id)
                        .detail("platform", platform.as_str())
                        .detail("error", &error),
                )?;
                warn!(listing = %listing.id, %platform, %error, "publication failed");
                Ok(publication)
            }
        })
    }

    // ---- audit -----------------------------------------------------------------

    pub fn audit_trail(
        &self,
        id: Option<&ListingId>,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, DeskError> {
        if let Some(id) = id {
            self.shared(id)?;
        }
        Ok(self.audit.query(id, filter)?)
    }

    // ---- internals ---------------------------------------------------------------

    fn evaluate(&self, record: &ListingRecord) -> GateCheck {
        self.engine
            .evaluate(record.listing.state, &record.checklist, &record.overrides)
    }

    fn view_of(&self, record: &ListingRecord) -> ListingView {
        record.view(self.evaluate(record))
    }

    fn append(&self, record: AuditRecord) -> Result<AuditEntry, DeskError> {
        Ok(self.audit.append(record)?)
    }

    fn audit_transition(
        &self,
        listing_id: &ListingId,
        transition: &ChecklistTransition,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), DeskError> {
        let action = if transition.is_rejection() {
            AuditAction::ChecklistItemRejected
        } else {
            AuditAction::ChecklistStatusChanged
        };
        self.append(
            AuditRecord::new(action, actor, now)
                .listing(listing_id)
                .detail("item", &transition.item)
                .detail("from", transition.from)
                .detail("to", transition.to)
                .detail("source", transition.source.describe()),
        )?;
        Ok(())
    }

    fn audit_exception(
        &self,
        exception: &ExceptionRecord,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), DeskError> {
        self.append(
            AuditRecord::new(AuditAction::ExceptionRaised, actor, now)
                .listing(&exception.listing_id)
                .detail("exception", &exception.id)
                .detail("kind", exception.kind.code())
                .detail("thread", &exception.thread_id)
                .detail("description", &exception.description),
        )?;
        warn!(listing = %exception.listing_id, exception = %exception.id, kind = exception.kind.code(), "exception raised");
        Ok(())
    }

    fn shared(&self, id: &ListingId) -> Result<SharedRecord, DeskError> {
        self.listings
            .read()
            .expect("listing index poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| DeskError::ListingNotFound(id.clone()))
    }

    fn routed(
        &self,
        kind: &'static str,
        id: &str,
        listing: Option<ListingId>,
    ) -> Result<SharedRecord, DeskError> {
        let listing = listing.ok_or_else(|| DeskError::UnknownRoute {
            kind,
            id: id.to_string(),
        })?;
        self.shared(&listing)
    }

    fn by_packet(&self, id: &PacketId) -> Result<SharedRecord, DeskError> {
        let listing = self
            .routes
            .read()
            .expect("route index poisoned")
            .packets
            .get(id)
            .cloned();
        self.routed("packet", &id.0, listing)
    }

    fn by_thread(&self, id: &ThreadId) -> Result<SharedRecord, DeskError> {
        let listing = self
            .routes
            .read()
            .expect("route index poisoned")
            .threads
            .get(id)
            .cloned();
        self.routed("thread", &id.0, listing)
    }

    fn by_message(&self, id: &MessageId) -> Result<SharedRecord, DeskError> {
        let listing = self
            .routes
            .read()
            .expect("route index poisoned")
            .messages
            .get(id)
            .cloned();
        self.routed("message", &id.0, listing)
    }

    fn by_exception(&self, id: &ExceptionId) -> Result<SharedRecord, DeskError> {
        let listing = self
            .routes
            .read()
            .expect("route index poisoned")
            .exceptions
            .get(id)
            .cloned();
        self.routed("exception", &id.0, listing)
    }

    /// Run `change` against `record` and persist the result. On any error,
    /// from the change itself, the audit log or the store, the record is put
    /// back as it was.
    fn commit<T>(
        &self,
        record: &mut ListingRecord,
        change: impl FnOnce(&mut ListingRecord) -> Result<T, DeskError>,
    ) -> Result<T, DeskError> {
        let before = record.clone();
        let outcome = change(&mut *record).and_then(|value| {
            self.store.save(record)?;
            Ok(value)
        });
        if outcome.is_err() {
            *record = before;
        }
        outcome
    }

    fn observe_audited_ids(&self) {
        match self.audit.query(None, &AuditFilter::default()) {
            Ok(entries) => {
                for entry in &entries {
                    if let Some(listing) = &entry.listing_id {
                        self.ids.observe(&listing.0);
                    }
                    for value in entry.details.values() {
                        self.ids.observe(value);
                    }
                }
                if !entries.is_empty() {
                    debug!(entries = entries.len(), "id sequence seeded from audit log");
                }
            }
            Err(err) => warn!(error = %err, "could not seed ids from the audit log"),
        }
    }

    fn restore(&mut self, record: ListingRecord) {
        let listing_id = record.listing.id.clone();
        self.ids.observe(&listing_id.0);

        let routes = self.routes.get_mut().expect("route index poisoned");
        for packet in record.requests.packets() {
            self.ids.observe(&packet.id.0);
            routes.packets.insert(packet.id.clone(), listing_id.clone());
        }
        for thread in record.threads.threads() {
            self.ids.observe(&thread.id.0);
            routes.threads.insert(thread.id.clone(), listing_id.clone());
            for message in &thread.messages {
                self.ids.observe(&message.id.0);
                routes.messages.insert(message.id.clone(), listing_id.clone());
                for attachment in &message.attachments {
                    self.ids.observe(&attachment.id.0);
                }
            }
        }
        for exception in record.threads.exceptions() {
            self.ids.observe(&exception.id.0);
            routes
                .exceptions
                .insert(exception.id.clone(), listing_id.clone());
        }

        self.listings
            .get_mut()
            .expect("listing index poisoned")
            .insert(listing_id, Arc::new(Mutex::new(record)));
    }
}

fn request_body(holder: &Holder, listing: &Listing, items: &[String]) -> String {
    let mut body = format!(
        "Guten Tag {},\n\nfür die Vermarktung des Objekts \"{}\" benötigen wir folgende Unterlagen:\n",
        holder.name, listing.title
    );
    for item in items {
        body.push_str(&format!("- {item}\n"));
    }
    body.push_str("\nBitte senden Sie die Dokumente als Antwort auf diese E-Mail.\n\nVielen Dank und freundliche Grüße");
    body
}
