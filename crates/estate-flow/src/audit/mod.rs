//! Append-only audit trail of every state-changing action.
//!
//! Entries are never updated or deleted. The in-memory log backs tests and
//! the demo; the JSON-lines log persists one entry per line and replays the
//! file when opened.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::listing::{Actor, ActorKind, ListingId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ListingCreated,
    ChecklistItemAdded,
    ChecklistStatusChanged,
    ChecklistItemRejected,
    StateAdvanced,
    AdvanceDeclined,
    GateOverridden,
    PacketCreated,
    PacketSent,
    FollowUpsPaused,
    FollowUpsResumed,
    ReplyReceived,
    ExceptionRaised,
    ExceptionResolved,
    AttachmentsIngested,
    DocumentVerified,
    FollowUpDrafted,
    FollowUpSent,
    DraftDispatched,
    DraftDiscarded,
    MessageDelivered,
    DeliveryFailed,
    PublishRequested,
    PublishSucceeded,
    PublishFailed,
}

impl AuditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListingCreated => "listing_created",
            Self::ChecklistItemAdded => "checklist_item_added",
            Self::ChecklistStatusChanged => "checklist_status_changed",
            Self::ChecklistItemRejected => "checklist_item_rejected",
            Self::StateAdvanced => "state_advanced",
            Self::AdvanceDeclined => "advance_declined",
            Self::GateOverridden => "gate_overridden",
            Self::PacketCreated => "packet_created",
            Self::PacketSent => "packet_sent",
            Self::FollowUpsPaused => "follow_ups_paused",
            Self::FollowUpsResumed => "follow_ups_resumed",
            Self::ReplyReceived => "reply_received",
            Self::ExceptionRaised => "exception_raised",
            Self::ExceptionResolved => "exception_resolved",
            Self::AttachmentsIngested => "attachments_ingested",
            Self::DocumentVerified => "document_verified",
            Self::FollowUpDrafted => "follow_up_drafted",
            Self::FollowUpSent => "follow_up_sent",
            Self::DraftDispatched => "draft_dispatched",
            Self::DraftDiscarded => "draft_discarded",
            Self::MessageDelivered => "message_delivered",
            Self::DeliveryFailed => "delivery_failed",
            Self::PublishRequested => "publish_requested",
            Self::PublishSucceeded => "publish_succeeded",
            Self::PublishFailed => "publish_failed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action about to be appended; the log assigns the sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub listing_id: Option<ListingId>,
    pub action: AuditAction,
    pub actor: Actor,
    pub at: DateTime<Utc>,
    pub details: BTreeMap<String, String>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, actor: &Actor, at: DateTime<Utc>) -> Self {
        Self {
            listing_id: None,
            action,
            actor: actor.clone(),
            at,
            details: BTreeMap::new(),
        }
    }

    pub fn listing(mut self, listing_id: &ListingId) -> Self {
        self.listing_id = Some(listing_id.clone());
        self
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub listing_id: Option<ListingId>,
    pub action: AuditAction,
    pub actor: String,
    pub actor_kind: ActorKind,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl AuditEntry {
    fn from_record(sequence: u64, record: AuditRecord) -> Self {
        Self {
            sequence,
            listing_id: record.listing_id,
            action: record.action,
            actor: record.actor.name,
            actor_kind: record.actor.kind,
            at: record.at,
            details: record.details,
        }
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

/// Read-side narrowing of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditFilter {
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub actor_kind: Option<ActorKind>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn action(action: AuditAction) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.action.map_or(true, |action| entry.action == action)
            && self.actor_kind.map_or(true, |kind| entry.actor_kind == kind)
            && self.since.map_or(true, |since| entry.at >= since)
            && self.until.map_or(true, |until| entry.at <= until)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode audit entry: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("corrupt audit log at line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write CSV export: {0}")]
    Csv(#[from] csv::Error),
}

/// Storage behind the audit trail. Implementations only ever append.
pub trait AuditLog: Send + Sync {
    fn append(&self, record: AuditRecord) -> Result<AuditEntry, AuditError>;

    /// Entries in append order, optionally restricted to one listing.
    fn query(
        &self,
        listing_id: Option<&ListingId>,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, AuditError>;
}

fn select(
    entries: &[AuditEntry],
    listing_id: Option<&ListingId>,
    filter: &AuditFilter,
) -> Vec<AuditEntry> {
    entries
        .iter()
        .filter(|entry| listing_id.map_or(true, |id| entry.listing_id.as_ref() == Some(id)))
        .filter(|entry| filter.matches(entry))
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        let mut entries = self.entries.lock().expect("audit mutex poisoned");
        let entry = AuditEntry::from_record(entries.len() as u64 + 1, record);
        entries.push(entry.clone());
        Ok(entry)
    }

    fn query(
        &self,
        listing_id: Option<&ListingId>,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.lock().expect("audit mutex poisoned");
        Ok(select(&entries, listing_id, filter))
    }
}

struct JsonLinesState {
    file: File,
    entries: Vec<AuditEntry>,
}

/// File-backed log, one serialized entry per line.
pub struct JsonLinesAuditLog {
    path: PathBuf,
    state: Mutex<JsonLinesState>,
}

impl fmt::Debug for JsonLinesAuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLinesAuditLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonLinesAuditLog {
    /// Open or create `path`, replaying existing entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let entries = match File::open(&path) {
            Ok(file) => read_json_lines(file)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(JsonLinesState { file, entries }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonLinesAuditLog {
    fn append(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        let mut state = self.state.lock().expect("audit mutex poisoned");
        let entry = AuditEntry::from_record(state.entries.len() as u64 + 1, record);

        let mut line = serde_json::to_string(&entry).map_err(AuditError::Encode)?;
        line.push('\n');
        state.file.write_all(line.as_bytes())?;
        state.file.flush()?;

        state.entries.push(entry.clone());
        Ok(entry)
    }

    fn query(
        &self,
        listing_id: Option<&ListingId>,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let state = self.state.lock().expect("audit mutex poisoned");
        Ok(select(&state.entries, listing_id, filter))
    }
}

/// Parse a JSON-lines audit file, skipping blank lines.
pub fn read_json_lines<R: Read>(reader: R) -> Result<Vec<AuditEntry>, AuditError> {
    let mut entries = Vec::new();
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|source| AuditError::Decode {
            line: index + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    sequence: u64,
    listing_id: &'a str,
    action: &'static str,
    actor: &'a str,
    actor_kind: ActorKind,
    at: String,
    details: String,
}

/// Write entries as CSV with a header row. Details are flattened to
/// `key=value` pairs separated by `; `.
pub fn export_csv<W: Write>(entries: &[AuditEntry], writer: W) -> Result<(), AuditError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in entries {
        let details = entry
            .details
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        csv_writer.serialize(CsvRow {
            sequence: entry.sequence,
            listing_id: entry
                .listing_id
                .as_ref()
                .map(|id| id.0.as_str())
                .unwrap_or_default(),
            action: entry.action.as_str(),
            actor: &entry.actor,
            actor_kind: entry.actor_kind,
            at: entry.at.to_rfc3339(),
            details,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
