use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cadence::FollowUpCadence;
use crate::workflows::listing::{Actor, HolderRole, ListingId};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of an outbound request packet.
    PacketId
);
string_id!(
    /// Identifier of a reply thread.
    ThreadId
);
string_id!(MessageId);
string_id!(AttachmentId);
string_id!(ExceptionId);

/// External party asked for documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub role: HolderRole,
    pub name: String,
    pub email: String,
    /// Overrides the workspace cadence for this holder.
    #[serde(default)]
    pub cadence: Option<FollowUpCadence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub filename: String,
    pub declared_type: String,
    pub size: u64,
    pub classified: bool,
    pub ingested: bool,
    /// Checklist item the attachment was matched to during classification.
    pub resolved_type: Option<String>,
    /// Set once document QA has produced a verdict.
    pub reviewed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub direction: Direction,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    pub is_follow_up: bool,
    pub is_draft: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered { external_id: String },
    Failed { reason: String },
}

impl DeliveryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "delivery pending",
            DeliveryStatus::Delivered { .. } => "delivered",
            DeliveryStatus::Failed { .. } => "delivery failed - retry",
        }
    }
}

/// Conversation backing a request packet, or an ad-hoc conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub listing_id: ListingId,
    pub packet_id: Option<PacketId>,
    pub holder: Holder,
    pub messages: Vec<Message>,
    pub deliveries: BTreeMap<MessageId, DeliveryStatus>,
}

impl Thread {
    /// Latest message that actually left or reached the mailbox.
    pub fn latest_sent(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|message| !message.is_draft)
    }

    pub fn has_incoming_attachments(&self) -> bool {
        self.messages
            .iter()
            .any(|message| message.direction == Direction::Incoming && !message.attachments.is_empty())
    }

    pub fn first_subject(&self) -> Option<&str> {
        self.messages.first().map(|message| message.subject.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Waiting,
    Active,
    Blocked,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketStatus {
    NotStarted,
    Sent,
    Waiting,
    Complete,
}

/// Anomaly detected in a holder's reply or returned evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExceptionKind {
    PowerOfAttorneyRequired,
    FeeRequired { amount: Option<String> },
    Reroute { suggested_contact: Option<String> },
    WrongDocument { filename: String, expected: String },
    MissingPages { filename: String, expected: String },
}

impl ExceptionKind {
    pub fn code(&self) -> &'static str {
        match self {
            ExceptionKind::PowerOfAttorneyRequired => "power_of_attorney_required",
            ExceptionKind::FeeRequired { .. } => "fee_required",
            ExceptionKind::Reroute { .. } => "reroute",
            ExceptionKind::WrongDocument { .. } => "wrong_document",
            ExceptionKind::MissingPages { .. } => "missing_pages",
        }
    }

    /// Human-readable explanation with the action the operator should take.
    pub fn describe(&self, holder: &Holder) -> String {
        match self {
            ExceptionKind::PowerOfAttorneyRequired => format!(
                "{} requires a power of attorney from the owner before releasing documents",
                holder.name
            ),
            ExceptionKind::FeeRequired { amount: Some(amount) } => format!(
                "{} charges a fee of {amount}; approve payment or ask the seller to pay",
                holder.name
            ),
            ExceptionKind::FeeRequired { amount: None } => format!(
                "{} charges a fee for the documents; clarify amount and payer",
                holder.name
            ),
            ExceptionKind::Reroute {
                suggested_contact: Some(contact),
            } => format!(
                "{} is not responsible; request should go to {contact}",
                holder.name
            ),
            ExceptionKind::Reroute {
                suggested_contact: None,
            } => format!(
                "{} redirected the request to another party; identify the right holder",
                holder.name
            ),
            ExceptionKind::WrongDocument { filename, expected } => {
                format!("{filename} is not a usable {expected}; request the correct document")
            }
            ExceptionKind::MissingPages { filename, expected } => {
                format!("{filename} looks incomplete for {expected}; request all pages")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: String,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub id: ExceptionId,
    pub listing_id: ListingId,
    pub thread_id: ThreadId,
    pub message_id: MessageId,
    pub holder: Holder,
    pub kind: ExceptionKind,
    pub description: String,
    pub raised_at: DateTime<Utc>,
    pub resolution: Option<Resolution>,
}

impl ExceptionRecord {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Attachment as delivered by a mailbox connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundAttachment {
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Normalized reply handed over by a mailbox connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub thread_id: ThreadId,
    pub from: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

/// Mail composed by the core and handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMail {
    pub listing_id: ListingId,
    pub thread_id: ThreadId,
    pub message_id: MessageId,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutboundMail {
    pub fn from_message(listing_id: &ListingId, message: &Message) -> Self {
        Self {
            listing_id: listing_id.clone(),
            thread_id: message.thread_id.clone(),
            message_id: message.id.clone(),
            to: message.to.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
        }
    }
}

/// Domain part of an address, lowercased.
pub fn email_domain(address: &str) -> Option<String> {
    let trimmed = address.trim().trim_matches(|c| c == '<' || c == '>');
    trimmed
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
}
