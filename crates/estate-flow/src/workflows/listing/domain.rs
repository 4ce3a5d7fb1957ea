use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Mandate,
    Capture,
    Assets,
    Docs,
    Published,
    Inquiries,
    Viewings,
    Offer,
    Closing,
}

impl WorkflowState {
    pub const fn ordered() -> [Self; 9] {
        [
            Self::Mandate,
            Self::Capture,
            Self::Assets,
            Self::Docs,
            Self::Published,
            Self::Inquiries,
            Self::Viewings,
            Self::Offer,
            Self::Closing,
        ]
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The state directly after this one; `None` at the end of the line.
    pub fn next(self) -> Option<Self> {
        Self::ordered().get(self.index() + 1).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Mandate => "Mandate",
            Self::Capture => "Capture",
            Self::Assets => "Assets",
            Self::Docs => "Documents",
            Self::Published => "Published",
            Self::Inquiries => "Inquiries",
            Self::Viewings => "Viewings",
            Self::Offer => "Offer",
            Self::Closing => "Closing",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mandate => "mandate",
            Self::Capture => "capture",
            Self::Assets => "assets",
            Self::Docs => "docs",
            Self::Published => "published",
            Self::Inquiries => "inquiries",
            Self::Viewings => "viewings",
            Self::Offer => "offer",
            Self::Closing => "closing",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Document,
    Media,
    Milestone,
}

impl ItemCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Document => "Document",
            Self::Media => "Media",
            Self::Milestone => "Milestone",
        }
    }
}

/// Party that supplies or originates a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderRole {
    Seller,
    PropertyManagement,
    Notary,
    Authority,
    Agent,
    System,
}

impl HolderRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Seller => "Seller",
            Self::PropertyManagement => "Property Management",
            Self::Notary => "Notary",
            Self::Authority => "Authority",
            Self::Agent => "Agent",
            Self::System => "System",
        }
    }
}

/// Evidence status, ordered from least to most complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    Missing,
    Requested,
    Received,
    Verified,
}

impl ChecklistStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Requested => "requested",
            Self::Received => "received",
            Self::Verified => "verified",
        }
    }

    /// Forward moves are allowed, `verified` only from `received`, and the
    /// single regression is `received -> missing`.
    pub fn permits(self, next: Self) -> bool {
        match (self, next) {
            (Self::Received, Self::Missing) => true,
            (_, Self::Verified) => self == Self::Received,
            (current, next) => next > current,
        }
    }

    pub fn at_least(self, floor: Self) -> bool {
        self >= floor
    }
}

impl fmt::Display for ChecklistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    User,
    Agent,
}

/// Who performed an action: a named person or an automated agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub kind: ActorKind,
}

impl Actor {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActorKind::User,
        }
    }

    pub fn agent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActorKind::Agent,
        }
    }
}

/// The subject entity moving through the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
}
