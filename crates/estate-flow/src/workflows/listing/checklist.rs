use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::blueprint::ItemTemplate;
use super::domain::{ChecklistStatus, HolderRole, ItemCategory};
use crate::workflows::desk::Platform;
use crate::workflows::documents::{MessageId, PacketId};

/// One required piece of evidence for a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub name: String,
    pub category: ItemCategory,
    pub status: ChecklistStatus,
    pub holder: HolderRole,
    pub verified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// What caused a status change, carried into the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusSource {
    Manual,
    Request { packet: PacketId },
    Ingestion { message: MessageId },
    Qa { message: MessageId },
    Publication { platform: Platform },
}

impl StatusSource {
    pub fn describe(&self) -> String {
        match self {
            StatusSource::Manual => "manual update".to_string(),
            StatusSource::Request { packet } => format!("request packet {packet}"),
            StatusSource::Ingestion { message } => format!("ingested from message {message}"),
            StatusSource::Qa { message } => format!("document QA on message {message}"),
            StatusSource::Publication { platform } => {
                format!("publication on {}", platform.label())
            }
        }
    }
}

/// An applied status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistTransition {
    pub item: String,
    pub from: ChecklistStatus,
    pub to: ChecklistStatus,
    pub source: StatusSource,
}

impl ChecklistTransition {
    pub fn is_rejection(&self) -> bool {
        self.from == ChecklistStatus::Received && self.to == ChecklistStatus::Missing
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error("checklist item '{0}' not found")]
    NotFound(String),
    #[error("checklist item '{0}' already exists")]
    Duplicate(String),
    #[error("checklist item '{item}' cannot move from {from} to {to}")]
    InvalidTransition {
        item: String,
        from: ChecklistStatus,
        to: ChecklistStatus,
    },
}

/// Required evidence of a single listing, kept in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistStore {
    items: Vec<ChecklistItem>,
}

impl ChecklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_templates(templates: &[ItemTemplate], now: DateTime<Utc>) -> Self {
        let items = templates
            .iter()
            .map(|template| ChecklistItem {
                name: template.name.to_string(),
                category: template.category,
                status: ChecklistStatus::Missing,
                holder: template.holder,
                verified_at: None,
                updated_at: now,
            })
            .collect();

        Self { items }
    }

    pub fn add_item(
        &mut self,
        name: &str,
        category: ItemCategory,
        holder: HolderRole,
        now: DateTime<Utc>,
    ) -> Result<&ChecklistItem, ChecklistError> {
        if self.get(name).is_some() {
            return Err(ChecklistError::Duplicate(name.to_string()));
        }

        self.items.push(ChecklistItem {
            name: name.to_string(),
            category,
            status: ChecklistStatus::Missing,
            holder,
            verified_at: None,
            updated_at: now,
        });
        Ok(&self.items[self.items.len() - 1])
    }

    pub fn get(&self, name: &str) -> Option<&ChecklistItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn status(&self, name: &str) -> Result<ChecklistStatus, ChecklistError> {
        self.get(name)
            .map(|item| item.status)
            .ok_or_else(|| ChecklistError::NotFound(name.to_string()))
    }

    /// Move an item to `status`. Setting the current status again is a no-op
    /// and yields `None`.
    pub fn set_status(
        &mut self,
        name: &str,
        status: ChecklistStatus,
        source: StatusSource,
        now: DateTime<Utc>,
    ) -> Result<Option<ChecklistTransition>, ChecklistError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.name == name)
            .ok_or_else(|| ChecklistError::NotFound(name.to_string()))?;

        if item.status == status {
            return Ok(None);
        }

        if !item.status.permits(status) {
            return Err(ChecklistError::InvalidTransition {
                item: name.to_string(),
                from: item.status,
                to: status,
            });
        }

        let from = item.status;
        item.status = status;
        item.updated_at = now;
        item.verified_at = match status {
            ChecklistStatus::Verified => Some(now),
            _ => None,
        };

        Ok(Some(ChecklistTransition {
            item: name.to_string(),
            from,
            to: status,
            source,
        }))
    }

    /// Point-in-time copy of every item.
    pub fn snapshot(&self) -> Vec<ChecklistItem> {
        self.items.clone()
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name.as_str())
    }

    pub fn count_at_least(&self, category: ItemCategory, floor: ChecklistStatus) -> usize {
        self.items
            .iter()
            .filter(|item| item.category == category && item.status.at_least(floor))
            .count()
    }
}
