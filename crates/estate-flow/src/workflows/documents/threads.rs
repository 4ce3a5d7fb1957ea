use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::detector::ExceptionDetector;
use super::domain::{
    Attachment, DeliveryStatus, Direction, ExceptionId, ExceptionKind, ExceptionRecord, Message,
    MessageId, Resolution, Thread, ThreadId, ThreadStatus,
};
use crate::workflows::ids::IdSequence;

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error("thread '{0}' not found")]
    NotFound(ThreadId),
    #[error("message '{0}' not found")]
    MessageNotFound(MessageId),
    #[error("exception '{0}' not found")]
    ExceptionNotFound(ExceptionId),
    #[error("exception '{0}' is already resolved")]
    AlreadyResolved(ExceptionId),
    #[error("message '{0}' is not a draft")]
    NotADraft(MessageId),
    #[error("message '{0}' is not an outgoing message")]
    NotOutgoing(MessageId),
}

/// Reply threads and the exceptions raised on them, for one listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadStore {
    threads: BTreeMap<ThreadId, Thread>,
    exceptions: Vec<ExceptionRecord>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, thread: Thread) -> &Thread {
        let id = thread.id.clone();
        self.threads.entry(id).or_insert(thread)
    }

    pub fn get(&self, id: &ThreadId) -> Result<&Thread, ThreadError> {
        self.threads
            .get(id)
            .ok_or_else(|| ThreadError::NotFound(id.clone()))
    }

    fn get_mut(&mut self, id: &ThreadId) -> Result<&mut Thread, ThreadError> {
        self.threads
            .get_mut(id)
            .ok_or_else(|| ThreadError::NotFound(id.clone()))
    }

    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    /// Append an outgoing message. Non-draft messages start with a pending
    /// delivery.
    pub fn push_outgoing(&mut self, message: Message) -> Result<&Message, ThreadError> {
        let thread = self.get_mut(&message.thread_id)?;
        if !message.is_draft {
            thread
                .deliveries
                .insert(message.id.clone(), DeliveryStatus::Pending);
        }
        thread.messages.push(message);
        Ok(thread
            .messages
            .last()
            .expect("message was just pushed onto the thread"))
    }

    /// Append a holder reply. Replies without attachments are screened for
    /// exceptions; one record is raised per detected condition.
    pub fn append_incoming(
        &mut self,
        message: Message,
        detector: &ExceptionDetector,
        ids: &IdSequence,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExceptionRecord>, ThreadError> {
        let thread = self.get_mut(&message.thread_id)?;

        let kinds = if message.attachments.is_empty() {
            detector.detect(&message.subject, &message.body, &message.from)
        } else {
            Vec::new()
        };

        let raised: Vec<ExceptionRecord> = kinds
            .into_iter()
            .map(|kind| ExceptionRecord {
                id: ids.exception(),
                listing_id: thread.listing_id.clone(),
                thread_id: thread.id.clone(),
                message_id: message.id.clone(),
                holder: thread.holder.clone(),
                description: kind.describe(&thread.holder),
                kind,
                raised_at: now,
                resolution: None,
            })
            .collect();

        thread.messages.push(message);
        self.exceptions.extend(raised.iter().cloned());
        Ok(raised)
    }

    /// Raise an exception found outside reply screening (document QA).
    pub fn raise(
        &mut self,
        thread_id: &ThreadId,
        message_id: &MessageId,
        kind: ExceptionKind,
        ids: &IdSequence,
        now: DateTime<Utc>,
    ) -> Result<ExceptionRecord, ThreadError> {
        let thread = self.get(thread_id)?;
        let record = ExceptionRecord {
            id: ids.exception(),
            listing_id: thread.listing_id.clone(),
            thread_id: thread.id.clone(),
            message_id: message_id.clone(),
            holder: thread.holder.clone(),
            description: kind.describe(&thread.holder),
            kind,
            raised_at: now,
            resolution: None,
        };
        self.exceptions.push(record.clone());
        Ok(record)
    }

    pub fn resolve(
        &mut self,
        id: &ExceptionId,
        resolution: Resolution,
    ) -> Result<&ExceptionRecord, ThreadError> {
        let record = self
            .exceptions
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| ThreadError::ExceptionNotFound(id.clone()))?;
        if record.is_resolved() {
            return Err(ThreadError::AlreadyResolved(id.clone()));
        }
        record.resolution = Some(resolution);
        Ok(record)
    }

    pub fn exceptions(&self) -> &[ExceptionRecord] {
        &self.exceptions
    }

    pub fn unresolved(&self, thread_id: &ThreadId) -> impl Iterator<Item = &ExceptionRecord> {
        let thread_id = thread_id.clone();
        self.exceptions
            .iter()
            .filter(move |record| record.thread_id == thread_id && !record.is_resolved())
    }

    /// Derived thread status. `packet_complete` comes from the owning packet.
    pub fn status(&self, id: &ThreadId, packet_complete: bool) -> Result<ThreadStatus, ThreadError> {
        let thread = self.get(id)?;
        if self.unresolved(id).next().is_some() {
            return Ok(ThreadStatus::Blocked);
        }
        if packet_complete {
            return Ok(ThreadStatus::Complete);
        }
        let active = thread.latest_sent().is_some_and(|message| {
            message.direction == Direction::Incoming && !message.attachments.is_empty()
        });
        Ok(if active {
            ThreadStatus::Active
        } else {
            ThreadStatus::Waiting
        })
    }

    pub fn message(&self, id: &MessageId) -> Result<&Message, ThreadError> {
        self.threads
            .values()
            .flat_map(|thread| thread.messages.iter())
            .find(|message| &message.id == id)
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))
    }

    pub fn attachments_mut(&mut self, id: &MessageId) -> Result<&mut Vec<Attachment>, ThreadError> {
        self.threads
            .values_mut()
            .flat_map(|thread| thread.messages.iter_mut())
            .find(|message| &message.id == id)
            .map(|message| &mut message.attachments)
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))
    }

    /// Flip a draft to sent. The message keeps its position in the thread.
    pub fn dispatch_draft(
        &mut self,
        id: &MessageId,
        now: DateTime<Utc>,
    ) -> Result<&Message, ThreadError> {
        let thread = self
            .threads
            .values_mut()
            .find(|thread| thread.messages.iter().any(|message| &message.id == id))
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))?;
        let position = thread
            .messages
            .iter()
            .position(|message| &message.id == id)
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))?;

        if !thread.messages[position].is_draft {
            return Err(ThreadError::NotADraft(id.clone()));
        }

        thread.deliveries.insert(id.clone(), DeliveryStatus::Pending);
        let message = &mut thread.messages[position];
        message.is_draft = false;
        message.at = now;
        Ok(message)
    }

    /// Drop a draft that was never dispatched.
    pub fn discard_draft(&mut self, id: &MessageId) -> Result<Message, ThreadError> {
        let thread = self
            .threads
            .values_mut()
            .find(|thread| thread.messages.iter().any(|message| &message.id == id))
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))?;
        let position = thread
            .messages
            .iter()
            .position(|message| &message.id == id)
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))?;

        if !thread.messages[position].is_draft {
            return Err(ThreadError::NotADraft(id.clone()));
        }
        Ok(thread.messages.remove(position))
    }

    pub fn record_delivery(
        &mut self,
        id: &MessageId,
        status: DeliveryStatus,
    ) -> Result<&Thread, ThreadError> {
        let thread = self
            .threads
            .values_mut()
            .find(|thread| thread.messages.iter().any(|message| &message.id == id))
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))?;
        let message = thread
            .messages
            .iter()
            .find(|message| &message.id == id)
            .ok_or_else(|| ThreadError::MessageNotFound(id.clone()))?;
        if message.direction != Direction::Outgoing || message.is_draft {
            return Err(ThreadError::NotOutgoing(id.clone()));
        }
        thread.deliveries.insert(id.clone(), status);
        Ok(thread)
    }
}
