use super::store::StoreError;
use crate::audit::AuditError;
use crate::workflows::documents::{RequestError, ThreadError};
use crate::workflows::listing::{ChecklistError, GateError, ListingId};

/// Error raised by the listing desk.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("listing '{0}' not found")]
    ListingNotFound(ListingId),
    #[error("{kind} '{id}' is not routed to any listing")]
    UnknownRoute { kind: &'static str, id: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Checklist(#[from] ChecklistError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Thread(#[from] ThreadError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Unavailable(String),
}

/// Coarse classification used by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeskErrorKind {
    NotFound,
    GateNotMet,
    Validation,
    Conflict,
    Storage,
    Unavailable,
}

impl DeskError {
    pub fn kind(&self) -> DeskErrorKind {
        use DeskErrorKind::*;

        match self {
            DeskError::ListingNotFound(_) | DeskError::UnknownRoute { .. } => NotFound,
            DeskError::Validation(_) => Validation,
            DeskError::InvalidState(_) => Conflict,
            DeskError::Checklist(err) => match err {
                ChecklistError::NotFound(_) => NotFound,
                ChecklistError::Duplicate(_) => Conflict,
                ChecklistError::InvalidTransition { .. } => Validation,
            },
            DeskError::Gate(err) => match err {
                GateError::GateNotMet { .. } => GateNotMet,
                GateError::FinalState(_) => Conflict,
                GateError::UnknownGate(_) | GateError::EmptyReason => Validation,
            },
            DeskError::Request(err) => match err {
                RequestError::NotFound(_) => NotFound,
                RequestError::AlreadySent(_) | RequestError::NotSent(_) => Conflict,
                RequestError::EmptyItemList(_)
                | RequestError::DeadlineRequired { .. }
                | RequestError::UnknownItem(_) => Validation,
            },
            DeskError::Thread(err) => match err {
                ThreadError::NotFound(_)
                | ThreadError::MessageNotFound(_)
                | ThreadError::ExceptionNotFound(_) => NotFound,
                ThreadError::AlreadyResolved(_)
                | ThreadError::NotADraft(_)
                | ThreadError::NotOutgoing(_) => Conflict,
            },
            DeskError::Audit(_) | DeskError::Store(_) => Storage,
            DeskError::Unavailable(_) => Unavailable,
        }
    }
}
