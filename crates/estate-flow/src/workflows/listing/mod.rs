//! Listing lifecycle: workflow states, checklist evidence and the gate engine.

pub mod blueprint;
pub mod checklist;
pub mod domain;
pub mod gate;

pub use blueprint::{GateBlueprint, GateRequirement, GateTemplate, ItemTemplate, PORTAL_MILESTONE};
pub use checklist::{
    ChecklistError, ChecklistItem, ChecklistStore, ChecklistTransition, StatusSource,
};
pub use domain::{
    Actor, ActorKind, ChecklistStatus, HolderRole, ItemCategory, Listing, ListingId,
    WorkflowState,
};
pub use gate::{GateCheck, GateEngine, GateError, GateOverride, Shortfall, UnmetGate};
