use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::blueprint::{GateBlueprint, GateRequirement, GateTemplate};
use super::checklist::ChecklistStore;
use super::domain::{Actor, ChecklistStatus, ItemCategory, Listing, WorkflowState};

/// Why a single gate does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shortfall {
    Item {
        item: String,
        status: Option<ChecklistStatus>,
        required: ChecklistStatus,
    },
    Count {
        category: ItemCategory,
        present: usize,
        required: usize,
    },
}

impl Shortfall {
    pub fn describe(&self) -> String {
        match self {
            Shortfall::Item {
                item,
                status: Some(status),
                required,
            } => format!("{item} is {status}, needs {required}"),
            Shortfall::Item {
                item,
                status: None,
                ..
            } => format!("{item} is not on the checklist"),
            Shortfall::Count {
                category,
                present,
                required,
            } => format!(
                "{present} of {required} {} item(s) received",
                category.label().to_lowercase()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmetGate {
    pub gate: &'static str,
    pub label: &'static str,
    pub shortfalls: Vec<Shortfall>,
}

impl UnmetGate {
    pub fn describe(&self) -> String {
        let reasons: Vec<String> = self.shortfalls.iter().map(Shortfall::describe).collect();
        format!("{} ({})", self.label, reasons.join("; "))
    }
}

/// Result of evaluating the gates of the next state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateCheck {
    pub current: WorkflowState,
    pub target: Option<WorkflowState>,
    pub unmet: Vec<UnmetGate>,
}

impl GateCheck {
    pub fn can_advance(&self) -> bool {
        self.target.is_some() && self.unmet.is_empty()
    }
}

/// A manual, audited bypass of one gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOverride {
    pub gate: String,
    pub state: WorkflowState,
    pub reason: String,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("cannot enter {target}: {} gate(s) unmet", .unmet.len())]
    GateNotMet {
        target: WorkflowState,
        unmet: Vec<UnmetGate>,
    },
    #[error("listing is already in the final state {0}")]
    FinalState(WorkflowState),
    #[error("gate '{0}' is not part of the workflow blueprint")]
    UnknownGate(String),
    #[error("a gate override requires a non-empty reason")]
    EmptyReason,
}

/// Evaluates gates and performs the single-step state transition.
#[derive(Debug, Clone)]
pub struct GateEngine {
    blueprint: Arc<GateBlueprint>,
}

impl GateEngine {
    pub fn new(blueprint: Arc<GateBlueprint>) -> Self {
        Self { blueprint }
    }

    pub fn blueprint(&self) -> &GateBlueprint {
        &self.blueprint
    }

    pub fn evaluate(
        &self,
        current: WorkflowState,
        checklist: &ChecklistStore,
        overrides: &[GateOverride],
    ) -> GateCheck {
        let Some(target) = current.next() else {
            return GateCheck {
                current,
                target: None,
                unmet: Vec::new(),
            };
        };

        let unmet = self
            .blueprint
            .gates_for(target)
            .into_iter()
            .filter(|gate| !overrides.iter().any(|entry| entry.gate == gate.key))
            .filter_map(|gate| {
                let shortfalls = shortfalls_for(gate, checklist);
                (!shortfalls.is_empty()).then(|| UnmetGate {
                    gate: gate.key,
                    label: gate.label,
                    shortfalls,
                })
            })
            .collect();

        GateCheck {
            current,
            target: Some(target),
            unmet,
        }
    }

    /// Move `listing` exactly one state forward when every gate holds.
    pub fn advance(
        &self,
        listing: &mut Listing,
        checklist: &ChecklistStore,
        overrides: &[GateOverride],
    ) -> Result<WorkflowState, GateError> {
        let check = self.evaluate(listing.state, checklist, overrides);
        let target = check.target.ok_or(GateError::FinalState(listing.state))?;

        if !check.unmet.is_empty() {
            return Err(GateError::GateNotMet {
                target,
                unmet: check.unmet,
            });
        }

        listing.state = target;
        Ok(target)
    }

    pub fn record_override(
        &self,
        gate_key: &str,
        reason: &str,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<GateOverride, GateError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(GateError::EmptyReason);
        }

        let gate = self
            .blueprint
            .gate(gate_key)
            .ok_or_else(|| GateError::UnknownGate(gate_key.to_string()))?;

        Ok(GateOverride {
            gate: gate.key.to_string(),
            state: gate.state,
            reason: reason.to_string(),
            actor,
            at: now,
        })
    }
}

fn shortfalls_for(gate: &GateTemplate, checklist: &ChecklistStore) -> Vec<Shortfall> {
    let floor = gate.requirement.floor();
    match &gate.requirement {
        GateRequirement::AllVerified { items } | GateRequirement::AllReceived { items } => items
            .iter()
            .filter_map(|name| match checklist.get(name) {
                Some(item) if item.status.at_least(floor) => None,
                Some(item) => Some(Shortfall::Item {
                    item: item.name.clone(),
                    status: Some(item.status),
                    required: floor,
                }),
                None => Some(Shortfall::Item {
                    item: name.to_string(),
                    status: None,
                    required: floor,
                }),
            })
            .collect(),
        GateRequirement::MinimumReceived { category, minimum } => {
            let present = checklist.count_at_least(*category, floor);
            if present >= *minimum {
                Vec::new()
            } else {
                vec![Shortfall::Count {
                    category: *category,
                    present,
                    required: *minimum,
                }]
            }
        }
    }
}
