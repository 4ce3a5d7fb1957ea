use serde::Serialize;

use super::domain::{ChecklistStatus, HolderRole, ItemCategory, WorkflowState};

/// Milestone flipped to `received` once a portal confirms the listing is live.
pub const PORTAL_MILESTONE: &str = "Portal-Freischaltung";

#[derive(Debug, Clone, Serialize)]
pub struct ItemTemplate {
    pub name: &'static str,
    pub category: ItemCategory,
    pub holder: HolderRole,
}

/// Predicate a gate checks against the checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateRequirement {
    AllVerified { items: Vec<&'static str> },
    AllReceived { items: Vec<&'static str> },
    MinimumReceived { category: ItemCategory, minimum: usize },
}

impl GateRequirement {
    /// Lowest status each named item must reach.
    pub fn floor(&self) -> ChecklistStatus {
        match self {
            GateRequirement::AllVerified { .. } => ChecklistStatus::Verified,
            GateRequirement::AllReceived { .. } | GateRequirement::MinimumReceived { .. } => {
                ChecklistStatus::Received
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GateTemplate {
    pub key: &'static str,
    pub label: &'static str,
    pub state: WorkflowState,
    pub requirement: GateRequirement,
}

/// Checklist items and per-state gates a listing is evaluated against.
#[derive(Debug, Clone)]
pub struct GateBlueprint {
    items: Vec<ItemTemplate>,
    gates: Vec<GateTemplate>,
}

impl GateBlueprint {
    pub fn new(items: Vec<ItemTemplate>, gates: Vec<GateTemplate>) -> Self {
        Self { items, gates }
    }

    pub fn standard() -> Self {
        Self::new(standard_item_templates(), standard_gate_templates())
    }

    /// Gates guarding entry into `state`, in declaration order.
    pub fn gates_for(&self, state: WorkflowState) -> Vec<&GateTemplate> {
        self.gates.iter().filter(|gate| gate.state == state).collect()
    }

    pub fn gate(&self, key: &str) -> Option<&GateTemplate> {
        self.gates.iter().find(|gate| gate.key == key)
    }

    pub fn gate_templates(&self) -> &[GateTemplate] {
        &self.gates
    }

    pub fn item_templates(&self) -> &[ItemTemplate] {
        &self.items
    }
}

fn standard_item_templates() -> Vec<ItemTemplate> {
    use HolderRole::*;
    use ItemCategory::*;

    let item = |name, category, holder| ItemTemplate {
        name,
        category,
        holder,
    };

    vec![
        item("Maklerauftrag", Milestone, Agent),
        item("Objektaufnahme", Milestone, Agent),
        item("Titelbild", Media, Agent),
        item("Innenaufnahmen", Media, Agent),
        item("Grundriss", Media, Seller),
        item("Grundbuchauszug", Document, Seller),
        item("Energieausweis", Document, Seller),
        item("Teilungserklärung", Document, PropertyManagement),
        item("Eigentümerprotokolle", Document, PropertyManagement),
        item(PORTAL_MILESTONE, Milestone, System),
        item("Erstanfrage", Milestone, Agent),
        item("Besichtigungsprotokoll", Milestone, Agent),
        item("Reservierungsvereinbarung", Document, Seller),
        item("Kaufvertragsentwurf", Document, Notary),
    ]
}

fn standard_gate_templates() -> Vec<GateTemplate> {
    vec![
        GateTemplate {
            key: "mandate_signed",
            label: "Brokerage mandate signed",
            state: WorkflowState::Capture,
            requirement: GateRequirement::AllVerified {
                items: vec!["Maklerauftrag"],
            },
        },
        GateTemplate {
            key: "property_captured",
            label: "Property data captured on site",
            state: WorkflowState::Assets,
            requirement: GateRequirement::AllReceived {
                items: vec!["Objektaufnahme"],
            },
        },
        GateTemplate {
            key: "hero_photos_present",
            label: "Hero photos present",
            state: WorkflowState::Docs,
            requirement: GateRequirement::MinimumReceived {
                category: ItemCategory::Media,
                minimum: 3,
            },
        },
        GateTemplate {
            key: "minimum_document_pack",
            label: "Minimum document pack complete",
            state: WorkflowState::Published,
            requirement: GateRequirement::AllVerified {
                items: vec!["Grundbuchauszug", "Energieausweis"],
            },
        },
        GateTemplate {
            key: "portal_live",
            label: "Listing live on at least one portal",
            state: WorkflowState::Inquiries,
            requirement: GateRequirement::AllReceived {
                items: vec![PORTAL_MILESTONE],
            },
        },
        GateTemplate {
            key: "inquiry_logged",
            label: "First qualified inquiry logged",
            state: WorkflowState::Viewings,
            requirement: GateRequirement::AllReceived {
                items: vec!["Erstanfrage"],
            },
        },
        GateTemplate {
            key: "viewing_documented",
            label: "Viewing protocol on file",
            state: WorkflowState::Offer,
            requirement: GateRequirement::AllReceived {
                items: vec!["Besichtigungsprotokoll"],
            },
        },
        GateTemplate {
            key: "reservation_signed",
            label: "Reservation agreement verified",
            state: WorkflowState::Closing,
            requirement: GateRequirement::AllVerified {
                items: vec!["Reservierungsvereinbarung"],
            },
        },
        GateTemplate {
            key: "condominium_documents",
            label: "Condominium documents received",
            state: WorkflowState::Closing,
            requirement: GateRequirement::AllReceived {
                items: vec!["Teilungserklärung", "Eigentümerprotokolle"],
            },
        },
        GateTemplate {
            key: "contract_draft_received",
            label: "Notary contract draft received",
            state: WorkflowState::Closing,
            requirement: GateRequirement::AllReceived {
                items: vec!["Kaufvertragsentwurf"],
            },
        },
    ]
}
