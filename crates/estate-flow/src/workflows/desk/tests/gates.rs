use super::common::*;

use crate::audit::{AuditAction, AuditFilter, AuditLog};
use crate::workflows::desk::{DeskError, DeskErrorKind, NewChecklistItem, NewListing};
use crate::workflows::listing::{
    ChecklistStatus, GateError, HolderRole, ItemCategory, Shortfall, WorkflowState,
};

#[test]
fn new_listing_starts_in_mandate_with_everything_missing() {
    let harness = harness();
    let view = harness
        .desk
        .create_listing(
            NewListing {
                title: "  Reihenhaus Pankow ".to_string(),
                initial_state: None,
            },
            &operator(),
        )
        .expect("listing created");

    assert_eq!(view.listing.title, "Reihenhaus Pankow");
    assert_eq!(view.listing.state, WorkflowState::Mandate);
    assert_eq!(view.listing.created_at, monday());
    assert!(view
        .checklist
        .iter()
        .all(|item| item.status == ChecklistStatus::Missing));
    assert_eq!(view.gate_check.target, Some(WorkflowState::Capture));
    assert_eq!(
        harness.actions(&view.listing.id),
        vec![AuditAction::ListingCreated]
    );
}

#[test]
fn blank_title_is_rejected() {
    let harness = harness();
    let err = harness
        .desk
        .create_listing(
            NewListing {
                title: "   ".to_string(),
                initial_state: None,
            },
            &operator(),
        )
        .expect_err("blank title");
    assert_eq!(err.kind(), DeskErrorKind::Validation);
    assert!(harness.audit.is_empty());
}

#[test]
fn declined_advance_is_audited_and_leaves_state_untouched() {
    let harness = harness();
    let id = listing(&harness);

    let err = harness
        .desk
        .advance(&id, &operator())
        .expect_err("mandate not signed");
    match err {
        DeskError::Gate(GateError::GateNotMet { target, unmet }) => {
            assert_eq!(target, WorkflowState::Capture);
            assert_eq!(unmet.len(), 1);
            assert_eq!(unmet[0].gate, "mandate_signed");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(
        harness.desk.listing(&id).expect("view").listing.state,
        WorkflowState::Mandate
    );
    let declined = harness
        .audit
        .query(Some(&id), &AuditFilter::action(AuditAction::AdvanceDeclined))
        .expect("query");
    assert_eq!(declined.len(), 1);
    assert_eq!(declined[0].detail("unmet_gates"), Some("mandate_signed"));
    assert_eq!(declined[0].detail("target"), Some("capture"));
}

#[test]
fn advance_moves_exactly_one_state() {
    let harness = harness();
    let id = listing(&harness);
    verify(&harness, &id, "Maklerauftrag");

    let state = harness.desk.advance(&id, &operator()).expect("gate holds");
    assert_eq!(state, WorkflowState::Capture);

    let advanced = harness
        .audit
        .query(Some(&id), &AuditFilter::action(AuditAction::StateAdvanced))
        .expect("query");
    assert_eq!(advanced.len(), 1);
    assert_eq!(advanced[0].detail("from"), Some("mandate"));
    assert_eq!(advanced[0].detail("to"), Some("capture"));
    assert_eq!(advanced[0].actor, "Lena Vogt");
}

#[test]
fn publishing_requires_both_core_documents_verified() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Docs);
    verify(&harness, &id, "Grundbuchauszug");
    harness
        .desk
        .set_item_status(&id, "Energieausweis", ChecklistStatus::Received, &operator())
        .expect("received");

    let check = harness.desk.can_advance(&id).expect("check");
    assert!(!check.can_advance());
    assert_eq!(check.unmet.len(), 1);
    assert_eq!(check.unmet[0].gate, "minimum_document_pack");
    assert_eq!(
        check.unmet[0].shortfalls,
        vec![Shortfall::Item {
            item: "Energieausweis".to_string(),
            status: Some(ChecklistStatus::Received),
            required: ChecklistStatus::Verified,
        }]
    );

    harness
        .desk
        .set_item_status(&id, "Energieausweis", ChecklistStatus::Verified, &operator())
        .expect("verified");
    assert_eq!(
        harness.desk.advance(&id, &operator()).expect("advance"),
        WorkflowState::Published
    );
}

#[test]
fn verified_is_only_reachable_from_received() {
    let harness = harness();
    let id = listing(&harness);

    let err = harness
        .desk
        .set_item_status(&id, "Maklerauftrag", ChecklistStatus::Verified, &operator())
        .expect_err("skip to verified");
    assert_eq!(err.kind(), DeskErrorKind::Validation);
    assert_eq!(harness.status_of(&id, "Maklerauftrag"), ChecklistStatus::Missing);
}

#[test]
fn repeating_the_current_status_is_a_silent_no_op() {
    let harness = harness();
    let id = listing(&harness);

    let first = harness
        .desk
        .set_item_status(&id, "Titelbild", ChecklistStatus::Received, &operator())
        .expect("update");
    let second = harness
        .desk
        .set_item_status(&id, "Titelbild", ChecklistStatus::Received, &operator())
        .expect("no-op");

    assert!(first.is_some());
    assert!(second.is_none());
    let changes = harness
        .audit
        .query(
            Some(&id),
            &AuditFilter::action(AuditAction::ChecklistStatusChanged),
        )
        .expect("query");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].detail("source"), Some("manual update"));
}

#[test]
fn override_bypasses_one_gate_and_stays_visible() {
    let harness = harness();
    let id = listing(&harness);

    let entry = harness
        .desk
        .override_gate(&id, "mandate_signed", "Mandat telefonisch bestätigt", &operator())
        .expect("override recorded");
    assert_eq!(entry.state, WorkflowState::Capture);

    assert_eq!(
        harness.desk.advance(&id, &operator()).expect("advance"),
        WorkflowState::Capture
    );

    let view = harness.desk.listing(&id).expect("view");
    assert_eq!(view.overrides.len(), 1);
    assert_eq!(view.overrides[0].reason, "Mandat telefonisch bestätigt");
    assert_eq!(view.overrides[0].actor, operator());
    // The bypassed item itself is untouched.
    assert_eq!(harness.status_of(&id, "Maklerauftrag"), ChecklistStatus::Missing);

    let overridden = harness
        .audit
        .query(Some(&id), &AuditFilter::action(AuditAction::GateOverridden))
        .expect("query");
    assert_eq!(overridden[0].detail("gate"), Some("mandate_signed"));
}

#[test]
fn override_rejects_bad_requests() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Capture);

    let empty = harness
        .desk
        .override_gate(&id, "property_captured", "  ", &operator())
        .expect_err("empty reason");
    assert!(matches!(empty, DeskError::Gate(GateError::EmptyReason)));

    let unknown = harness
        .desk
        .override_gate(&id, "moon_landing", "because", &operator())
        .expect_err("unknown gate");
    assert_eq!(unknown.kind(), DeskErrorKind::Validation);

    let passed = harness
        .desk
        .override_gate(&id, "mandate_signed", "late paperwork", &operator())
        .expect_err("gate already passed");
    assert_eq!(passed.kind(), DeskErrorKind::Conflict);

    harness
        .desk
        .override_gate(&id, "property_captured", "Aufnahme durch Kollegen", &operator())
        .expect("first override");
    let duplicate = harness
        .desk
        .override_gate(&id, "property_captured", "again", &operator())
        .expect_err("duplicate");
    assert_eq!(duplicate.kind(), DeskErrorKind::Conflict);
}

#[test]
fn final_state_cannot_advance() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Closing);

    let err = harness.desk.advance(&id, &operator()).expect_err("final");
    assert!(matches!(
        err,
        DeskError::Gate(GateError::FinalState(WorkflowState::Closing))
    ));
    assert!(harness.desk.can_advance(&id).expect("check").target.is_none());
}

#[test]
fn custom_items_count_towards_category_gates() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Assets);

    harness
        .desk
        .add_checklist_item(
            &id,
            NewChecklistItem {
                name: "Drohnenaufnahme".to_string(),
                category: ItemCategory::Media,
                holder: HolderRole::Agent,
            },
            &operator(),
        )
        .expect("item added");
    for item in ["Titelbild", "Innenaufnahmen", "Drohnenaufnahme"] {
        harness
            .desk
            .set_item_status(&id, item, ChecklistStatus::Received, &operator())
            .expect("received");
    }

    assert!(harness.desk.can_advance(&id).expect("check").can_advance());

    let duplicate = harness
        .desk
        .add_checklist_item(
            &id,
            NewChecklistItem {
                name: "Titelbild".to_string(),
                category: ItemCategory::Media,
                holder: HolderRole::Agent,
            },
            &operator(),
        )
        .expect_err("duplicate item");
    assert_eq!(duplicate.kind(), DeskErrorKind::Conflict);
}

#[test]
fn unknown_listing_is_not_found() {
    let harness = harness();
    let err = harness
        .desk
        .listing(&crate::workflows::listing::ListingId("lst-999999".to_string()))
        .expect_err("unknown");
    assert_eq!(err.kind(), DeskErrorKind::NotFound);
}
