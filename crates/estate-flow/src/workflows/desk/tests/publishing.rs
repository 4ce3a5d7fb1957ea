use super::common::*;

use crate::audit::{AuditAction, AuditFilter, AuditLog};
use crate::workflows::desk::{DeskErrorKind, Platform, PublicationStatus, PublishResult};
use crate::workflows::listing::{ChecklistStatus, WorkflowState, PORTAL_MILESTONE};

fn live(reference: &str) -> PublishResult {
    PublishResult {
        ok: true,
        external_ref: Some(reference.to_string()),
        error: None,
    }
}

#[test]
fn publishing_needs_the_published_state() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Docs);

    let err = harness
        .desk
        .publish(&id, &[Platform::ImmobilienScout24], &operator())
        .expect_err("too early");
    assert_eq!(err.kind(), DeskErrorKind::Conflict);
    assert!(harness.outbox.publishes().is_empty());

    let id = listing_in(&harness, WorkflowState::Published);
    let empty = harness
        .desk
        .publish(&id, &[], &operator())
        .expect_err("no platforms");
    assert_eq!(empty.kind(), DeskErrorKind::Validation);
}

#[test]
fn publish_requests_each_platform_once_and_marks_the_milestone() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Published);

    let requested = harness
        .desk
        .publish(
            &id,
            &[
                Platform::ImmobilienScout24,
                Platform::Instagram,
                Platform::ImmobilienScout24,
            ],
            &operator(),
        )
        .expect("requested");
    assert_eq!(requested.len(), 2);
    assert!(requested
        .iter()
        .all(|publication| publication.status == PublicationStatus::Pending));

    let commands = harness.outbox.publishes();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].title, "Altbauwohnung Prenzlauer Berg");
    assert_eq!(harness.status_of(&id, PORTAL_MILESTONE), ChecklistStatus::Requested);

    let audited = harness
        .audit
        .query(Some(&id), &AuditFilter::action(AuditAction::PublishRequested))
        .expect("query");
    assert_eq!(audited.len(), 2);
}

#[test]
fn confirmed_portal_listing_opens_the_inquiries_gate() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Published);
    harness
        .desk
        .publish(&id, &[Platform::Immowelt], &operator())
        .expect("requested");
    assert!(!harness.desk.can_advance(&id).expect("check").can_advance());

    let publication = harness
        .desk
        .on_publish_result(&id, Platform::Immowelt, live("IW-889123"))
        .expect("recorded");
    assert_eq!(
        publication.status,
        PublicationStatus::Live {
            external_ref: Some("IW-889123".to_string())
        }
    );
    assert_eq!(harness.status_of(&id, PORTAL_MILESTONE), ChecklistStatus::Received);
    assert_eq!(
        harness.desk.advance(&id, &operator()).expect("advance"),
        WorkflowState::Inquiries
    );

    // Live platforms are not re-requested.
    let again = harness
        .desk
        .publish(&id, &[Platform::Immowelt], &operator())
        .expect("no-op");
    assert!(again.is_empty());
    assert_eq!(harness.outbox.publishes().len(), 1);

    let succeeded = harness
        .audit
        .query(Some(&id), &AuditFilter::action(AuditAction::PublishSucceeded))
        .expect("query");
    assert_eq!(succeeded[0].detail("external_ref"), Some("IW-889123"));
    assert_eq!(succeeded[0].actor, "portal gateway");
}

#[test]
fn failed_publication_can_be_retried() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Published);
    harness
        .desk
        .publish(&id, &[Platform::Kleinanzeigen], &operator())
        .expect("requested");

    let failed = harness
        .desk
        .on_publish_result(
            &id,
            Platform::Kleinanzeigen,
            PublishResult {
                ok: false,
                external_ref: None,
                error: Some("Kontingent erschöpft".to_string()),
            },
        )
        .expect("recorded");
    assert_eq!(
        failed.status,
        PublicationStatus::Failed {
            error: "Kontingent erschöpft".to_string()
        }
    );
    assert_eq!(harness.status_of(&id, PORTAL_MILESTONE), ChecklistStatus::Requested);

    let retried = harness
        .desk
        .publish(&id, &[Platform::Kleinanzeigen], &operator())
        .expect("retry");
    assert_eq!(retried[0].attempts, 2);
    assert!(harness.actions(&id).contains(&AuditAction::PublishFailed));
}

#[test]
fn results_for_unrequested_platforms_are_unknown() {
    let harness = harness();
    let id = listing_in(&harness, WorkflowState::Published);

    let err = harness
        .desk
        .on_publish_result(&id, Platform::Facebook, live("fb-1"))
        .expect_err("never requested");
    assert_eq!(err.kind(), DeskErrorKind::NotFound);
}
