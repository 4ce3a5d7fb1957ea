use super::common::*;

use crate::audit::{AuditAction, AuditFilter, AuditLog};
use crate::config::WorkspaceConfig;
use crate::workflows::desk::{DeskError, DeskErrorKind, ReplyOutcome};
use crate::workflows::documents::{
    ExceptionKind, InboundAttachment, MessageId, PacketStatus, QaOutcome, QaVerdict, ThreadError,
    ThreadId, ThreadStatus,
};
use crate::workflows::listing::ChecklistStatus;

fn appended(outcome: ReplyOutcome) -> (MessageId, ThreadStatus, Vec<ExceptionKind>) {
    match outcome {
        ReplyOutcome::Appended {
            message_id,
            thread_status,
            exceptions,
        } => (
            message_id,
            thread_status,
            exceptions.into_iter().map(|record| record.kind).collect(),
        ),
        ReplyOutcome::Ignored { reason } => panic!("reply ignored: {reason}"),
    }
}

#[test]
fn fee_reply_blocks_the_thread_until_resolved() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(
        &harness,
        &id,
        management(),
        &["Teilungserklärung", "Eigentümerprotokolle"],
    );
    let thread = thread_of(&sent);

    let outcome = harness
        .desk
        .receive_reply(reply(
            &thread,
            "verwaltung@hv-schmidt.de",
            "Die Teilungserklärung ist kostenpflichtig, die Gebühr beträgt 45,00 € vorab.",
            Vec::new(),
        ))
        .expect("reply routed");
    let (_, status, kinds) = appended(outcome);
    assert_eq!(status, ThreadStatus::Blocked);
    assert_eq!(
        kinds,
        vec![ExceptionKind::FeeRequired {
            amount: Some("45,00 EUR".to_string())
        }]
    );

    let view = harness.desk.listing(&id).expect("view");
    let exception = view.open_exceptions().next().expect("open exception").clone();
    assert!(exception.description.contains("Hausverwaltung Schmidt"));
    assert_eq!(view.thread(&thread).expect("thread").status, ThreadStatus::Blocked);

    let blank = harness
        .desk
        .resolve_exception(&exception.id, " ", &operator())
        .expect_err("action required");
    assert_eq!(blank.kind(), DeskErrorKind::Validation);

    let resolved = harness
        .desk
        .resolve_exception(&exception.id, "Gebühr vom Verkäufer freigegeben", &operator())
        .expect("resolved");
    assert!(resolved.is_resolved());

    let twice = harness
        .desk
        .resolve_exception(&exception.id, "again", &operator())
        .expect_err("already resolved");
    assert!(matches!(twice, DeskError::Thread(ThreadError::AlreadyResolved(_))));

    let view = harness.desk.listing(&id).expect("view");
    assert_eq!(view.open_exceptions().count(), 0);
    assert_eq!(view.thread(&thread).expect("thread").status, ThreadStatus::Waiting);
    // Resolution leaves the checklist alone.
    assert_eq!(
        harness.status_of(&id, "Teilungserklärung"),
        ChecklistStatus::Requested
    );

    let actions = harness.actions(&id);
    assert!(actions.contains(&AuditAction::ReplyReceived));
    assert!(actions.contains(&AuditAction::ExceptionRaised));
    assert!(actions.contains(&AuditAction::ExceptionResolved));
}

#[test]
fn replies_with_attachments_are_not_screened() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, management(), &["Teilungserklärung"]);

    let outcome = harness
        .desk
        .receive_reply(reply(
            &thread_of(&sent),
            "verwaltung@hv-schmidt.de",
            "Anbei die Unterlagen, die Gebühr haben wir erlassen.",
            vec![pdf("Teilungserklaerung_1998.pdf", 420_000)],
        ))
        .expect("routed");
    let (_, status, kinds) = appended(outcome);
    assert!(kinds.is_empty());
    assert_eq!(status, ThreadStatus::Active);
}

#[test]
fn ingestion_moves_matched_items_to_received_once() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Grundbuchauszug", "Energieausweis"]);

    let outcome = harness
        .desk
        .receive_reply(reply(
            &thread_of(&sent),
            "krueger@example.org",
            "Anbei beide Dokumente.",
            vec![
                pdf("Grundbuch_Blatt_1234.pdf", 300_000),
                pdf("energiepass-2021.pdf", 180_000),
                pdf("scan_0001.pdf", 90_000),
            ],
        ))
        .expect("routed");
    let (message_id, _, _) = appended(outcome);

    let changed = harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("ingested");
    let names: Vec<&str> = changed.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Grundbuchauszug", "Energieausweis"]);
    assert!(changed
        .iter()
        .all(|item| item.status == ChecklistStatus::Received));

    let again = harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("idempotent");
    assert!(again.is_empty());

    let view = harness.desk.listing(&id).expect("view");
    assert_eq!(view.packets[0].status, PacketStatus::Waiting);
    let message = view
        .thread(&thread_of(&sent))
        .expect("thread")
        .thread
        .messages
        .iter()
        .find(|message| message.id == message_id)
        .expect("message");
    let unmatched = message
        .attachments
        .iter()
        .find(|attachment| attachment.filename == "scan_0001.pdf")
        .expect("attachment");
    assert!(unmatched.classified);
    assert!(!unmatched.ingested);
    assert_eq!(unmatched.resolved_type, None);

    let ingested = harness
        .audit
        .query(
            Some(&id),
            &AuditFilter::action(AuditAction::AttachmentsIngested),
        )
        .expect("query");
    assert_eq!(ingested.len(), 1);
}

#[test]
fn qa_verifies_good_documents_and_rejects_bad_ones() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Grundbuchauszug", "Energieausweis"]);
    let thread = thread_of(&sent);

    let (message_id, _, _) = appended(
        harness
            .desk
            .receive_reply(reply(
                &thread,
                "krueger@example.org",
                "Bitte sehr.",
                vec![
                    pdf("Grundbuchauszug.pdf", 300_000),
                    InboundAttachment {
                        filename: "Energieausweis.docx".to_string(),
                        content_type: None,
                        size: 60_000,
                    },
                ],
            ))
            .expect("routed"),
    );
    harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("ingested");

    let results = harness.desk.run_qa(&message_id, &operator()).expect("qa");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].item, "Grundbuchauszug");
    assert_eq!(results[0].outcome, QaOutcome::Verified);
    assert_eq!(results[1].item, "Energieausweis");
    assert!(matches!(
        results[1].outcome,
        QaOutcome::Rejected {
            verdict: QaVerdict::WrongDocument,
            ..
        }
    ));

    assert_eq!(harness.status_of(&id, "Grundbuchauszug"), ChecklistStatus::Verified);
    assert_eq!(harness.status_of(&id, "Energieausweis"), ChecklistStatus::Missing);

    let view = harness.desk.listing(&id).expect("view");
    let open: Vec<_> = view.open_exceptions().collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].kind.code(), "wrong_document");
    assert_eq!(view.thread(&thread).expect("thread").status, ThreadStatus::Blocked);

    let rejected = harness
        .audit
        .query(
            Some(&id),
            &AuditFilter::action(AuditAction::ChecklistItemRejected),
        )
        .expect("query");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].detail("item"), Some("Energieausweis"));

    // Reviewed attachments are not inspected twice.
    assert!(harness
        .desk
        .run_qa(&message_id, &operator())
        .expect("qa")
        .is_empty());
}

#[test]
fn tiny_files_are_flagged_as_missing_pages() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Grundbuchauszug"]);

    let (message_id, _, _) = appended(
        harness
            .desk
            .receive_reply(reply(
                &thread_of(&sent),
                "krueger@example.org",
                "Anbei.",
                vec![pdf("grundbuch.pdf", 2_048)],
            ))
            .expect("routed"),
    );
    harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("ingested");
    let results = harness.desk.run_qa(&message_id, &operator()).expect("qa");

    assert!(matches!(
        results[0].outcome,
        QaOutcome::Rejected {
            verdict: QaVerdict::MissingPages,
            ..
        }
    ));
}

#[test]
fn a_good_copy_verifies_the_item_even_after_a_failed_one() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Energieausweis"]);

    let (message_id, _, _) = appended(
        harness
            .desk
            .receive_reply(reply(
                &thread_of(&sent),
                "krueger@example.org",
                "Erst der Scan, dann das vollständige Dokument.",
                vec![
                    pdf("Energieausweis_scan_teil.pdf", 2_048),
                    pdf("Energieausweis_komplett.pdf", 300_000),
                ],
            ))
            .expect("routed"),
    );
    harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("ingested");

    let results = harness.desk.run_qa(&message_id, &operator()).expect("qa");
    let outcomes: Vec<(&str, &QaOutcome)> = results
        .iter()
        .map(|result| (result.filename.as_str(), &result.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (
                "Energieausweis_scan_teil.pdf",
                &QaOutcome::Superseded {
                    by: results[1].attachment_id.clone()
                }
            ),
            ("Energieausweis_komplett.pdf", &QaOutcome::Verified),
        ]
    );

    assert_eq!(harness.status_of(&id, "Energieausweis"), ChecklistStatus::Verified);
    let view = harness.desk.listing(&id).expect("view");
    assert_eq!(view.open_exceptions().count(), 0);
    assert_eq!(view.packets[0].status, PacketStatus::Complete);
    assert!(!harness
        .actions(&id)
        .contains(&AuditAction::ChecklistItemRejected));

    assert!(harness
        .desk
        .run_qa(&message_id, &operator())
        .expect("rerun")
        .is_empty());
    assert_eq!(harness.status_of(&id, "Energieausweis"), ChecklistStatus::Verified);
}

#[test]
fn every_failed_copy_is_reported_when_none_passes() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Energieausweis"]);

    let (message_id, _, _) = appended(
        harness
            .desk
            .receive_reply(reply(
                &thread_of(&sent),
                "krueger@example.org",
                "Anbei zwei Scans.",
                vec![
                    pdf("Energieausweis_seite1.pdf", 2_048),
                    pdf("Energieausweis_seite2.pdf", 3_072),
                ],
            ))
            .expect("routed"),
    );
    harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("ingested");

    let results = harness.desk.run_qa(&message_id, &operator()).expect("qa");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| matches!(
        result.outcome,
        QaOutcome::Rejected {
            verdict: QaVerdict::MissingPages,
            ..
        }
    )));
    assert_eq!(harness.status_of(&id, "Energieausweis"), ChecklistStatus::Missing);

    let view = harness.desk.listing(&id).expect("view");
    assert_eq!(view.open_exceptions().count(), 2);
    let rejected = harness
        .audit
        .query(
            Some(&id),
            &AuditFilter::action(AuditAction::ChecklistItemRejected),
        )
        .expect("query");
    assert_eq!(rejected.len(), 1);
}

#[test]
fn skipped_attachments_are_inspected_once_the_item_is_received_again() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Grundbuchauszug"]);

    let (message_id, _, _) = appended(
        harness
            .desk
            .receive_reply(reply(
                &thread_of(&sent),
                "krueger@example.org",
                "Anbei.",
                vec![pdf("Grundbuchauszug.pdf", 300_000)],
            ))
            .expect("routed"),
    );
    harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("ingested");
    harness
        .desk
        .set_item_status(&id, "Grundbuchauszug", ChecklistStatus::Missing, &operator())
        .expect("operator rejects the item");

    let results = harness.desk.run_qa(&message_id, &operator()).expect("qa");
    assert_eq!(results[0].outcome, QaOutcome::Skipped);

    harness
        .desk
        .set_item_status(&id, "Grundbuchauszug", ChecklistStatus::Received, &operator())
        .expect("operator restores the item");
    let results = harness.desk.run_qa(&message_id, &operator()).expect("qa again");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, QaOutcome::Verified);
    assert_eq!(harness.status_of(&id, "Grundbuchauszug"), ChecklistStatus::Verified);
}

#[test]
fn verified_packet_completes_its_thread() {
    let harness = harness();
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Grundbuchauszug"]);
    let thread = thread_of(&sent);

    let (message_id, _, _) = appended(
        harness
            .desk
            .receive_reply(reply(
                &thread,
                "krueger@example.org",
                "Anbei.",
                vec![pdf("Grundbuchauszug_aktuell.pdf", 250_000)],
            ))
            .expect("routed"),
    );
    harness
        .desk
        .ingest_attachments(&message_id, &operator())
        .expect("ingested");
    harness.desk.run_qa(&message_id, &operator()).expect("qa");

    let view = harness.desk.listing(&id).expect("view");
    assert_eq!(view.packets[0].status, PacketStatus::Complete);
    assert_eq!(view.thread(&thread).expect("thread").status, ThreadStatus::Complete);
    assert!(harness.desk.tick(day(3)).expect("tick").is_empty());
}

#[test]
fn internal_replies_are_ignored_when_tracking_external_threads_only() {
    let harness = harness_with(WorkspaceConfig {
        track_external_threads_only: true,
        ..WorkspaceConfig::default()
    });
    let id = listing(&harness);
    let sent = sent_packet(&harness, &id, seller(), &["Grundbuchauszug"]);

    let outcome = harness
        .desk
        .receive_reply(reply(
            &thread_of(&sent),
            "Kollegin@Example.com",
            "Vollmacht liegt bei mir.",
            Vec::new(),
        ))
        .expect("routed");
    assert!(matches!(outcome, ReplyOutcome::Ignored { .. }));
    assert!(outcome.message_id().is_none());

    let view = harness.desk.listing(&id).expect("view");
    assert_eq!(view.threads[0].thread.messages.len(), 1);
    assert!(view.exceptions.is_empty());
}

#[test]
fn replies_must_belong_to_a_known_thread() {
    let harness = harness();
    let err = harness
        .desk
        .receive_reply(reply(
            &ThreadId("thr-424242".to_string()),
            "someone@example.org",
            "Hallo",
            Vec::new(),
        ))
        .expect_err("unknown thread");
    assert_eq!(err.kind(), DeskErrorKind::NotFound);
}

#[test]
fn outgoing_messages_cannot_be_ingested() {
    let harness = harness();
    let id = listing(&harness);
    sent_packet(&harness, &id, seller(), &["Grundbuchauszug"]);
    let request = harness.outbox.mails()[0].message_id.clone();

    let err = harness
        .desk
        .ingest_attachments(&request, &operator())
        .expect_err("outgoing");
    assert_eq!(err.kind(), DeskErrorKind::Validation);
}
