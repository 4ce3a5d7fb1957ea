use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clap::Args;
use estate_flow::audit::{export_csv, AuditFilter, AuditLog, InMemoryAuditLog};
use estate_flow::clock::ManualClock;
use estate_flow::config::WorkspaceConfig;
use estate_flow::error::AppError;
use estate_flow::workflows::desk::{
    ListingDesk, NewListing, NewPacket, Platform, PublishResult, RecordingOutbox, ReplyOutcome,
};
use estate_flow::workflows::documents::{
    Holder, InboundAttachment, InboundMessage, MessageId, QaOutcome, ThreadId,
};
use estate_flow::workflows::listing::{Actor, GateCheck, HolderRole, ListingId, WorkflowState};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

type DemoDesk = ListingDesk<InMemoryAuditLog, RecordingOutbox>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Day the request packets go out (YYYY-MM-DD). Defaults to 2025-09-22.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Send follow-ups automatically instead of leaving drafts.
    #[arg(long)]
    pub(crate) auto_send: bool,
    /// Write the resulting audit trail as CSV.
    #[arg(long)]
    pub(crate) audit_csv: Option<PathBuf>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn morning_of(date: NaiveDate) -> DateTime<Utc> {
    let nine = date
        .and_hms_opt(9, 0, 0)
        .expect("09:00 exists on every date");
    Utc.from_utc_datetime(&nine)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args
        .start
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(2025, 9, 22).expect("valid default date"));
    let clock = Arc::new(ManualClock::new(morning_of(start)));
    let audit = Arc::new(InMemoryAuditLog::new());
    let outbox = Arc::new(RecordingOutbox::default());
    let desk = ListingDesk::new(
        audit.clone(),
        outbox.clone(),
        clock.clone(),
        WorkspaceConfig {
            auto_send: args.auto_send,
            ..WorkspaceConfig::default()
        },
    );
    let broker = Actor::user("Jonas Brandt");

    println!("Listing desk demo ({})", start.format("%Y-%m-%d"));
    let listing = desk
        .create_listing(
            NewListing {
                title: "Altbauwohnung Prenzlauer Berg".to_string(),
                initial_state: Some(WorkflowState::Docs),
            },
            &broker,
        )?
        .listing;
    println!("\nCreated {} '{}' in state {}", listing.id, listing.title, listing.state.label());
    render_gates(&desk.can_advance(&listing.id)?);

    let seller_thread = send(
        &desk,
        &listing.id,
        Holder {
            role: HolderRole::Seller,
            name: "Familie Krüger".to_string(),
            email: "krueger@example.org".to_string(),
            cadence: None,
        },
        &["Grundbuchauszug", "Energieausweis"],
        &broker,
    )?;
    let management_thread = send(
        &desk,
        &listing.id,
        Holder {
            role: HolderRole::PropertyManagement,
            name: "Hausverwaltung Schmidt".to_string(),
            email: "verwaltung@hv-schmidt.de".to_string(),
            cadence: None,
        },
        &["Teilungserklärung"],
        &broker,
    )?;
    println!("\nRequest mails queued: {}", outbox.mails().len());

    clock.advance(Duration::hours(5));
    let outcome = desk.receive_reply(reply(
        &management_thread,
        "verwaltung@hv-schmidt.de",
        "Die Teilungserklärung ist kostenpflichtig, die Gebühr beträgt 45,00 € vorab.",
        Vec::new(),
    ))?;
    if let ReplyOutcome::Appended {
        thread_status,
        exceptions,
        ..
    } = &outcome
    {
        println!("\nProperty management replied, thread is now {thread_status:?}");
        for exception in exceptions {
            println!("  exception [{}] {}", exception.kind.code(), exception.description);
        }
    }

    clock.advance(Duration::hours(2));
    let first = appended(desk.receive_reply(reply(
        &seller_thread,
        "krueger@example.org",
        "Anbei schon einmal der Grundbuchauszug.",
        vec![pdf("Grundbuchauszug.pdf", 312_000)],
    ))?);
    let received = desk.ingest_attachments(&first, &broker)?;
    println!("\nSeller sent {} document(s), checklist now:", received.len());
    for item in &received {
        println!("  {} -> {}", item.name, item.status);
    }
    render_gates(&desk.can_advance(&listing.id)?);
    render_qa(&desk, &first, &broker)?;

    let follow_up_day = clock.advance(Duration::days(3));
    let drafts = desk.tick(follow_up_day)?;
    println!("\nFollow-up tick on {}: {} draft(s)", follow_up_day.format("%Y-%m-%d"), drafts.len());
    for draft in &drafts {
        println!("  to {} | {}", draft.to, draft.subject);
        if !draft.dispatched {
            desk.dispatch_draft(&draft.message_id, &broker)?;
            println!("  dispatched by {}", broker.name);
        }
    }

    clock.advance(Duration::days(1));
    let second = appended(desk.receive_reply(reply(
        &seller_thread,
        "krueger@example.org",
        "Und hier der Energieausweis.",
        vec![pdf("energiepass-2021.pdf", 184_000)],
    ))?);
    desk.ingest_attachments(&second, &broker)?;
    render_qa(&desk, &second, &broker)?;

    let state = desk.advance(&listing.id, &broker)?;
    println!("\nAdvanced to {}", state.label());

    let requested = desk.publish(
        &listing.id,
        &[Platform::ImmobilienScout24, Platform::Homepage],
        &broker,
    )?;
    for publication in requested {
        let platform = publication.platform;
        desk.on_publish_result(
            &listing.id,
            platform,
            PublishResult {
                ok: true,
                external_ref: Some(format!("{}-{}", platform.as_str(), listing.id)),
                error: None,
            },
        )?;
        println!("  live on {}", platform.label());
    }
    let state = desk.advance(&listing.id, &broker)?;
    println!("Advanced to {}", state.label());

    let view = desk.listing(&listing.id)?;
    for exception in view.open_exceptions().cloned().collect::<Vec<_>>() {
        desk.resolve_exception(&exception.id, "Gebühr vom Eigentümer freigegeben", &broker)?;
        println!("\nResolved {} ({})", exception.id, exception.kind.code());
    }

    let trail = audit.query(Some(&listing.id), &AuditFilter::default())?;
    println!("\nAudit trail: {} entries", trail.len());
    for entry in trail.iter().rev().take(5).rev() {
        println!("  #{:<3} {:<24} {}", entry.sequence, entry.action, entry.actor);
    }
    if let Some(path) = args.audit_csv {
        export_csv(&trail, BufWriter::new(File::create(&path)?))?;
        println!("Audit trail written to {}", path.display());
    }

    Ok(())
}

fn send(
    desk: &DemoDesk,
    listing: &ListingId,
    holder: Holder,
    items: &[&str],
    actor: &Actor,
) -> Result<ThreadId, AppError> {
    let name = holder.name.clone();
    let packet = desk.create_packet(
        listing,
        NewPacket {
            holder,
            items: items.iter().map(|item| item.to_string()).collect(),
            deadline: None,
        },
        actor,
    )?;
    let sent = desk.send_packet(&packet.packet.id, "", actor)?;
    println!("Requested {} from {}", items.join(", "), name);
    Ok(sent
        .packet
        .thread_id
        .expect("a sent packet always has a thread"))
}

fn reply(
    thread: &ThreadId,
    from: &str,
    body: &str,
    attachments: Vec<InboundAttachment>,
) -> InboundMessage {
    InboundMessage {
        thread_id: thread.clone(),
        from: from.to_string(),
        subject: "AW: Unterlagenanforderung".to_string(),
        body: body.to_string(),
        attachments,
        received_at: None,
    }
}

fn pdf(filename: &str, size: u64) -> InboundAttachment {
    InboundAttachment {
        filename: filename.to_string(),
        content_type: Some("application/pdf".to_string()),
        size,
    }
}

fn appended(outcome: ReplyOutcome) -> MessageId {
    outcome
        .message_id()
        .cloned()
        .expect("demo replies come from external holders")
}

fn render_gates(check: &GateCheck) {
    match check.target {
        Some(target) if check.can_advance() => println!("Gates for {} hold", target.label()),
        Some(target) => {
            println!("Gates for {} not met:", target.label());
            for gate in &check.unmet {
                println!("  - {}", gate.describe());
            }
        }
        None => println!("Listing is in its final state"),
    }
}

fn render_qa(desk: &DemoDesk, message: &MessageId, actor: &Actor) -> Result<(), AppError> {
    for result in desk.run_qa(message, actor)? {
        let verdict = match &result.outcome {
            QaOutcome::Verified => "verified".to_string(),
            QaOutcome::AlreadyVerified => "already verified".to_string(),
            QaOutcome::Skipped => "skipped".to_string(),
            QaOutcome::Superseded { by } => format!("superseded by {by}"),
            QaOutcome::Rejected { verdict, .. } => format!("rejected ({verdict:?})"),
        };
        println!("QA {} as {}: {}", result.filename, result.item, verdict);
    }
    Ok(())
}
