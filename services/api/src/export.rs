use clap::Args;
use estate_flow::audit::{export_csv, read_json_lines, AuditAction, AuditEntry, AuditFilter};
use estate_flow::error::AppError;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct AuditExportArgs {
    /// JSON-lines audit log written by the service
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Destination CSV file (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Only export entries of this listing
    #[arg(long)]
    pub(crate) listing: Option<String>,
    /// Only export entries with this action, e.g. gate_overridden
    #[arg(long, value_parser = parse_action)]
    pub(crate) action: Option<AuditAction>,
}

pub(crate) fn parse_action(raw: &str) -> Result<AuditAction, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|_| format!("unknown audit action '{raw}'"))
}

pub(crate) fn run_audit_export(args: AuditExportArgs) -> Result<(), AppError> {
    let entries = read_json_lines(File::open(&args.input)?)?;
    let selected = select(entries, args.listing.as_deref(), args.action);

    match &args.output {
        Some(path) => export_csv(&selected, BufWriter::new(File::create(path)?))?,
        None => export_csv(&selected, io::stdout().lock())?,
    }

    eprintln!(
        "exported {} audit entr{} from {}",
        selected.len(),
        if selected.len() == 1 { "y" } else { "ies" },
        args.input.display()
    );
    Ok(())
}

fn select(
    entries: Vec<AuditEntry>,
    listing: Option<&str>,
    action: Option<AuditAction>,
) -> Vec<AuditEntry> {
    let filter = AuditFilter {
        action,
        ..AuditFilter::default()
    };
    entries
        .into_iter()
        .filter(|entry| {
            listing.map_or(true, |id| {
                entry.listing_id.as_ref().is_some_and(|listing| listing.0 == id)
            })
        })
        .filter(|entry| filter.matches(entry))
        .collect()
}
