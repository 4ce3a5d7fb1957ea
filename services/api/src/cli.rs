use crate::demo::{run_demo, DemoArgs};
use crate::export::{run_audit_export, AuditExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use estate_flow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Estate Flow",
    about = "Run the gated listing desk or walk through it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect a persisted audit trail
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },
    /// Run the document collection scenario on a simulated clock
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Convert a JSON-lines audit log to CSV
    Export(AuditExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Audit {
            command: AuditCommand::Export(args),
        } => run_audit_export(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["estate-flow-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn audit_export_takes_paths_and_filters() {
        let cli = Cli::try_parse_from([
            "estate-flow-api",
            "audit",
            "export",
            "--input",
            "audit.jsonl",
            "--listing",
            "lst-000001",
            "--action",
            "gate_overridden",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Audit {
                command: AuditCommand::Export(args),
            }) => {
                assert_eq!(args.input.to_str(), Some("audit.jsonl"));
                assert_eq!(args.listing.as_deref(), Some("lst-000001"));
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
