use std::process::ExitCode;

use estate_flow::error::AppError;
use estate_flow_api::run;

#[tokio::main]
async fn main() -> ExitCode {
    exit_code(run().await)
}

/// Configuration mistakes exit with 2, everything else with 1.
fn exit_code(result: Result<(), AppError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("estate-flow: {err}");
            match err {
                AppError::Config(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
