use font_thief_core::logging;

mod cli;

use crate::cli::{Cli, ExitStatus};

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; fall back to stderr.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {:#}", e);
    }

    let status = match Cli::run_from_args().await {
        Ok(status) => status,
        Err(err) => {
            eprintln!("font-thief error: {:#}", err);
            ExitStatus::from_error(&err)
        }
    };
    std::process::exit(status.code());
}
