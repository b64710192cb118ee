//! CLI command implementations for the `harness` binary.

pub mod run;

pub use run::run_phase;

use harness::errors::{EXIT_FATAL, EXIT_SUCCESS};
use std::path::Path;
use std::process::ExitCode;

/// Report a clap error. Usage errors exit 1 so that 2 keeps meaning
/// "retryable validation failure"; help and version exit 0.
pub fn usage_error(err: clap::Error) -> ExitCode {
    let _ = err.print();
    if err.use_stderr() {
        ExitCode::from(EXIT_FATAL)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

/// Load `.env` from the project directory, then from the working directory.
/// Variables already set in the environment are never overridden.
pub fn load_env(project_dir: &Path) {
    let _ = dotenvy::from_path(project_dir.join(".env"));
    let _ = dotenvy::dotenv();
}
