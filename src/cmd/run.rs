//! Single phase invocation: `harness --phase <name> --project-dir <dir>`.

use harness::controller::{self, PhaseArgs, PhaseOutcome};
use harness::errors::EXIT_SUCCESS;

/// Run the phase and return the process exit code.
pub async fn run_phase(args: PhaseArgs) -> u8 {
    match controller::run_phase(&args).await {
        Ok(outcome) => {
            print_outcome(&outcome);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {:#}", e.label(), e);
            if e.kind().is_retryable() {
                eprintln!(
                    "{}",
                    console::style("Retry with --retry-context set to the message above.").dim()
                );
            }
            e.exit_code()
        }
    }
}

fn print_outcome(outcome: &PhaseOutcome) {
    match outcome {
        PhaseOutcome::QcRecorded { passed: false, .. } => {
            println!("{}", console::style(outcome).yellow())
        }
        PhaseOutcome::DryRun => println!("{}", outcome),
        _ => println!("{}", console::style(outcome).green()),
    }
}
