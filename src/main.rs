use clap::Parser;
use harness::Phase;
use harness::controller::PhaseArgs;
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;

#[derive(Parser)]
#[command(name = "harness")]
#[command(version, about = "Run one phase of a stateful video generation conversation")]
pub struct Cli {
    /// Phase to run
    #[arg(long, value_enum)]
    pub phase: Phase,

    /// Project directory holding the collection metadata and session record
    #[arg(long)]
    pub project_dir: PathBuf,

    /// Topic for the video plan
    #[arg(long)]
    pub topic: Option<String>,

    /// Scene scaffold for scene-specific phases
    #[arg(long)]
    pub scene_file: Option<PathBuf>,

    /// JSON scene specification for building
    #[arg(long)]
    pub scene_spec: Option<String>,

    /// Error context from the previous attempt
    #[arg(long)]
    pub retry_context: Option<String>,

    /// Resolve the session and exit without issuing a turn
    #[arg(long)]
    pub dry_run: bool,

    /// Model name; overrides HARNESS_MODEL and harness.toml
    #[arg(long)]
    pub model: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn into_args(self) -> PhaseArgs {
        PhaseArgs {
            phase: self.phase,
            project_dir: self.project_dir,
            topic: self.topic,
            scene_file: self.scene_file,
            scene_spec: self.scene_spec,
            retry_context: self.retry_context,
            dry_run: self.dry_run,
            model: self.model,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return cmd::usage_error(e),
    };
    harness::logging::init_tracing(cli.verbose);
    cmd::load_env(&cli.project_dir);

    ExitCode::from(cmd::run_phase(cli.into_args()).await)
}
