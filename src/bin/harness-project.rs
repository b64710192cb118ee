//! Project utilities: collection metadata and manual project state edits.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use harness::config::{METADATA_FILE, STATE_FILE};
use harness::errors::{EXIT_FATAL, EXIT_SUCCESS};
use harness::session::{DocumentRecord, ProjectMetadata};
use harness::state::{ProjectStateStore, parse_state_value, render_state_value};

#[derive(Parser)]
#[command(name = "harness-project")]
#[command(version, about = "Manage harness project metadata and state")]
struct Cli {
    /// Project directory
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the collection metadata for a new project
    Init {
        #[arg(long)]
        template_collection_id: String,
        #[arg(long)]
        project_collection_id: String,
        /// Overwrite existing metadata
        #[arg(long)]
        force: bool,
    },
    /// Read or edit project_state.json
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// Record a document uploaded to the project collection
    RecordDocument {
        #[arg(long)]
        file_id: String,
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// Print one key, or the whole document when no key is given
    Get {
        #[arg(long)]
        key: Option<String>,
    },
    /// Set a key; the value is parsed as JSON when possible
    Set {
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_FATAL } else { EXIT_SUCCESS });
        }
    };
    harness::logging::init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let project_dir = &cli.project_dir;
    if !project_dir.is_dir() {
        bail!("Project directory not found at '{}'", project_dir.display());
    }

    match &cli.command {
        Commands::Init {
            template_collection_id,
            project_collection_id,
            force,
        } => cmd_init(project_dir, template_collection_id, project_collection_id, *force),
        Commands::State { command } => match command {
            StateCommands::Get { key } => cmd_state_get(project_dir, key.as_deref()),
            StateCommands::Set { key, value } => cmd_state_set(project_dir, key, value),
        },
        Commands::RecordDocument { file_id, name } => {
            cmd_record_document(project_dir, file_id, name)
        }
    }
}

fn cmd_init(
    project_dir: &Path,
    template_collection_id: &str,
    project_collection_id: &str,
    force: bool,
) -> Result<()> {
    let path = project_dir.join(METADATA_FILE);
    let metadata = ProjectMetadata::new(template_collection_id, project_collection_id);
    ProjectMetadata::initialize(&path, &metadata, force)?;
    println!("Collection metadata saved to {}", path.display());
    Ok(())
}

fn cmd_state_get(project_dir: &Path, key: Option<&str>) -> Result<()> {
    let store = ProjectStateStore::new(project_dir.join(STATE_FILE));
    if !store.path().exists() {
        return Ok(());
    }

    match key {
        Some(key) => {
            if let Some(value) = store.get(key)?.filter(|v| !v.is_null()) {
                println!("{}", render_state_value(&value)?);
            }
        }
        None => {
            let doc = store.load()?;
            println!(
                "{}",
                serde_json::to_string(&doc).context("Failed to render project state")?
            );
        }
    }
    Ok(())
}

fn cmd_state_set(project_dir: &Path, key: &str, value: &str) -> Result<()> {
    let store = ProjectStateStore::new(project_dir.join(STATE_FILE));
    store.set_lenient(key, parse_state_value(value))
}

fn cmd_record_document(project_dir: &Path, file_id: &str, name: &str) -> Result<()> {
    let path = project_dir.join(METADATA_FILE);
    let metadata = ProjectMetadata::append_documents(
        &path,
        &[DocumentRecord {
            file_id: file_id.to_string(),
            name: name.to_string(),
        }],
    )?;
    println!(
        "Collection metadata updated in {} ({} documents)",
        path.display(),
        metadata.documents.len()
    );
    Ok(())
}
