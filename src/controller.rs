//! Phase controller: one invocation, one phase, at most one turn.
//!
//! Order of work: resolve configuration and the session, honour `--dry-run`,
//! check the phase's inputs, then run the turn and persist its artifact. The
//! process exit code is derived from the returned error's kind alone.

use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::audit::{AuditLogger, TurnAudit, TurnOutcome};
use crate::client::{GenerationBackend, XaiBackend};
use crate::config::Config;
use crate::drivers::Generator;
use crate::errors::{HarnessError, HarnessResult};
use crate::inject::{inject_scene_body, read_scene_body};
use crate::phase::{Phase, PhaseInput};
use crate::prompts::PromptRenderer;
use crate::schemas::SceneSpec;
use crate::session::ConversationSession;
use crate::state::ProjectStateStore;

/// Arguments of one phase invocation.
#[derive(Debug, Clone)]
pub struct PhaseArgs {
    pub phase: Phase,
    pub project_dir: PathBuf,
    pub topic: Option<String>,
    pub scene_file: Option<PathBuf>,
    pub scene_spec: Option<String>,
    pub retry_context: Option<String>,
    pub dry_run: bool,
    pub model: Option<String>,
}

impl PhaseArgs {
    pub fn new(phase: Phase, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            phase,
            project_dir: project_dir.into(),
            topic: None,
            scene_file: None,
            scene_spec: None,
            retry_context: None,
            dry_run: false,
            model: None,
        }
    }

    fn retry_context(&self) -> Option<&str> {
        self.retry_context.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// What a successful invocation did.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    DryRun,
    PlanWritten { path: PathBuf, scenes: usize },
    NarrationWritten { path: PathBuf, scenes: usize },
    SceneInjected { path: PathBuf, scene_id: String },
    QcRecorded { scene_id: String, passed: bool, score: f64, critical: usize },
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseOutcome::DryRun => write!(f, "Dry run mode. No API calls will be made."),
            PhaseOutcome::PlanWritten { path, scenes } => {
                write!(f, "Plan with {} scenes written to {}", scenes, path.display())
            }
            PhaseOutcome::NarrationWritten { path, scenes } => {
                write!(f, "Narration for {} scenes written to {}", scenes, path.display())
            }
            PhaseOutcome::SceneInjected { path, scene_id } => {
                write!(f, "Scene body for {} injected into {}", scene_id, path.display())
            }
            PhaseOutcome::QcRecorded {
                scene_id,
                passed: true,
                score,
                ..
            } => write!(f, "QC {}: passed (score {:.2})", scene_id, score),
            PhaseOutcome::QcRecorded {
                scene_id,
                passed: false,
                score,
                critical,
            } => write!(
                f,
                "QC {}: failed (score {:.2}, {} critical issues)",
                scene_id, score, critical
            ),
        }
    }
}

/// Validated inputs for the phase about to run.
#[derive(Debug, Clone)]
pub enum PhaseInputs {
    Plan {
        topic: String,
    },
    Narration {
        plan: Value,
    },
    BuildScenes {
        spec: SceneSpec,
        scene_file: PathBuf,
        scene_id: String,
    },
    SceneQc {
        scene_file: PathBuf,
        scene_id: String,
        content: String,
    },
    SceneRepair {
        failure_reason: String,
        scene_file: PathBuf,
        scene_id: String,
        content: String,
    },
}

impl PhaseInputs {
    fn scene_id(&self) -> Option<&str> {
        match self {
            PhaseInputs::BuildScenes { scene_id, .. }
            | PhaseInputs::SceneQc { scene_id, .. }
            | PhaseInputs::SceneRepair { scene_id, .. } => Some(scene_id),
            PhaseInputs::Plan { .. } | PhaseInputs::Narration { .. } => None,
        }
    }
}

/// Scene identifier from a scene file name: `scene_01_intro.py` is `scene_01`.
/// Names that do not follow the `scene_<nn>` pattern keep their full stem.
pub fn scene_id_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut parts = stem.splitn(3, '_');
    match (parts.next(), parts.next()) {
        (Some("scene"), Some(number))
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) =>
        {
            format!("scene_{}", number)
        }
        _ => stem,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Check that every required input of `args.phase` is present and load what
/// the turn needs from disk.
pub fn resolve_inputs(args: &PhaseArgs, state: &ProjectStateStore) -> HarnessResult<PhaseInputs> {
    let stored_plan = if args.phase.required_inputs().contains(&PhaseInput::StoredPlan) {
        state.get("plan")?.filter(|plan| !plan.is_null())
    } else {
        None
    };

    let missing: Vec<&str> = args
        .phase
        .required_inputs()
        .iter()
        .filter(|input| match input {
            PhaseInput::Topic => non_empty(args.topic.as_deref()).is_none(),
            PhaseInput::SceneSpec => non_empty(args.scene_spec.as_deref()).is_none(),
            PhaseInput::SceneFile => args.scene_file.is_none(),
            PhaseInput::RetryContext => args.retry_context().is_none(),
            PhaseInput::StoredPlan => stored_plan.is_none(),
        })
        .map(|input| input.display_name())
        .collect();

    if !missing.is_empty() {
        let verb = if missing.len() == 1 { "is" } else { "are" };
        return Err(HarnessError::MissingArgument(format!(
            "{} {} required for the '{}' phase.",
            missing.join(" and "),
            verb,
            args.phase
        )));
    }

    let scene_file = args.scene_file.clone().unwrap_or_default();
    let scene_id = scene_id_from_path(&scene_file);

    let inputs = match args.phase {
        Phase::Plan => {
            // An unreadable state document would lose the plan after the turn.
            state.load()?;
            PhaseInputs::Plan {
                topic: args.topic.clone().unwrap_or_default(),
            }
        }
        Phase::Narration => PhaseInputs::Narration {
            plan: stored_plan.unwrap_or_default(),
        },
        Phase::BuildScenes => {
            let spec = SceneSpec::parse(args.scene_spec.as_deref().unwrap_or_default())?;
            // Fail on a broken scaffold before spending a turn on it.
            read_scene_body(&scene_file)?;
            PhaseInputs::BuildScenes {
                spec,
                scene_file,
                scene_id,
            }
        }
        Phase::SceneQc => {
            state.load()?;
            let content = fs::read_to_string(&scene_file).map_err(|e| {
                HarnessError::structural(&scene_file, format!("Cannot read scene file: {}", e))
            })?;
            PhaseInputs::SceneQc {
                scene_file,
                scene_id,
                content,
            }
        }
        Phase::SceneRepair => {
            read_scene_body(&scene_file)?;
            let content = fs::read_to_string(&scene_file).map_err(|e| {
                HarnessError::structural(&scene_file, format!("Cannot read scene file: {}", e))
            })?;
            PhaseInputs::SceneRepair {
                failure_reason: args.retry_context().unwrap_or_default().to_string(),
                scene_file,
                scene_id,
                content,
            }
        }
    };
    Ok(inputs)
}

/// Run one phase invocation end to end against the xAI backend.
pub async fn run_phase(args: &PhaseArgs) -> HarnessResult<PhaseOutcome> {
    let config = Config::new(&args.project_dir, args.model.clone())?;
    for warning in config.validate() {
        warn!("{}", warning);
    }

    let mut session = ConversationSession::resume_or_create(&config.project_dir)?;
    if args.dry_run {
        info!(
            phase = %args.phase,
            collections = ?session.collection_ids(),
            anchor = ?session.last_response_id(),
            "Dry run, no turn issued"
        );
        return Ok(PhaseOutcome::DryRun);
    }

    let state = ProjectStateStore::new(&config.state_file);
    let inputs = resolve_inputs(args, &state)?;
    let backend = XaiBackend::from_config(&config)?;

    execute(
        &config,
        &mut session,
        &backend,
        inputs,
        args.retry_context(),
    )
    .await
}

/// Issue the turn for already resolved inputs, persist its artifact and
/// record the audit trail.
pub async fn execute(
    config: &Config,
    session: &mut ConversationSession,
    backend: &dyn GenerationBackend,
    inputs: PhaseInputs,
    retry_context: Option<&str>,
) -> HarnessResult<PhaseOutcome> {
    let phase = match &inputs {
        PhaseInputs::Plan { .. } => Phase::Plan,
        PhaseInputs::Narration { .. } => Phase::Narration,
        PhaseInputs::BuildScenes { .. } => Phase::BuildScenes,
        PhaseInputs::SceneQc { .. } => Phase::SceneQc,
        PhaseInputs::SceneRepair { .. } => Phase::SceneRepair,
    };
    let mut audit = TurnAudit::new(
        phase,
        &config.model,
        session.last_response_id().map(str::to_string),
    )
    .with_scene(inputs.scene_id().map(str::to_string));

    let renderer = PromptRenderer::new(config.prompts_dir.clone());
    let mut generator = Generator::new(backend, &renderer, config.validation());
    let state = ProjectStateStore::new(&config.state_file);

    let result = run_inputs(&mut generator, session, &state, inputs, retry_context).await;

    let outcome = match &result {
        Ok(_) => TurnOutcome::Advanced,
        Err(e) => TurnOutcome::from_error(e),
    };
    audit.finish(generator.last_sampled_id().map(str::to_string), outcome);
    match AuditLogger::new(&config.audit_dir).write(&audit) {
        Ok(path) => info!(path = %path.display(), "Audit record written"),
        Err(e) => warn!(error = %e, "Failed to write audit record"),
    }

    result
}

async fn run_inputs(
    generator: &mut Generator<'_>,
    session: &mut ConversationSession,
    state: &ProjectStateStore,
    inputs: PhaseInputs,
    retry_context: Option<&str>,
) -> HarnessResult<PhaseOutcome> {
    match inputs {
        PhaseInputs::Plan { topic } => {
            state.load()?;
            let result = generator.generate_plan(session, &topic, retry_context).await?;
            let scenes = result.payload.scenes.len();
            state.merge("plan", to_state_value(&result.payload)?)?;
            Ok(PhaseOutcome::PlanWritten {
                path: state.path().to_path_buf(),
                scenes,
            })
        }
        PhaseInputs::Narration { plan } => {
            state.load()?;
            let result = generator
                .generate_narration(session, &plan, retry_context)
                .await?;
            let scenes = result.payload.scenes.len();
            state.merge("narration", to_state_value(&result.payload)?)?;
            Ok(PhaseOutcome::NarrationWritten {
                path: state.path().to_path_buf(),
                scenes,
            })
        }
        PhaseInputs::BuildScenes {
            spec,
            scene_file,
            scene_id,
        } => {
            let result = generator
                .generate_scene(session, &spec, &scene_id, retry_context)
                .await?;
            inject_scene_body(&scene_file, &result.payload.scene_body)?;
            Ok(PhaseOutcome::SceneInjected {
                path: scene_file,
                scene_id,
            })
        }
        PhaseInputs::SceneQc {
            scene_id, content, ..
        } => {
            state.load()?;
            let result = generator
                .run_scene_qc(session, &scene_id, &content, retry_context)
                .await?;
            let report = &result.payload;
            state.merge_nested("scene_qc", &scene_id, to_state_value(report)?)?;
            Ok(PhaseOutcome::QcRecorded {
                passed: report.passed,
                score: report.score,
                critical: report.critical_issues().count(),
                scene_id,
            })
        }
        PhaseInputs::SceneRepair {
            failure_reason,
            scene_file,
            scene_id,
            content,
        } => {
            let result = generator
                .repair_scene(session, &scene_id, &content, &failure_reason)
                .await?;
            inject_scene_body(&scene_file, &result.payload.scene_body)?;
            Ok(PhaseOutcome::SceneInjected {
                path: scene_file,
                scene_id,
            })
        }
    }
}

fn to_state_value<T: serde::Serialize>(payload: &T) -> HarnessResult<Value> {
    serde_json::to_value(payload).map_err(|e| HarnessError::Operational(anyhow::Error::new(e)))
}
