//! Phase definitions for the generation pipeline.
//!
//! A phase is stateless configuration: which prompt templates it renders,
//! which inputs it needs, which schema the model must answer in, and whether
//! web search augments retrieval for the turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schemas::{Narration, Plan, SceneBuild, SceneQc, StructuredOutput};

/// One named stage of the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Phase {
    Plan,
    Narration,
    BuildScenes,
    SceneQc,
    SceneRepair,
}

/// An input a phase cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInput {
    /// `--topic`
    Topic,
    /// `--scene-spec`
    SceneSpec,
    /// `--scene-file`
    SceneFile,
    /// `--retry-context`
    RetryContext,
    /// The `plan` slot of the project state
    StoredPlan,
}

impl PhaseInput {
    /// How the input is named in error messages.
    pub fn display_name(self) -> &'static str {
        match self {
            PhaseInput::Topic => "--topic",
            PhaseInput::SceneSpec => "--scene-spec",
            PhaseInput::SceneFile => "--scene-file",
            PhaseInput::RetryContext => "--retry-context",
            PhaseInput::StoredPlan => "plan in project state",
        }
    }
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Phase; 5] = [
        Phase::Plan,
        Phase::Narration,
        Phase::BuildScenes,
        Phase::SceneQc,
        Phase::SceneRepair,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::Narration => "narration",
            Phase::BuildScenes => "build_scenes",
            Phase::SceneQc => "scene_qc",
            Phase::SceneRepair => "scene_repair",
        }
    }

    /// Prompt template key rendered for this phase.
    pub fn template_key(self) -> &'static str {
        match self {
            Phase::Plan => "00_plan",
            Phase::Narration => "02_narration",
            Phase::BuildScenes => "04_build_scenes",
            Phase::SceneQc => "05_scene_qc",
            Phase::SceneRepair => "06_scene_repair",
        }
    }

    /// Research-heavy phases get web search on top of collections retrieval.
    pub fn uses_web_search(self) -> bool {
        matches!(self, Phase::Plan | Phase::Narration)
    }

    pub fn required_inputs(self) -> &'static [PhaseInput] {
        match self {
            Phase::Plan => &[PhaseInput::Topic],
            Phase::Narration => &[PhaseInput::StoredPlan],
            Phase::BuildScenes => &[PhaseInput::SceneSpec, PhaseInput::SceneFile],
            Phase::SceneQc => &[PhaseInput::SceneFile],
            Phase::SceneRepair => &[PhaseInput::RetryContext, PhaseInput::SceneFile],
        }
    }

    /// Name attached to the structured-output request.
    pub fn schema_name(self) -> &'static str {
        match self {
            Phase::Plan => Plan::NAME,
            Phase::Narration => Narration::NAME,
            Phase::BuildScenes | Phase::SceneRepair => SceneBuild::NAME,
            Phase::SceneQc => SceneQc::NAME,
        }
    }

    /// JSON Schema the model output must conform to.
    pub fn schema(self) -> Value {
        match self {
            Phase::Plan => Plan::output_schema(),
            Phase::Narration => Narration::output_schema(),
            Phase::BuildScenes | Phase::SceneRepair => SceneBuild::output_schema(),
            Phase::SceneQc => SceneQc::output_schema(),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid phase '{}'. Valid values: plan, narration, build_scenes, scene_qc, scene_repair",
                    s
                )
            })
    }
}
