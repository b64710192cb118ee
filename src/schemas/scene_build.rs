use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::StructuredOutput;

/// Generated scene code, returned by both `build_scenes` and `scene_repair`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneBuild {
    /// Python code for scene body (no imports, no class wrapper)
    pub scene_body: String,
    /// Explanation of visual choices and animation strategy
    pub reasoning: String,
}

impl StructuredOutput for SceneBuild {
    const NAME: &'static str = "scene_build";
}

/// Scene description passed to `build_scenes` via `--scene-spec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSpec {
    pub title: String,
    pub description: String,
    /// Seconds of narration the animation has to cover
    pub narration_duration: f64,
    #[serde(default)]
    pub visual_ideas: Vec<String>,
}

impl SceneSpec {
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        serde_json::from_str(json).context("--scene-spec is not a valid scene specification")
    }
}
