use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{StructuredOutput, check_range};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QcIssue {
    /// Time code of the issue, e.g. 00:15-00:18
    pub time_code: String,
    pub description: String,
    /// critical, major or minor
    pub severity: String,
}

/// Quality review of one rendered scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneQc {
    pub scene_title: String,
    pub passed: bool,
    /// Quality score from 0.0 to 1.0
    #[schemars(range(min = 0.0, max = 1.0))]
    pub score: f64,
    pub issues: Vec<QcIssue>,
}

impl SceneQc {
    /// Issues rated critical.
    pub fn critical_issues(&self) -> impl Iterator<Item = &QcIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity.eq_ignore_ascii_case("critical"))
    }
}

impl StructuredOutput for SceneQc {
    const NAME: &'static str = "scene_qc";

    fn check_constraints(&self) -> Result<(), String> {
        if self.score.is_nan() {
            return Err("score: NaN is outside 0..=1".to_string());
        }
        check_range("score", self.score, 0.0, 1.0)
    }
}
