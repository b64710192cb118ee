use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{StructuredOutput, check_len, check_range};

/// One scene of the video plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Scene title
    pub title: String,
    /// Educational content description
    pub description: String,
    #[schemars(range(min = 20, max = 45))]
    pub estimated_duration_seconds: u32,
    /// Animation concepts
    pub visual_ideas: Vec<String>,
}

/// The video plan produced by the `plan` phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// Video title
    pub title: String,
    /// Video overview
    pub description: String,
    #[schemars(range(min = 480, max = 960))]
    pub target_duration_seconds: u32,
    #[schemars(length(min = 12, max = 24))]
    pub scenes: Vec<Scene>,
}

impl StructuredOutput for Plan {
    const NAME: &'static str = "plan";

    fn check_constraints(&self) -> Result<(), String> {
        check_range("target_duration_seconds", self.target_duration_seconds, 480, 960)?;
        check_len("scenes", self.scenes.len(), 12, 24)?;
        for (i, scene) in self.scenes.iter().enumerate() {
            check_range(
                &format!("scenes[{}].estimated_duration_seconds", i),
                scene.estimated_duration_seconds,
                20,
                45,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan(scene_count: usize) -> Plan {
        Plan {
            title: "Test Video".into(),
            description: "A test plan".into(),
            target_duration_seconds: 600,
            scenes: (0..scene_count)
                .map(|i| Scene {
                    title: format!("Test Scene {}", i + 1),
                    description: "An intro".into(),
                    estimated_duration_seconds: 30,
                    visual_ideas: vec!["idea1".into(), "idea2".into()],
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_plan_passes() {
        assert!(sample_plan(12).check_constraints().is_ok());
        assert!(sample_plan(24).check_constraints().is_ok());
    }

    #[test]
    fn test_too_few_scenes_rejected() {
        let err = sample_plan(1).check_constraints().unwrap_err();
        assert!(err.contains("scenes"));
    }

    #[test]
    fn test_scene_duration_out_of_range_names_index() {
        let mut plan = sample_plan(12);
        plan.scenes[3].estimated_duration_seconds = 90;
        let err = plan.check_constraints().unwrap_err();
        assert!(err.starts_with("scenes[3].estimated_duration_seconds"));
    }

    #[test]
    fn test_target_duration_checked() {
        let mut plan = sample_plan(12);
        plan.target_duration_seconds = 100;
        assert!(plan.check_constraints().unwrap_err().contains("target_duration_seconds"));
    }

    #[test]
    fn test_schema_carries_bounds() {
        let schema = Plan::output_schema();
        let scenes = &schema["properties"]["scenes"];
        assert_eq!(scenes["minItems"], 12);
        assert_eq!(scenes["maxItems"], 24);
        assert_eq!(schema["properties"]["target_duration_seconds"]["minimum"], 480.0);
    }
}
