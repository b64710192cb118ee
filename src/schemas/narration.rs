use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::StructuredOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NarrationScene {
    pub scene_title: String,
    /// The narration script for this scene
    pub narration_text: String,
}

/// Narration script for every planned scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Narration {
    pub scenes: Vec<NarrationScene>,
}

impl StructuredOutput for Narration {
    const NAME: &'static str = "narration";

    fn check_constraints(&self) -> Result<(), String> {
        if self.scenes.is_empty() {
            return Err("scenes: expected at least 1 item, got 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_narration_rejected() {
        let narration = Narration { scenes: vec![] };
        assert!(narration.check_constraints().is_err());
    }

    #[test]
    fn test_decodes_from_model_json() {
        let narration: Narration = serde_json::from_str(
            r#"{"scenes":[{"scene_title":"Intro","narration_text":"Welcome."}]}"#,
        )
        .unwrap();
        assert_eq!(narration.scenes[0].narration_text, "Welcome.");
        assert!(narration.check_constraints().is_ok());
    }
}
