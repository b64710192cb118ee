//! Layered configuration for the harness.
//!
//! Settings are resolved file → environment → CLI. The optional file lives at
//! `<project>/harness.toml`:
//!
//! ```toml
//! [model]
//! name = "grok-4-1-fast-reasoning"
//! base_url = "https://api.x.ai/v1"
//! api_key_env = "XAI_API_KEY"
//! timeout_secs = 600
//!
//! [validation]
//! timing_marker = "run_time"
//! collections_prefix = "collections://"
//!
//! [prompts]
//! dir = "prompts"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{HarnessError, HarnessResult};

/// Persisted conversation record, relative to the project directory.
pub const SESSION_FILE: &str = ".xai_session.json";
/// Collection metadata written at project initialization.
pub const METADATA_FILE: &str = ".collections_metadata.json";
/// Durable key/value project state.
pub const STATE_FILE: &str = "project_state.json";
/// Optional harness settings file.
pub const CONFIG_FILE: &str = "harness.toml";
/// Directory for harness-owned bookkeeping (audit trail).
pub const HARNESS_DIR: &str = ".harness";

/// Model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Transport timeout for one turn; unset means the client default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_model_name() -> String {
    "grok-4-1-fast-reasoning".to_string()
}

fn default_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_api_key_env() -> String {
    "XAI_API_KEY".to_string()
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: None,
        }
    }
}

/// Business-rule knobs for the semantic validators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    /// Substring that proves a timing computation was executed
    #[serde(default = "default_timing_marker")]
    pub timing_marker: String,
    /// Citation prefix identifying retrieval-collection sources
    #[serde(default = "default_collections_prefix")]
    pub collections_prefix: String,
}

fn default_timing_marker() -> String {
    "run_time".to_string()
}

fn default_collections_prefix() -> String {
    "collections://".to_string()
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            timing_marker: default_timing_marker(),
            collections_prefix: default_collections_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsSection {
    /// Directory holding `<key>.system.md` / `<key>.user.md` overrides
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// The complete harness.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessToml {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub validation: ValidationSection,
    #[serde(default)]
    pub prompts: PromptsSection,
}

impl HarnessToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse harness.toml")
    }

    /// Load `<project>/harness.toml`, or defaults when it doesn't exist.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.model.name.trim().is_empty() {
            warnings.push("model.name is empty".to_string());
        }
        if !self.model.base_url.starts_with("http://")
            && !self.model.base_url.starts_with("https://")
        {
            warnings.push(format!(
                "model.base_url '{}' is not an http(s) URL",
                self.model.base_url
            ));
        }
        if self.model.timeout_secs == Some(0) {
            warnings.push("model.timeout_secs = 0 disables every request".to_string());
        }
        if self.validation.timing_marker.is_empty() {
            warnings.push(
                "validation.timing_marker is empty; every code execution will pass".to_string(),
            );
        }
        warnings
    }
}

/// Runtime configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub state_file: PathBuf,
    pub audit_dir: PathBuf,
    /// Resolved prompt override directory, if configured
    pub prompts_dir: Option<PathBuf>,
    pub model: String,
    pub base_url: String,
    toml: HarnessToml,
}

impl Config {
    /// Resolve configuration for a project.
    ///
    /// `model_override` comes from the CLI and beats `HARNESS_MODEL`, which in
    /// turn beats the file.
    pub fn new(project_dir: &Path, model_override: Option<String>) -> Result<Self> {
        let project_dir = project_dir.canonicalize().with_context(|| {
            format!(
                "Failed to resolve project directory: {}",
                project_dir.display()
            )
        })?;
        let toml = HarnessToml::load_or_default(&project_dir)?;

        let model = model_override
            .or_else(|| std::env::var("HARNESS_MODEL").ok())
            .unwrap_or_else(|| toml.model.name.clone());
        let base_url = std::env::var("XAI_BASE_URL")
            .ok()
            .unwrap_or_else(|| toml.model.base_url.clone());
        let prompts_dir = toml.prompts.dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                project_dir.join(dir)
            }
        });

        Ok(Self {
            state_file: project_dir.join(STATE_FILE),
            audit_dir: project_dir.join(HARNESS_DIR).join("audit"),
            prompts_dir,
            model,
            base_url,
            project_dir,
            toml,
        })
    }

    pub fn validation(&self) -> &ValidationSection {
        &self.toml.validation
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.toml.model.timeout_secs.map(Duration::from_secs)
    }

    /// API key for the generation endpoint.
    ///
    /// Only asked for when a turn is about to be issued, so dry runs work
    /// without credentials.
    pub fn api_key(&self) -> HarnessResult<String> {
        let var = &self.toml.model.api_key_env;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(HarnessError::Configuration(format!(
                "{} is not set; cannot contact the generation endpoint",
                var
            ))),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_no_file() {
        let dir = tempdir().unwrap();
        let toml = HarnessToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.model.name, "grok-4-1-fast-reasoning");
        assert_eq!(toml.model.api_key_env, "XAI_API_KEY");
        assert_eq!(toml.validation.timing_marker, "run_time");
        assert_eq!(toml.validation.collections_prefix, "collections://");
        assert!(toml.prompts.dir.is_none());
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let toml = HarnessToml::parse(
            r#"
            [model]
            timeout_secs = 120

            [validation]
            timing_marker = "wait("
            "#,
        )
        .unwrap();
        assert_eq!(toml.model.timeout_secs, Some(120));
        assert_eq!(toml.model.base_url, "https://api.x.ai/v1");
        assert_eq!(toml.validation.timing_marker, "wait(");
        assert_eq!(toml.validation.collections_prefix, "collections://");
    }

    #[test]
    fn test_parse_invalid_toml_is_error() {
        let result = HarnessToml::parse("[model\nname = ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("harness.toml"));
    }

    #[test]
    fn test_validate_reports_bad_values() {
        let toml = HarnessToml::parse(
            r#"
            [model]
            base_url = "ftp://example"
            timeout_secs = 0
            "#,
        )
        .unwrap();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("ftp://example"));
    }

    #[test]
    fn test_config_paths_live_in_project_dir() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path(), Some("test-model".into())).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.state_file, root.join("project_state.json"));
        assert_eq!(config.audit_dir, root.join(".harness/audit"));
        assert_eq!(config.model, "test-model");
    }

    #[test]
    fn test_config_relative_prompts_dir_resolved_against_project() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("harness.toml"),
            "[prompts]\ndir = \"my_prompts\"\n",
        )
        .unwrap();
        let config = Config::new(dir.path(), None).unwrap();
        assert_eq!(
            config.prompts_dir,
            Some(dir.path().canonicalize().unwrap().join("my_prompts"))
        );
    }

    #[test]
    fn test_config_missing_project_dir_is_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = Config::new(&missing, None).unwrap_err();
        assert!(err.to_string().contains("Failed to resolve project directory"));
    }

    #[test]
    fn test_api_key_missing_is_configuration_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("harness.toml"),
            "[model]\napi_key_env = \"HARNESS_TEST_KEY_THAT_IS_NEVER_SET\"\n",
        )
        .unwrap();
        let config = Config::new(dir.path(), None).unwrap();
        let err = config.api_key().unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
        assert!(err.to_string().contains("HARNESS_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
