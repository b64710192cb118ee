//! Prompt templates for each phase.
//!
//! Templates use `{{name}}` placeholders. Built-in templates can be replaced
//! per project by dropping `<key>.system.md` or `<key>.user.md` into the
//! configured prompts directory.

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Values substituted into a template.
pub type PromptVars = BTreeMap<&'static str, String>;

/// System and user prompt for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

struct Template {
    key: &'static str,
    system: &'static str,
    user: &'static str,
}

const BUILTIN_TEMPLATES: &[Template] = &[
    Template {
        key: "00_plan",
        system: "You are planning a long-form educational video. Ground the structure in the \
                 template collection and research the topic with web search before committing \
                 to a scene list.",
        user: "Create a video plan for the topic: {{topic}}\n\n\
               Aim for 8 to 16 minutes in total, split into 12 to 24 scenes of 20 to 45 seconds \
               each. Give every scene a title, a description and a few concrete visual ideas.",
    },
    Template {
        key: "02_narration",
        system: "You write narration for educational videos. Narration is spoken aloud, so keep \
                 sentences short and concrete and match the pacing of each scene.",
        user: "Write the narration for every scene of this plan, in order:\n\n{{plan}}\n\n\
               Return one entry per scene with its exact title.",
    },
    Template {
        key: "04_build_scenes",
        system: "You write the body of an animation scene. Return only the statements that go \
                 inside construct(): no imports and no class wrapper. Follow the patterns of the \
                 template collection. Before answering, use code execution to check that the \
                 summed run_time of your animations covers the narration.",
        user: "Scene: {{scene_title}}\n\
               Description: {{scene_description}}\n\
               Narration duration: {{narration_duration}} seconds\n\
               Visual ideas: {{visual_ideas}}",
    },
    Template {
        key: "05_scene_qc",
        system: "You review rendered animation scenes for visual defects: overlapping text, \
                 elements leaving the frame, timing that drifts from the narration. Score from \
                 0.0 to 1.0 and list every issue with a time code and a severity of critical, \
                 major or minor.",
        user: "Review scene {{scene_id}}. Current source:\n\n```python\n{{scene_file_content}}\n```",
    },
    Template {
        key: "06_scene_repair",
        system: "You repair animation scenes that failed validation. Return a complete \
                 replacement for the scene body: no imports and no class wrapper. Keep what \
                 worked and fix the reported failure.",
        user: "The scene below failed with:\n\n{{failure_reason}}\n\n\
               Current source:\n\n```python\n{{scene_file_content}}\n```",
    },
];

/// Replace every `{{name}}` with its value. Unknown names stay verbatim.
pub fn render_template(template: &str, vars: &PromptVars) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn retry_section(retry_context: &str) -> String {
    format!(
        "\n\n## Previous Attempt Failed\n\n{}\n\nAddress this failure in your answer.",
        retry_context.trim()
    )
}

pub struct PromptRenderer {
    overrides_dir: Option<PathBuf>,
}

impl PromptRenderer {
    pub fn new(overrides_dir: Option<PathBuf>) -> Self {
        Self { overrides_dir }
    }

    /// Render the templates stored under `key`.
    ///
    /// When `retry_context` is given, a section describing the previous
    /// failure is appended to the user prompt.
    pub fn render(
        &self,
        key: &str,
        vars: &PromptVars,
        retry_context: Option<&str>,
    ) -> Result<RenderedPrompt> {
        let builtin = BUILTIN_TEMPLATES.iter().find(|t| t.key == key);
        let system = self.load_part(key, "system", builtin.map(|t| t.system))?;
        let user = self.load_part(key, "user", builtin.map(|t| t.user))?;

        let mut user = render_template(&user, vars);
        if let Some(retry) = retry_context.filter(|r| !r.trim().is_empty()) {
            user.push_str(&retry_section(retry));
        }

        Ok(RenderedPrompt {
            system: render_template(&system, vars),
            user,
        })
    }

    fn load_part(&self, key: &str, part: &str, builtin: Option<&str>) -> Result<String> {
        if let Some(path) = self.override_path(key, part)
            && path.exists()
        {
            debug!(path = %path.display(), "Using prompt override");
            return fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt override {}", path.display()));
        }
        match builtin {
            Some(text) => Ok(text.to_string()),
            None => bail!("Unknown prompt template '{}'", key),
        }
    }

    fn override_path(&self, key: &str, part: &str) -> Option<PathBuf> {
        self.overrides_dir
            .as_deref()
            .map(|dir: &Path| dir.join(format!("{}.{}.md", key, part)))
    }
}
