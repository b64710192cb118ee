//! Conversation session: the continuation anchor shared by every phase of a project.
//!
//! A session is resumed from `.xai_session.json` when present, otherwise
//! bootstrapped from the collection ids in `.collections_metadata.json`.
//! The only operation that changes it is [`ConversationSession::advance`],
//! which the drivers call after a turn passed both schema and semantic
//! validation.
//!
//! There is no cross-process exclusion: concurrent invocations against the
//! same project must be serialized by the caller with an external lock.

mod metadata;
mod record;

pub use metadata::{DocumentRecord, ProjectMetadata};
pub use record::SessionRecord;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{METADATA_FILE, SESSION_FILE};
use crate::errors::HarnessResult;
use crate::phase::Phase;

/// A server-side capability attached to a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    CollectionsSearch { collection_ids: Vec<String> },
    CodeExecution,
    WebSearch,
}

/// Target structured-output schema for a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: Value,
}

impl ResponseFormat {
    pub fn for_phase(phase: Phase) -> Self {
        Self {
            name: phase.schema_name().to_string(),
            schema: phase.schema(),
        }
    }
}

/// Everything a backend needs to continue the conversation for one turn,
/// apart from the prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnHandle {
    pub phase: Phase,
    pub tools: Vec<Tool>,
    /// `None` on the first turn of a project
    pub previous_response_id: Option<String>,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    session_file: PathBuf,
    collection_ids: Vec<String>,
    last_response_id: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl ConversationSession {
    /// Resume the persisted session of `project_root`, or start a fresh one
    /// from the project's collection metadata.
    ///
    /// Nothing is written here; a fresh session only reaches disk on its
    /// first [`advance`](Self::advance).
    pub fn resume_or_create(project_root: &Path) -> HarnessResult<Self> {
        let session_file = project_root.join(SESSION_FILE);

        if let Some(record) = SessionRecord::load(&session_file)? {
            debug!(
                path = %session_file.display(),
                response_id = ?record.response_id,
                "Resumed session"
            );
            return Ok(Self {
                session_file,
                collection_ids: record.collection_ids,
                last_response_id: record.response_id,
                updated_at: record.updated_at,
            });
        }

        let metadata = ProjectMetadata::load(&project_root.join(METADATA_FILE))?;
        debug!(
            template = %metadata.template_collection_id,
            project = %metadata.project_collection_id,
            "Created session from collection metadata"
        );
        Ok(Self {
            session_file,
            collection_ids: metadata.collection_ids(),
            last_response_id: None,
            updated_at: None,
        })
    }

    pub fn collection_ids(&self) -> &[String] {
        &self.collection_ids
    }

    pub fn last_response_id(&self) -> Option<&str> {
        self.last_response_id.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Prepare a turn for `phase`, anchored on the last accepted response.
    pub fn begin_turn(
        &self,
        phase: Phase,
        response_format: ResponseFormat,
        augment_with_web_search: bool,
    ) -> TurnHandle {
        let mut tools = vec![
            Tool::CollectionsSearch {
                collection_ids: self.collection_ids.clone(),
            },
            Tool::CodeExecution,
        ];
        if augment_with_web_search {
            tools.push(Tool::WebSearch);
        }

        TurnHandle {
            phase,
            tools,
            previous_response_id: self.last_response_id.clone(),
            response_format,
        }
    }

    /// Record `response_id` as the new continuation anchor.
    ///
    /// The record is persisted first; in-memory state only changes once the
    /// write has landed, so a failed write leaves both untouched.
    pub fn advance(&mut self, response_id: impl Into<String>) -> HarnessResult<()> {
        let response_id = response_id.into();
        let record = SessionRecord {
            response_id: Some(response_id.clone()),
            collection_ids: self.collection_ids.clone(),
            updated_at: Some(Utc::now()),
        };
        record.save(&self.session_file)?;

        info!(
            previous = ?self.last_response_id,
            current = %response_id,
            "Session advanced"
        );
        self.last_response_id = record.response_id;
        self.updated_at = record.updated_at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HarnessError;
    use std::fs;
    use tempfile::tempdir;

    fn write_metadata(dir: &Path, template: &str, project: &str) {
        ProjectMetadata::new(template, project)
            .save(&dir.join(METADATA_FILE))
            .unwrap();
    }

    fn plan_format() -> ResponseFormat {
        ResponseFormat::for_phase(Phase::Plan)
    }

    #[test]
    fn test_fresh_session_from_metadata() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), "T1", "P1");

        let session = ConversationSession::resume_or_create(dir.path()).unwrap();
        assert_eq!(session.collection_ids(), ["T1", "P1"]);
        assert!(session.last_response_id().is_none());
        assert!(!dir.path().join(SESSION_FILE).exists());
    }

    #[test]
    fn test_missing_metadata_is_configuration_error() {
        let dir = tempdir().unwrap();
        let err = ConversationSession::resume_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_advance_persists_record() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), "T1", "P1");

        let mut session = ConversationSession::resume_or_create(dir.path()).unwrap();
        session.advance("R1").unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SESSION_FILE)).unwrap())
                .unwrap();
        assert_eq!(raw["response_id"], "R1");
        assert_eq!(raw["collection_ids"], serde_json::json!(["T1", "P1"]));
        assert!(raw["updated_at"].is_string());
        assert_eq!(session.last_response_id(), Some("R1"));
    }

    #[test]
    fn test_resume_is_idempotent() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), "T1", "P1");
        ConversationSession::resume_or_create(dir.path())
            .unwrap()
            .advance("R7")
            .unwrap();

        let first = ConversationSession::resume_or_create(dir.path()).unwrap();
        let second = ConversationSession::resume_or_create(dir.path()).unwrap();
        assert_eq!(first.last_response_id(), Some("R7"));
        assert_eq!(first.last_response_id(), second.last_response_id());
        assert_eq!(first.collection_ids(), second.collection_ids());
        assert_eq!(first.updated_at(), second.updated_at());
    }

    #[test]
    fn test_resumed_session_ignores_changed_metadata() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), "T1", "P1");
        ConversationSession::resume_or_create(dir.path())
            .unwrap()
            .advance("R1")
            .unwrap();

        write_metadata(dir.path(), "T9", "P9");
        let session = ConversationSession::resume_or_create(dir.path()).unwrap();
        assert_eq!(session.collection_ids(), ["T1", "P1"]);
    }

    #[test]
    fn test_begin_turn_tools() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), "T1", "P1");
        let session = ConversationSession::resume_or_create(dir.path()).unwrap();

        let turn = session.begin_turn(Phase::Plan, plan_format(), true);
        assert_eq!(
            turn.tools,
            vec![
                Tool::CollectionsSearch {
                    collection_ids: vec!["T1".into(), "P1".into()]
                },
                Tool::CodeExecution,
                Tool::WebSearch,
            ]
        );
        assert!(turn.previous_response_id.is_none());

        let turn = session.begin_turn(
            Phase::BuildScenes,
            ResponseFormat::for_phase(Phase::BuildScenes),
            false,
        );
        assert!(!turn.tools.contains(&Tool::WebSearch));
        assert_eq!(turn.response_format.name, "scene_build");
    }

    #[test]
    fn test_begin_turn_anchors_on_last_response() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), "T1", "P1");
        let mut session = ConversationSession::resume_or_create(dir.path()).unwrap();
        session.advance("R1").unwrap();
        session.advance("R2").unwrap();

        let turn = session.begin_turn(Phase::Narration, plan_format(), true);
        assert_eq!(turn.previous_response_id.as_deref(), Some("R2"));
    }

    #[test]
    fn test_tool_wire_format() {
        let json = serde_json::to_value(Tool::CollectionsSearch {
            collection_ids: vec!["T1".into()],
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "collections_search", "collection_ids": ["T1"]})
        );
        assert_eq!(
            serde_json::to_value(Tool::CodeExecution).unwrap(),
            serde_json::json!({"type": "code_execution"})
        );
    }

    #[test]
    fn test_failed_advance_leaves_previous_record() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), "T1", "P1");
        let mut session = ConversationSession::resume_or_create(dir.path()).unwrap();
        session.advance("R1").unwrap();
        let before = fs::read_to_string(dir.path().join(SESSION_FILE)).unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(dir.path().join(format!(".{}.tmp", SESSION_FILE))).unwrap();
        assert!(session.advance("R2").is_err());

        assert_eq!(session.last_response_id(), Some("R1"));
        assert_eq!(
            fs::read_to_string(dir.path().join(SESSION_FILE)).unwrap(),
            before
        );
    }
}
