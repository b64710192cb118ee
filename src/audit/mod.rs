//! Per-invocation turn audit records.
//!
//! The session only ever holds accepted response ids. Rejected turns still
//! leave a trace here, including the id the backend returned, so divergence
//! between the local anchor and the upstream conversation can be inspected.

mod logger;

pub use logger::AuditLogger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ErrorKind, HarnessError};
use crate::phase::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Accepted; the session now points at `response_id`.
    Advanced,
    SchemaRejected { message: String },
    SemanticRejected { message: String },
    Failed { message: String },
}

impl TurnOutcome {
    pub fn from_error(err: &HarnessError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::SchemaValidation => TurnOutcome::SchemaRejected { message },
            ErrorKind::SemanticValidation => TurnOutcome::SemanticRejected { message },
            _ => TurnOutcome::Failed { message },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnAudit {
    pub run_id: Uuid,
    pub phase: Phase,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    /// Continuation anchor the turn was sent with
    pub anchor_response_id: Option<String>,
    /// Id returned by the backend, whether or not it was accepted
    pub response_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub outcome: Option<TurnOutcome>,
}

impl TurnAudit {
    pub fn new(phase: Phase, model: impl Into<String>, anchor_response_id: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase,
            model: model.into(),
            scene_id: None,
            anchor_response_id,
            response_id: None,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            outcome: None,
        }
    }

    pub fn with_scene(mut self, scene_id: Option<String>) -> Self {
        self.scene_id = scene_id;
        self
    }

    pub fn finish(&mut self, response_id: Option<String>, outcome: TurnOutcome) {
        let ended_at = Utc::now();
        self.duration_ms = Some((ended_at - self.started_at).num_milliseconds());
        self.ended_at = Some(ended_at);
        self.response_id = response_id;
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_error_kind() {
        assert_eq!(
            TurnOutcome::from_error(&HarnessError::semantic("no timing")),
            TurnOutcome::SemanticRejected {
                message: "no timing".into()
            }
        );
        assert!(matches!(
            TurnOutcome::from_error(&HarnessError::schema("plan", "bad")),
            TurnOutcome::SchemaRejected { .. }
        ));
        assert!(matches!(
            TurnOutcome::from_error(&HarnessError::Operational(anyhow::anyhow!("timeout"))),
            TurnOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(TurnOutcome::SemanticRejected {
            message: "m".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "semantic_rejected", "message": "m"}));
        assert_eq!(
            serde_json::to_value(TurnOutcome::Advanced).unwrap(),
            serde_json::json!({"status": "advanced"})
        );
    }

    #[test]
    fn test_finish_records_response_and_timing() {
        let mut audit = TurnAudit::new(Phase::BuildScenes, "grok", Some("R1".into()))
            .with_scene(Some("scene_01".into()));
        audit.finish(Some("R2".into()), TurnOutcome::Advanced);

        assert_eq!(audit.response_id.as_deref(), Some("R2"));
        assert_eq!(audit.anchor_response_id.as_deref(), Some("R1"));
        assert!(audit.duration_ms.unwrap() >= 0);
        assert!(audit.ended_at.unwrap() >= audit.started_at);
    }
}
