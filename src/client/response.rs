use serde_json::Value;

use crate::errors::{HarnessError, HarnessResult};
use crate::phase::Phase;
use crate::schemas::StructuredOutput;
use crate::util::extract_json_object;

/// Kind of server-side tool the model invoked during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    CodeExecution,
    CollectionsSearch,
    WebSearch,
    Other(String),
}

/// One entry of the server-side tool trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    /// Source submitted to the code-execution sandbox
    pub code: Option<String>,
}

impl ToolInvocation {
    pub fn code_execution(code: impl Into<String>) -> Self {
        Self {
            kind: ToolKind::CodeExecution,
            code: Some(code.into()),
        }
    }

    pub fn is_code_execution(&self) -> bool {
        self.kind == ToolKind::CodeExecution
    }
}

/// A model response as returned by a backend, before decoding.
///
/// `citations` and `tool_invocations` are `None` when the backend reported
/// nothing at all for them, which validators treat differently from an
/// empty list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResponse {
    pub id: String,
    /// Output text; expected to hold the structured JSON payload
    pub content: String,
    pub citations: Option<Vec<String>>,
    pub tool_invocations: Option<Vec<ToolInvocation>>,
}

impl RawResponse {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_citations<I, S>(mut self, citations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.citations = Some(citations.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tool_invocations(mut self, invocations: Vec<ToolInvocation>) -> Self {
        self.tool_invocations = Some(invocations);
        self
    }
}

/// Outcome of one accepted turn.
#[derive(Debug, Clone)]
pub struct GenerationResult<T> {
    pub payload: T,
    pub response_id: String,
    pub raw_response: RawResponse,
}

/// Decode the payload of `raw` into `T` and check its declared bounds.
///
/// Text that is not pure JSON gets one more chance through the outermost
/// `{...}` it contains. Every failure here is a schema failure.
pub fn decode_payload<T: StructuredOutput>(phase: Phase, raw: &RawResponse) -> HarnessResult<T> {
    let value: Value = match serde_json::from_str(raw.content.trim()) {
        Ok(value) => value,
        Err(e) => extract_json_object(&raw.content)
            .and_then(|json| serde_json::from_str(&json).ok())
            .ok_or_else(|| {
                HarnessError::schema(phase, format!("response is not valid JSON: {}", e))
            })?,
    };

    let payload: T = serde_json::from_value(value)
        .map_err(|e| HarnessError::schema(phase, format!("{} does not match: {}", T::NAME, e)))?;
    payload
        .check_constraints()
        .map_err(|message| HarnessError::schema(phase, message))?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::schemas::{SceneBuild, SceneQc};

    #[test]
    fn test_decode_plain_json() {
        let raw = RawResponse::new("r1", r#"{"scene_body": "self.wait(1)", "reasoning": "pause"}"#);
        let build: SceneBuild = decode_payload(Phase::BuildScenes, &raw).unwrap();
        assert_eq!(build.scene_body, "self.wait(1)");
    }

    #[test]
    fn test_decode_json_wrapped_in_prose() {
        let raw = RawResponse::new(
            "r1",
            "Here is the scene:\n```json\n{\"scene_body\": \"x\", \"reasoning\": \"y\"}\n```",
        );
        let build: SceneBuild = decode_payload(Phase::BuildScenes, &raw).unwrap();
        assert_eq!(build.reasoning, "y");
    }

    #[test]
    fn test_decode_missing_field_is_schema_error() {
        let raw = RawResponse::new("r1", r#"{"scene_body": "x"}"#);
        let err = decode_payload::<SceneBuild>(Phase::BuildScenes, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaValidation);
        assert!(err.to_string().contains("reasoning"));
    }

    #[test]
    fn test_decode_not_json_is_schema_error() {
        let raw = RawResponse::new("r1", "I cannot help with that.");
        let err = decode_payload::<SceneBuild>(Phase::SceneRepair, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaValidation);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_decode_out_of_bounds_is_schema_error() {
        let raw = RawResponse::new(
            "r1",
            r#"{"scene_title": "Intro", "passed": true, "score": 1.5, "issues": []}"#,
        );
        let err = decode_payload::<SceneQc>(Phase::SceneQc, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaValidation);
        assert!(err.to_string().contains("score"));
    }
}
