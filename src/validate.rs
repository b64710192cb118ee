//! Semantic validators run on schema-valid responses.
//!
//! Hard validators return `SemanticValidation` errors whose messages are fed
//! back to the model as retry context, so each failure mode has its own
//! wording. Soft validators only warn.

use tracing::warn;

use crate::client::RawResponse;
use crate::errors::{HarnessError, HarnessResult};

pub const NO_TOOL_TRACE: &str =
    "Scene build response must include a server-side tool usage trace.";
pub const NO_CODE_EXECUTION: &str = "Scene build must include code_execution timing validation.";
pub const NO_TIMING_MARKER: &str = "No timing validation detected in code execution.";

/// Require a code-execution call whose code mentions `timing_marker`.
pub fn validate_timing_execution(raw: &RawResponse, timing_marker: &str) -> HarnessResult<()> {
    let invocations = raw
        .tool_invocations
        .as_deref()
        .ok_or_else(|| HarnessError::semantic(NO_TOOL_TRACE))?;

    let mut executions = invocations.iter().filter(|call| call.is_code_execution()).peekable();
    if executions.peek().is_none() {
        return Err(HarnessError::semantic(NO_CODE_EXECUTION));
    }

    if executions.any(|call| {
        call.code
            .as_deref()
            .is_some_and(|code| code.contains(timing_marker))
    }) {
        Ok(())
    } else {
        Err(HarnessError::semantic(NO_TIMING_MARKER))
    }
}

/// Check that the response cites at least one collection document.
///
/// Returns `false` with a warning otherwise; never fails the turn.
pub fn validate_collections_usage(raw: &RawResponse, scene_id: &str, prefix: &str) -> bool {
    let citations = match raw.citations.as_deref() {
        Some(citations) if !citations.is_empty() => citations,
        _ => {
            warn!(scene = %scene_id, "No Collections citations found in response");
            return false;
        }
    };

    if !citations.iter().any(|c| c.starts_with(prefix)) {
        warn!(
            scene = %scene_id,
            citations = citations.len(),
            "Insufficient template references"
        );
        return false;
    }
    true
}
