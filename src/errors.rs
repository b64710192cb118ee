//! Typed error hierarchy for the harness.
//!
//! Every failure a phase invocation can produce is one `HarnessError`
//! variant. The controller never inspects error messages: it asks for the
//! `ErrorKind` and maps that to a process exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a successful invocation.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for any fatal error.
pub const EXIT_FATAL: u8 = 1;
/// Exit code for a retryable semantic validation failure.
pub const EXIT_RETRYABLE: u8 = 2;

/// Errors surfaced by a single phase invocation.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Required project scaffolding or settings are missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A phase was invoked without one of its required inputs.
    #[error("Missing required input: {0}")]
    MissingArgument(String),

    /// Generated output does not match the phase's structural schema.
    #[error("Schema validation failed for {phase}: {message}")]
    SchemaValidation { phase: String, message: String },

    /// Structurally valid output broke a business rule.
    #[error("{0}")]
    SemanticValidation(String),

    /// The destination artifact is not a well-formed scaffold.
    #[error("Structural error in {path}: {message}")]
    Structural { path: PathBuf, message: String },

    /// Transport, collaborator or I/O failure.
    #[error(transparent)]
    Operational(#[from] anyhow::Error),
}

/// Closed classification of `HarnessError` used for exit code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    MissingArgument,
    SchemaValidation,
    SemanticValidation,
    Structural,
    Operational,
}

impl ErrorKind {
    /// Process exit code for this kind of failure.
    ///
    /// Only semantic failures are retryable; everything else is fatal.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::SemanticValidation => EXIT_RETRYABLE,
            ErrorKind::Configuration
            | ErrorKind::MissingArgument
            | ErrorKind::SchemaValidation
            | ErrorKind::Structural
            | ErrorKind::Operational => EXIT_FATAL,
        }
    }

    pub fn is_retryable(self) -> bool {
        self == ErrorKind::SemanticValidation
    }
}

impl HarnessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::Configuration(_) => ErrorKind::Configuration,
            HarnessError::MissingArgument(_) => ErrorKind::MissingArgument,
            HarnessError::SchemaValidation { .. } => ErrorKind::SchemaValidation,
            HarnessError::SemanticValidation(_) => ErrorKind::SemanticValidation,
            HarnessError::Structural { .. } => ErrorKind::Structural,
            HarnessError::Operational(_) => ErrorKind::Operational,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    pub fn schema(phase: impl std::fmt::Display, message: impl Into<String>) -> Self {
        HarnessError::SchemaValidation {
            phase: phase.to_string(),
            message: message.into(),
        }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        HarnessError::SemanticValidation(message.into())
    }

    pub fn structural(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HarnessError::Structural {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Label printed before the message on stderr.
    pub fn label(&self) -> &'static str {
        match self.kind() {
            ErrorKind::SemanticValidation => "Validation Error",
            _ => "Harness Error",
        }
    }
}

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_validation_is_the_only_retryable_kind() {
        let err = HarnessError::semantic("no timing marker");
        assert_eq!(err.kind(), ErrorKind::SemanticValidation);
        assert!(err.kind().is_retryable());
        assert_eq!(err.exit_code(), EXIT_RETRYABLE);
    }

    #[test]
    fn fatal_kinds_map_to_exit_one() {
        let errors = vec![
            HarnessError::Configuration("metadata missing".into()),
            HarnessError::MissingArgument("--topic".into()),
            HarnessError::schema("plan", "scenes: expected at least 12 items"),
            HarnessError::structural("/tmp/scene.py", "missing start marker"),
            HarnessError::Operational(anyhow::anyhow!("connection reset")),
        ];
        for err in errors {
            assert_eq!(err.exit_code(), EXIT_FATAL, "{:?}", err.kind());
            assert!(!err.kind().is_retryable());
        }
    }

    #[test]
    fn semantic_message_is_displayed_verbatim() {
        let err =
            HarnessError::semantic("Scene build must include code_execution timing validation.");
        assert_eq!(
            err.to_string(),
            "Scene build must include code_execution timing validation."
        );
        assert_eq!(err.label(), "Validation Error");
    }

    #[test]
    fn structural_error_carries_path() {
        let err = HarnessError::structural("/proj/scene_01.py", "missing # SLOT_END:scene_body");
        match &err {
            HarnessError::Structural { path, message } => {
                assert_eq!(path, &PathBuf::from("/proj/scene_01.py"));
                assert!(message.contains("SLOT_END"));
            }
            _ => panic!("Expected Structural"),
        }
        assert_eq!(err.label(), "Harness Error");
    }

    #[test]
    fn operational_converts_from_anyhow() {
        let err: HarnessError = anyhow::anyhow!("HTTP 503").into();
        assert!(matches!(err, HarnessError::Operational(_)));
        assert!(err.to_string().contains("503"));
    }
}
