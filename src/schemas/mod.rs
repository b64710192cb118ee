//! Structured-output schemas for each phase.
//!
//! Every model answer is decoded into one of these types. The JSON Schema
//! sent with the request is derived from the type; the numeric and length
//! bounds are re-checked after decoding because a schema-enforcing endpoint
//! is not guaranteed to honour all of them.

mod narration;
mod plan;
mod scene_build;
mod scene_qc;

pub use narration::{Narration, NarrationScene};
pub use plan::{Plan, Scene};
pub use scene_build::{SceneBuild, SceneSpec};
pub use scene_qc::{QcIssue, SceneQc};

use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A type the model can be asked to answer in.
pub trait StructuredOutput: DeserializeOwned + Serialize + JsonSchema {
    /// Schema name attached to the request.
    const NAME: &'static str;

    fn output_schema() -> Value {
        serde_json::to_value(schemars::schema_for!(Self)).unwrap_or(Value::Null)
    }

    /// Bounds the type system can't express. Returns the first violation.
    fn check_constraints(&self) -> Result<(), String> {
        Ok(())
    }
}

pub(crate) fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), String>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(format!("{}: {} is outside {}..={}", field, value, min, max));
    }
    Ok(())
}

pub(crate) fn check_len(field: &str, len: usize, min: usize, max: usize) -> Result<(), String> {
    if len < min {
        return Err(format!("{}: expected at least {} items, got {}", field, min, len));
    }
    if len > max {
        return Err(format!("{}: expected at most {} items, got {}", field, max, len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_bounds_are_inclusive() {
        assert!(check_range("x", 20, 20, 45).is_ok());
        assert!(check_range("x", 45, 20, 45).is_ok());
        let err = check_range("x", 46, 20, 45).unwrap_err();
        assert_eq!(err, "x: 46 is outside 20..=45");
    }

    #[test]
    fn test_check_len_reports_direction() {
        assert!(check_len("scenes", 3, 12, 24).unwrap_err().contains("at least 12"));
        assert!(check_len("scenes", 25, 12, 24).unwrap_err().contains("at most 24"));
        assert!(check_len("scenes", 12, 12, 24).is_ok());
    }
}
