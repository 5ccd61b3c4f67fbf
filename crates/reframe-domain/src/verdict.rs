//! Verdict module - outcomes of validation and fidelity checks

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of validating one generator output against a schema
///
/// Only the two failure variants count against the retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationVerdict {
    /// The output parsed and conforms to the schema
    Pass,

    /// The output parsed but does not conform to the schema
    SchemaViolation(String),

    /// The output could not be parsed, even after repair
    ParseError(String),
}

impl ValidationVerdict {
    /// Whether this verdict is PASS
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationVerdict::Pass)
    }

    /// The failure description, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationVerdict::Pass => None,
            ValidationVerdict::SchemaViolation(msg) | ValidationVerdict::ParseError(msg) => {
                Some(msg)
            }
        }
    }

    /// Short label for logs and tables
    pub fn label(&self) -> &'static str {
        match self {
            ValidationVerdict::Pass => "PASS",
            ValidationVerdict::SchemaViolation(_) => "SCHEMA_VIOLATION",
            ValidationVerdict::ParseError(_) => "PARSE_ERROR",
        }
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationVerdict::Pass => f.write_str("PASS"),
            ValidationVerdict::SchemaViolation(msg) => {
                write!(f, "JSON Schema Validation FAILED: {}", msg)
            }
            ValidationVerdict::ParseError(msg) => write!(f, "JSON Parse Error: {}", msg),
        }
    }
}

/// PASS/FAIL outcome of a post-aggregation fidelity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FidelityVerdict {
    /// The check held
    Pass,

    /// The check did not hold
    Fail,
}

impl FidelityVerdict {
    /// Build a verdict from a boolean check result
    pub fn from_check(held: bool) -> Self {
        if held {
            FidelityVerdict::Pass
        } else {
            FidelityVerdict::Fail
        }
    }

    /// Get the verdict as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FidelityVerdict::Pass => "PASS",
            FidelityVerdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for FidelityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_message() {
        assert_eq!(ValidationVerdict::Pass.message(), None);
        assert_eq!(
            ValidationVerdict::ParseError("eof".into()).message(),
            Some("eof")
        );
        assert!(!ValidationVerdict::SchemaViolation("x".into()).is_pass());
    }

    #[test]
    fn test_verdict_wire_format() {
        let pass = serde_json::to_value(ValidationVerdict::Pass).unwrap();
        assert_eq!(pass, serde_json::json!({"status": "PASS"}));

        let fail = serde_json::to_value(ValidationVerdict::SchemaViolation("bad".into())).unwrap();
        assert_eq!(
            fail,
            serde_json::json!({"status": "SCHEMA_VIOLATION", "message": "bad"})
        );
    }

    #[test]
    fn test_fidelity_from_check() {
        assert_eq!(FidelityVerdict::from_check(true), FidelityVerdict::Pass);
        assert_eq!(FidelityVerdict::from_check(false).to_string(), "FAIL");
    }
}
