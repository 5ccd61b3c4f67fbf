//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur during gatekeeper operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatekeeperError {
    /// Text could not be parsed as JSON, even after repair
    #[error("{0}")]
    Parse(String),

    /// The schema itself is not a valid draft 7 schema
    #[error("Invalid schema: {0}")]
    Schema(String),

    /// Document does not conform to the schema
    #[error("{0}")]
    Violation(String),
}
