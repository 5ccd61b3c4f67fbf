//! Error types for the workflow

use crate::state::WorkflowState;
use reframe_gatekeeper::GatekeeperError;
use std::fmt;
use thiserror::Error;

/// Errors that end a run
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Generation port failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// Invalid workflow configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input document lacks the expected structure
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Structural failure while merging the fragment back
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// Schema could not be compiled or checked
    #[error("Gatekeeper error: {0}")]
    Gatekeeper(#[from] GatekeeperError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stage ran in a phase that has no such step
    #[error("Invalid phase: {0}")]
    Phase(String),

    /// The blocking generator task did not complete
    #[error("Generator task failed: {0}")]
    Task(String),
}

/// A fatal error together with the last state the driver committed
#[derive(Debug)]
pub struct RunFailure {
    /// What went wrong
    pub error: WorkflowError,

    /// Most recent committed snapshot
    pub last_state: Box<WorkflowState>,
}

impl RunFailure {
    /// Attach a snapshot to an error
    pub fn new(error: WorkflowError, last_state: WorkflowState) -> Self {
        Self {
            error,
            last_state: Box::new(last_state),
        }
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} failed in phase {}: {}",
            self.last_state.run_id, self.last_state.phase, self.error
        )
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
