//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generator setup error
    #[error("Generator error: {0}")]
    Llm(#[from] reframe_llm::LlmError),

    /// Workflow error outside a run
    #[error("Workflow error: {0}")]
    Workflow(#[from] reframe_workflow::WorkflowError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),

    /// A run ended without a merged document
    #[error("Run did not complete: {0}")]
    RunFailed(String),

    /// A candidate document was rejected
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
