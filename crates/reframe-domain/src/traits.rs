//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::message::ChatMessage;

/// Trait for the external text generator
///
/// Implemented by the infrastructure layer (reframe-llm)
pub trait GenerationPort {
    /// Error type for generation operations
    type Error;

    /// Produce one completion for the given conversation
    ///
    /// `history` is the full ordered exchange so far, ending with the
    /// newest user message. Failures are transport/provider errors; the
    /// caller does not retry them.
    fn generate(&self, history: &[ChatMessage]) -> Result<String, Self::Error>;

    /// Name of the model behind this port, for run metadata
    fn model_name(&self) -> &str {
        "unknown"
    }
}
