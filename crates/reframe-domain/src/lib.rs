//! Reframe Domain Layer
//!
//! This crate contains the core vocabulary of the recontextualization pipeline.
//! It keeps external dependencies to a minimum (`uuid` for run identifiers and
//! `serde` so state can be dumped for diagnostics) and defines the value
//! objects and trait interfaces that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **Conversation**: Append-only, role-tagged message history sent to the generator
//! - **Generation port**: The boundary to the external text generator
//! - **Validation verdict**: PASS, schema violation, or parse error
//! - **Workflow phase**: The retry state machine and its pure transition function
//! - **Fidelity**: PASS/FAIL checks recorded after aggregation
//!
//! ## Architecture
//!
//! - Pure logic only, no I/O
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod message;
pub mod phase;
pub mod run;
pub mod traits;
pub mod verdict;

// Re-exports for convenience
pub use message::{ChatMessage, ConversationHistory, Role};
pub use phase::{WorkflowPhase, DEFAULT_MAX_RETRIES};
pub use run::RunId;
pub use verdict::{FidelityVerdict, ValidationVerdict};
