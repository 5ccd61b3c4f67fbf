//! Reframe Gatekeeper
//!
//! Decides whether generator output is structurally acceptable.
//!
//! The Gatekeeper provides:
//! - Schema inference from example documents
//! - Sanitizing of fenced generator replies
//! - Lenient JSON parsing with explicit clean/repaired outcomes
//! - Schema validation with classified verdicts
//!
//! # Examples
//!
//! ```
//! use reframe_gatekeeper::{infer_schema, Gatekeeper};
//! use serde_json::json;
//!
//! let example = json!({"simulationName": "HarvestBowls", "tasks": [1, 2]});
//! let schema = infer_schema(&example);
//!
//! let gatekeeper = Gatekeeper::default_config();
//! let verdict = gatekeeper.validate(
//!     "```json\n{\"simulationName\": \"FlexFit\", \"tasks\": [3],}\n```",
//!     &schema,
//! );
//! assert!(verdict.is_pass());
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod repair;
mod sanitize;
mod schema;
mod validator;

pub use config::ValidationConfig;
pub use error::GatekeeperError;
pub use repair::repair_json;
pub use sanitize::sanitize;
pub use schema::{infer_schema, SchemaInferrer};
pub use validator::{Gatekeeper, ParseOutcome, ParsedDocument, ValidationReport};
