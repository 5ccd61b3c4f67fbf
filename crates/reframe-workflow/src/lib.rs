//! Reframe Workflow
//!
//! Adapts a scenario document to a new scenario with a text generator and
//! checks that the result keeps the document's structure.
//!
//! # Architecture
//!
//! ```text
//! Document → extract subset → infer schema
//!          → Generator ⇄ Gatekeeper (bounded correction loop)
//!          → Aggregator → merged document + diff + fidelity verdicts
//! ```
//!
//! Every stage reads the latest [`WorkflowState`] and returns a
//! [`StateUpdate`]; the [`Recontextualizer`] merges updates into a
//! [`StateLog`] so the last good state survives a fatal error.
//!
//! # Example Usage
//!
//! ```no_run
//! use reframe_llm::MockProvider;
//! use reframe_workflow::{RecontextualizationRequest, Recontextualizer, WorkflowConfig};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = MockProvider::new(r#"{"simulationName": "FlexFit Growth"}"#);
//! let pipeline = Recontextualizer::new(generator, WorkflowConfig::default());
//!
//! let request = RecontextualizationRequest {
//!     current_scenario: "HarvestBowls, a salad chain".to_string(),
//!     new_scenario: "FlexFit, a gym".to_string(),
//!     document: json!({
//!         "topicWizardData": {
//!             "simulationName": "HarvestBowls Strategy",
//!             "scenarioOptions": ["HarvestBowls", "FlexFit"],
//!             "selectedScenarioOption": "HarvestBowls"
//!         }
//!     }),
//! };
//!
//! let outcome = pipeline.run(request).await?;
//! if let Some(result) = outcome.aggregation() {
//!     println!("Schema fidelity: {}", result.schema_fidelity);
//!     println!("Changed: {:?}", result.diff.changed_paths());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod aggregator;
mod config;
mod diff;
mod error;
mod prompt;
mod retry;
mod state;
mod workflow;

#[cfg(test)]
mod tests;

pub use aggregator::{AggregationResult, Aggregator};
pub use config::{WorkflowConfig, DEFAULT_EXTRACTION_KEYS};
pub use diff::{nesting_depth, Change, DiffEntry, DiffError, StructuralDiff, MAX_DIFF_DEPTH};
pub use error::{RunFailure, WorkflowError};
pub use prompt::{correction_prompt, PromptBuilder};
pub use retry::RetryController;
pub use state::{StateLog, StateUpdate, WorkflowState};
pub use workflow::{RecontextualizationRequest, Recontextualizer, WorkflowOutcome};
