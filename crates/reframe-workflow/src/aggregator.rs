//! Merging the validated fragment back into the full document

use crate::config::WorkflowConfig;
use crate::diff::{nesting_depth, StructuralDiff, MAX_DIFF_DEPTH};
use crate::error::WorkflowError;
use crate::state::now_millis;
use reframe_domain::FidelityVerdict;
use reframe_gatekeeper::{infer_schema, Gatekeeper};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Outcome of aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Original document with the fragment merged in
    pub merged_document: Value,

    /// Differences between the original and merged documents
    pub diff: StructuralDiff,

    /// Whether the merged document satisfies the schema of the original
    pub schema_fidelity: FidelityVerdict,

    /// First violation when schema fidelity failed
    pub fidelity_message: Option<String>,

    /// Whether the locked field survived unchanged
    pub locked_field_equality: FidelityVerdict,

    /// Time from run start to the end of aggregation
    pub duration_ms: u64,
}

/// Merges a validated fragment into a copy of the original document
pub struct Aggregator<'a> {
    config: &'a WorkflowConfig,
    gatekeeper: &'a Gatekeeper,
}

impl<'a> Aggregator<'a> {
    /// Create an aggregator
    pub fn new(config: &'a WorkflowConfig, gatekeeper: &'a Gatekeeper) -> Self {
        Self { config, gatekeeper }
    }

    /// Merge `fragment` into a copy of `original` and verify the result
    ///
    /// Only keys listed in the extraction key set are copied, each one
    /// replacing the whole subtree. Failed fidelity checks are recorded in
    /// the result; only structural problems with the inputs are errors.
    pub fn aggregate(
        &self,
        original: &Value,
        fragment: &Value,
        new_scenario: &str,
        started_at_ms: u64,
    ) -> Result<AggregationResult, WorkflowError> {
        let fragment = fragment.as_object().ok_or_else(|| {
            WorkflowError::Aggregation("validated fragment is not an object".to_string())
        })?;

        let mut merged = original.clone();
        {
            let container = self
                .config
                .container_mut(&mut merged)
                .map_err(|e| WorkflowError::Aggregation(e.to_string()))?;

            for (key, value) in fragment {
                if self.config.is_extraction_key(key) {
                    container.insert(key.clone(), value.clone());
                } else {
                    warn!("Ignoring fragment key '{}' outside the extraction key set", key);
                }
            }
            container.insert(
                self.config.selected_option_field.clone(),
                Value::String(new_scenario.to_string()),
            );
        }

        let diff = match StructuralDiff::between(original, &merged) {
            Ok(diff) => diff,
            Err(e) => {
                warn!("Structural diff failed, reporting no changes: {}", e);
                StructuralDiff::default()
            }
        };
        debug!("Diff has {} entries", diff.len());

        let depth = nesting_depth(original).max(nesting_depth(&merged));
        let (schema_fidelity, fidelity_message) = if depth > MAX_DIFF_DEPTH {
            let message = format!(
                "document nesting of {} levels exceeds the limit of {}",
                depth, MAX_DIFF_DEPTH
            );
            warn!("Skipping schema fidelity check: {}", message);
            (FidelityVerdict::Fail, Some(message))
        } else {
            let full_schema = infer_schema(original);
            match self.gatekeeper.check(&merged, &full_schema) {
                Ok(()) => (FidelityVerdict::Pass, None),
                Err(e) => {
                    warn!("Merged document does not satisfy the original schema: {}", e);
                    (FidelityVerdict::Fail, Some(e.to_string()))
                }
            }
        };

        let locked_before = self.config.locked_value(original);
        let locked_after = self.config.locked_value(&merged);
        if locked_before.is_none() {
            warn!(
                "Locked field '{}' is absent from the original document",
                self.config.locked_options_field
            );
        }
        let locked_field_equality = FidelityVerdict::from_check(locked_before == locked_after);

        let duration_ms = now_millis().saturating_sub(started_at_ms);
        info!(
            "Aggregation complete: schema fidelity {}, locked field {}, {} changed paths",
            schema_fidelity,
            locked_field_equality,
            diff.changed_paths().len()
        );

        Ok(AggregationResult {
            merged_document: merged,
            diff,
            schema_fidelity,
            fidelity_message,
            locked_field_equality,
            duration_ms,
        })
    }
}
