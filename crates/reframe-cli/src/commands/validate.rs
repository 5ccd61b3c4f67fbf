//! Validate command implementation.

use crate::cli::ValidateArgs;
use crate::commands::read_document;
use crate::config::load_workflow_config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use reframe_gatekeeper::{infer_schema, Gatekeeper, ValidationReport};
use reframe_workflow::WorkflowConfig;
use serde_json::Value;
use std::fs;

/// Execute the validate command.
pub fn execute_validate(args: ValidateArgs, formatter: &Formatter) -> Result<()> {
    let workflow = load_workflow_config(args.workflow_config.as_deref())?;
    let example = read_document(&args.against)?;
    let candidate = fs::read_to_string(&args.input)?;

    let report = check_candidate(&candidate, &example, args.subset, &workflow)?;
    println!("{}", formatter.format_validation(&report)?);

    match report.verdict.message() {
        None => Ok(()),
        Some(message) => Err(CliError::ValidationFailed(message.to_string())),
    }
}

/// Validate candidate text against the schema inferred from `example`.
pub fn check_candidate(
    candidate: &str,
    example: &Value,
    subset: bool,
    workflow: &WorkflowConfig,
) -> Result<ValidationReport> {
    let source = if subset {
        workflow.extract_subset(example)?
    } else {
        example.clone()
    };
    let gatekeeper = Gatekeeper::new(workflow.validation.clone());
    Ok(gatekeeper.validate_document(candidate, &infer_schema(&source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_gatekeeper::ParseOutcome;
    use serde_json::json;

    fn example() -> Value {
        json!({
            "topicWizardData": {
                "simulationName": "HarvestBowls",
                "scenarioOptions": ["a", "b"]
            }
        })
    }

    #[test]
    fn test_subset_candidate_passes() {
        let report = check_candidate(
            "```json\n{\"simulationName\": \"FlexFit\"}\n```",
            &example(),
            true,
            &WorkflowConfig::default(),
        )
        .unwrap();
        assert!(report.verdict.is_pass());
        assert_eq!(report.document.unwrap().outcome, ParseOutcome::Clean);
    }

    #[test]
    fn test_full_document_schema_rejects_subset() {
        let report = check_candidate(
            "{\"simulationName\": \"FlexFit\"}",
            &example(),
            false,
            &WorkflowConfig::default(),
        )
        .unwrap();
        assert!(!report.verdict.is_pass());
    }

    #[test]
    fn test_missing_container_is_error() {
        let result = check_candidate("{}", &json!({"x": 1}), true, &WorkflowConfig::default());
        assert!(matches!(result, Err(CliError::Workflow(_))));
    }
}
