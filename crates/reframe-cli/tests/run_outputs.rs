//! File outputs of the run command

use reframe_cli::commands::run_pipeline;
use reframe_llm::MockProvider;
use reframe_workflow::{RecontextualizationRequest, WorkflowConfig};
use serde_json::{json, Value};
use std::fs;

fn request() -> RecontextualizationRequest {
    RecontextualizationRequest {
        current_scenario: "HarvestBowls, a salad chain".to_string(),
        new_scenario: "FlexFit, a gym chain".to_string(),
        document: json!({
            "topicWizardData": {
                "simulationName": "HarvestBowls Strategy",
                "workplaceScenario": {"background": "Salads", "challenge": "Margins"},
                "scenarioOptions": ["HarvestBowls, a salad chain", "FlexFit, a gym chain"],
                "selectedScenarioOption": "HarvestBowls, a salad chain"
            }
        }),
    }
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn completed_run_writes_output_and_changes() {
    let dir = tempfile::tempdir().unwrap();
    let generator = MockProvider::new(
        r#"{"simulationName": "FlexFit Strategy", "workplaceScenario": {"background": "Gyms", "challenge": "Churn"}}"#,
    );

    let summary = run_pipeline(generator, WorkflowConfig::default(), request(), dir.path())
        .await
        .unwrap();

    assert!(summary.succeeded());
    assert_eq!(summary.files.len(), 2);

    let output = read_json(&dir.path().join("output.json"));
    assert_eq!(output["topicWizardData"]["simulationName"], "FlexFit Strategy");
    assert_eq!(output["topicWizardData"]["selectedScenarioOption"], "FlexFit, a gym chain");

    let changes = read_json(&dir.path().join("changed_fields.json"));
    let paths = changes["changed_paths"].as_array().unwrap();
    assert!(paths.contains(&json!("topicWizardData.simulationName")));
    assert!(!dir.path().join("state.json").exists());
}

#[tokio::test]
async fn exhausted_run_writes_state_dump() {
    let dir = tempfile::tempdir().unwrap();
    let generator = MockProvider::new("no JSON here");

    let summary = run_pipeline(generator, WorkflowConfig::default(), request(), dir.path())
        .await
        .unwrap();

    assert!(!summary.succeeded());
    assert_eq!(summary.status, "failed_limit_exceeded");

    let state = read_json(&dir.path().join("state.json"));
    assert_eq!(state["retries"], 3);
    assert_eq!(state["generator_outputs"].as_array().unwrap().len(), 3);
    assert!(!dir.path().join("output.json").exists());
}

#[tokio::test]
async fn generator_failure_writes_state_dump() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("results");
    let generator = MockProvider::default().with_error("connection refused");

    let summary = run_pipeline(generator, WorkflowConfig::default(), request(), &output_dir)
        .await
        .unwrap();

    assert!(!summary.succeeded());
    assert!(summary.error.unwrap().contains("connection refused"));
    let state = read_json(&output_dir.join("state.json"));
    assert_eq!(state["phase"], "generating");
}
