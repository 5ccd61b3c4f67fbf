//! End-to-end tests for the Recontextualizer

#[cfg(test)]
mod tests {
    use crate::{
        RecontextualizationRequest, Recontextualizer, WorkflowConfig, WorkflowError,
        WorkflowOutcome,
    };
    use reframe_domain::{FidelityVerdict, Role, ValidationVerdict, WorkflowPhase};
    use reframe_llm::MockProvider;
    use serde_json::{json, Value};

    fn document() -> Value {
        json!({
            "id": "sim-042",
            "topicWizardData": {
                "simulationName": "HarvestBowls Pricing Strategy",
                "lessonInformation": {"title": "Pricing in food service", "minutes": 45},
                "workplaceScenario": {
                    "background": "HarvestBowls is a fast-casual salad chain.",
                    "challenge": "Margins fell after a supplier change."
                },
                "industryAlignedActivities": [
                    {"name": "Competitor survey", "tags": ["market", "pricing"]}
                ],
                "scenarioOptions": ["HarvestBowls", "FlexFit", "Cloudlet"],
                "selectedScenarioOption": "HarvestBowls"
            }
        })
    }

    fn valid_reply() -> String {
        json!({
            "simulationName": "FlexFit Membership Strategy",
            "lessonInformation": {"title": "Pricing in fitness", "minutes": 50},
            "workplaceScenario": {
                "background": "FlexFit runs neighbourhood gyms.",
                "challenge": "Members cancel after three months."
            },
            "industryAlignedActivities": [
                {"name": "Churn interview", "tags": ["retention"]}
            ]
        })
        .to_string()
    }

    fn request() -> RecontextualizationRequest {
        RecontextualizationRequest {
            current_scenario: "HarvestBowls, a salad chain".to_string(),
            new_scenario: "FlexFit, a gym chain".to_string(),
            document: document(),
        }
    }

    #[tokio::test]
    async fn test_valid_first_reply_completes() {
        let generator = MockProvider::default().with_response(valid_reply());
        let pipeline = Recontextualizer::new(generator.clone(), WorkflowConfig::default());

        let outcome = pipeline.run(request()).await.unwrap();

        assert!(outcome.is_completed());
        let state = outcome.state();
        assert_eq!(state.phase, WorkflowPhase::Passed);
        assert_eq!(state.retries, 0);
        assert_eq!(generator.call_count(), 1);
        assert!(state.duration_ms.is_some());

        let result = outcome.aggregation().unwrap();
        assert_eq!(result.schema_fidelity, FidelityVerdict::Pass);
        assert_eq!(result.locked_field_equality, FidelityVerdict::Pass);

        let container = &result.merged_document["topicWizardData"];
        assert_eq!(container["simulationName"], "FlexFit Membership Strategy");
        assert_eq!(container["selectedScenarioOption"], "FlexFit, a gym chain");
        assert_eq!(result.merged_document["id"], "sim-042");
    }

    #[tokio::test]
    async fn test_unparsable_replies_exhaust_retries() {
        let generator = MockProvider::new("I'm sorry, I can't produce that.");
        let pipeline = Recontextualizer::new(generator.clone(), WorkflowConfig::default());

        let outcome = pipeline.run(request()).await.unwrap();

        assert!(matches!(outcome, WorkflowOutcome::RetryLimitExceeded(_)));
        let state = outcome.state();
        assert_eq!(state.phase, WorkflowPhase::FailedLimitExceeded);
        assert_eq!(state.retries, 3);
        assert_eq!(generator.call_count(), 3);
        assert_eq!(state.verdicts.len(), 3);
        assert!(state
            .verdicts
            .iter()
            .all(|v| matches!(v, ValidationVerdict::ParseError(_))));
        assert!(state.aggregation.is_none());
        assert!(state.ended_at_ms.is_some());
    }

    #[tokio::test]
    async fn test_schema_violation_then_valid_reply() {
        let missing_activities = json!({
            "simulationName": "FlexFit",
            "lessonInformation": {"title": "Pricing", "minutes": 50},
            "workplaceScenario": {"background": "Gyms", "challenge": "Churn"}
        })
        .to_string();
        let generator = MockProvider::default()
            .with_response(missing_activities)
            .with_response(format!("```json\n{}\n```", valid_reply()));
        let pipeline = Recontextualizer::new(generator.clone(), WorkflowConfig::default());

        let outcome = pipeline.run(request()).await.unwrap();

        assert!(outcome.is_completed());
        let state = outcome.state();
        assert_eq!(state.retries, 1);
        assert!(matches!(state.verdicts[0], ValidationVerdict::SchemaViolation(_)));
        assert_eq!(state.verdicts[1], ValidationVerdict::Pass);

        // initial exchange plus exactly one correction round
        let messages = state.conversation.messages();
        assert_eq!(messages.len(), 4);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
        assert!(messages[2].content.contains("industryAlignedActivities"));

        // the correction call carried the full prior exchange
        let histories = generator.received_histories();
        assert_eq!(histories.len(), 2);
        assert_eq!(histories[1].len(), 3);
        assert_eq!(histories[1][..2], messages[..2]);
    }

    #[tokio::test]
    async fn test_generator_error_is_fatal_with_state() {
        let generator = MockProvider::default().with_error("connection refused");
        let pipeline = Recontextualizer::new(generator, WorkflowConfig::default());

        let failure = pipeline.run(request()).await.unwrap_err();

        assert!(matches!(failure.error, WorkflowError::Generation(_)));
        assert_eq!(failure.last_state.phase, WorkflowPhase::Generating);
        assert!(failure.last_state.fragment_schema.is_some());
        assert_eq!(failure.last_state.original_document, document());
        assert!(failure.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_generator_error_during_correction_keeps_history() {
        let generator = MockProvider::default()
            .with_response("not json")
            .with_error("timeout");
        let pipeline = Recontextualizer::new(generator, WorkflowConfig::default());

        let failure = pipeline.run(request()).await.unwrap_err();

        assert_eq!(failure.last_state.phase, WorkflowPhase::Correcting);
        assert_eq!(failure.last_state.retries, 1);
        assert_eq!(failure.last_state.generator_outputs, vec!["not json"]);
    }

    #[tokio::test]
    async fn test_missing_container_is_fatal() {
        let generator = MockProvider::default();
        let pipeline = Recontextualizer::new(generator.clone(), WorkflowConfig::default());
        let mut request = request();
        request.document = json!({"somethingElse": {}});

        let failure = pipeline.run(request).await.unwrap_err();

        assert!(matches!(failure.error, WorkflowError::InvalidDocument(_)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let config = WorkflowConfig {
            extraction_keys: Vec::new(),
            ..WorkflowConfig::default()
        };
        let pipeline = Recontextualizer::new(MockProvider::default(), config);

        let failure = pipeline.run(request()).await.unwrap_err();
        assert!(matches!(failure.error, WorkflowError::Config(_)));
        assert_eq!(failure.last_state.phase, WorkflowPhase::Generating);
    }

    #[tokio::test]
    async fn test_snapshot_log_records_each_stage() {
        let generator = MockProvider::default().with_response(valid_reply());
        let pipeline = Recontextualizer::new(generator, WorkflowConfig::default());

        let (log, result) = pipeline.run_with_log(request()).await;

        assert!(result.is_ok());
        // initial, prepare, generate, validate, aggregate
        assert_eq!(log.len(), 5);
        let phases: Vec<WorkflowPhase> = log.snapshots().iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![
                WorkflowPhase::Generating,
                WorkflowPhase::Generating,
                WorkflowPhase::Validating,
                WorkflowPhase::Passed,
                WorkflowPhase::Passed,
            ]
        );
    }

    #[tokio::test]
    async fn test_fragment_cannot_touch_locked_field() {
        let mut reply: Value = serde_json::from_str(&valid_reply()).unwrap();
        reply["scenarioOptions"] = json!(["Hijacked"]);
        // the subset schema does not forbid extra keys
        let generator = MockProvider::default().with_response(reply.to_string());
        let pipeline = Recontextualizer::new(generator, WorkflowConfig::default());

        let outcome = pipeline.run(request()).await.unwrap();
        let result = outcome.aggregation().unwrap();

        assert_eq!(result.locked_field_equality, FidelityVerdict::Pass);
        assert_eq!(
            result.merged_document["topicWizardData"]["scenarioOptions"],
            json!(["HarvestBowls", "FlexFit", "Cloudlet"])
        );
    }

    #[tokio::test]
    async fn test_repaired_reply_is_accepted() {
        let sloppy = valid_reply().replacen('}', ",}", 1);
        let generator = MockProvider::default().with_response(sloppy);
        let pipeline = Recontextualizer::new(generator, WorkflowConfig::default());

        let outcome = pipeline.run(request()).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.state().retries, 0);
    }

    #[tokio::test]
    async fn test_strict_config_rejects_sloppy_reply() {
        let sloppy = valid_reply().replacen('}', ",}", 1);
        let generator = MockProvider::new(sloppy);
        let pipeline = Recontextualizer::new(generator, WorkflowConfig::strict());

        let outcome = pipeline.run(request()).await.unwrap();
        assert!(!outcome.is_completed());
        assert_eq!(outcome.state().retries, 1);
    }
}
