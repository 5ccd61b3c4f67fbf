//! Realistic generator replies run through the full Gatekeeper

use reframe_domain::ValidationVerdict;
use reframe_gatekeeper::{infer_schema, Gatekeeper, ParseOutcome, SchemaInferrer};
use serde_json::{json, Value};

fn example() -> Value {
    json!({
        "simulationName": "HarvestBowls: Fixing the Margin",
        "lessonInformation": {"title": "Pricing", "durationMinutes": 90},
        "industryAlignedActivities": [
            {"name": "Menu cost audit", "hours": 2.5},
            {"name": "Competitor survey", "hours": 1}
        ]
    })
}

#[test]
fn fenced_reply_with_prose_and_trailing_comma() {
    let reply = r#"```json
{
  "simulationName": "FlexFit: Keeping Members",
  "lessonInformation": {"title": "Retention pricing", "durationMinutes": 60},
  "industryAlignedActivities": [
    {"name": "Churn interview", "hours": 3},
  ],
}
```"#;

    let gatekeeper = Gatekeeper::default_config();
    let report = gatekeeper.validate_document(reply, &infer_schema(&example()));

    assert_eq!(report.verdict, ValidationVerdict::Pass);
    assert_eq!(report.document.unwrap().outcome, ParseOutcome::Repaired);
}

#[test]
fn unescaped_quotes_inside_narrative() {
    let reply = r#"{"simulationName": "The "Keep Moving" Plan", "lessonInformation": {"title": "t", "durationMinutes": 5}, "industryAlignedActivities": []}"#;

    let gatekeeper = Gatekeeper::default_config();
    let parsed = gatekeeper.parse(reply).unwrap();
    assert_eq!(parsed.value["simulationName"], "The \"Keep Moving\" Plan");
}

#[test]
fn truncated_reply_is_closed_then_checked() {
    let reply = r#"{"simulationName": "FlexFit", "lessonInformation": {"title": "Pricing", "durationMinutes": 60"#;

    let gatekeeper = Gatekeeper::default_config();
    let verdict = gatekeeper.validate(reply, &infer_schema(&example()));

    // parses after repair but misses a required key
    match verdict {
        ValidationVerdict::SchemaViolation(message) => {
            assert!(message.contains("industryAlignedActivities"), "{}", message)
        }
        other => panic!("expected schema violation, got {:?}", other),
    }
}

#[test]
fn refusal_is_parse_error() {
    let gatekeeper = Gatekeeper::default_config();
    let verdict = gatekeeper.validate("Sorry, I can't help with that.", &infer_schema(&example()));
    assert_eq!(verdict.label(), "PARSE_ERROR");
}

#[test]
fn schema_from_several_examples_accepts_each() {
    let other = json!({
        "simulationName": "Cloudlet Onboarding",
        "lessonInformation": {"title": "SaaS pricing", "durationMinutes": 45, "level": "Advanced"},
        "industryAlignedActivities": []
    });
    let mut inferrer = SchemaInferrer::new();
    inferrer.add_document(&example()).add_document(&other);
    let schema = inferrer.build();

    let gatekeeper = Gatekeeper::default_config();
    assert!(gatekeeper.conforms(&example(), &schema));
    assert!(gatekeeper.conforms(&other, &schema));
    assert_eq!(schema["properties"]["lessonInformation"]["required"], json!(["durationMinutes", "title"]));
}
