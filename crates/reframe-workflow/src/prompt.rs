//! Generator prompts for adaptation and correction

use serde_json::Value;

/// Builds the first prompt of a run
pub struct PromptBuilder {
    current_scenario: String,
    new_scenario: String,
    fragment: Value,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new(
        current_scenario: impl Into<String>,
        new_scenario: impl Into<String>,
        fragment: Value,
    ) -> Self {
        Self {
            current_scenario: current_scenario.into(),
            new_scenario: new_scenario.into(),
            fragment,
        }
    }

    /// Build the adaptation prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(ADAPTATION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str("Current scenario:\n---\n");
        prompt.push_str(self.current_scenario.trim());
        prompt.push_str("\n---\n\n");

        prompt.push_str("New scenario:\n---\n");
        prompt.push_str(self.new_scenario.trim());
        prompt.push_str("\n---\n\n");

        prompt.push_str("JSON to adapt:\n");
        prompt.push_str(&pretty(&self.fragment));
        prompt.push_str("\n\n");

        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}

/// Build the prompt sent after a failed validation
///
/// The validator message is quoted verbatim and the full set of structural
/// requirements, schema included, is restated on every round.
pub fn correction_prompt(error_message: &str, schema: &Value) -> String {
    let mut prompt = String::new();

    prompt.push_str("Your previous reply was rejected by the validator:\n---\n");
    prompt.push_str(error_message);
    prompt.push_str("\n---\n\n");

    prompt.push_str(CORRECTION_REQUIREMENTS);
    prompt.push_str("\n\n");

    prompt.push_str("The reply must validate against this JSON Schema:\n");
    prompt.push_str(&pretty(schema));
    prompt.push_str("\n\n");

    prompt.push_str(OUTPUT_FORMAT_REMINDER);
    prompt
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

const ADAPTATION_INSTRUCTIONS: &str = r#"Rewrite the JSON below so that it describes the new scenario instead of the current one.

Rules:
- Keep every key exactly as it is; do not add, remove or rename keys
- Keep every value's type; strings stay strings, numbers stay numbers, lists stay lists
- Keep list lengths unless the new scenario clearly needs more or fewer entries
- Replace names, organisations, industries, figures and narrative details from the current scenario
- Learning objectives and assessment structure stay equivalent; only their context changes
- Do not mention the current scenario anywhere in the output"#;

const CORRECTION_REQUIREMENTS: &str = r#"Fix the problem and return the complete JSON again.

Requirements:
- Every required key must be present with the type the schema declares
- No keys beyond the ones in the schema
- Strings must be valid JSON strings with inner quotes escaped
- No trailing commas, comments or truncated containers"#;

const OUTPUT_FORMAT_REMINDER: &str =
    "Remember: Return ONLY the JSON object, no markdown code blocks, no explanations.";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_includes_both_scenarios_and_fragment() {
        let prompt = PromptBuilder::new(
            "HarvestBowls, a salad chain",
            "FlexFit, a gym",
            json!({"simulationName": "HarvestBowls Strategy"}),
        )
        .build();

        assert!(prompt.contains("HarvestBowls, a salad chain"));
        assert!(prompt.contains("FlexFit, a gym"));
        assert!(prompt.contains("\"simulationName\": \"HarvestBowls Strategy\""));
        assert!(prompt.ends_with(OUTPUT_FORMAT_REMINDER));
    }

    #[test]
    fn test_correction_prompt_quotes_error_and_schema() {
        let schema = json!({"type": "object", "required": ["simulationName"]});
        let prompt = correction_prompt("at '(root)': \"simulationName\" is a required property", &schema);

        assert!(prompt.contains("\"simulationName\" is a required property"));
        assert!(prompt.contains(CORRECTION_REQUIREMENTS));
        assert!(prompt.contains("\"required\": ["));
    }

    #[test]
    fn test_correction_prompt_is_stable() {
        let schema = json!({"type": "object"});
        assert_eq!(correction_prompt("e", &schema), correction_prompt("e", &schema));
    }
}
