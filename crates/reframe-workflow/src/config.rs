//! Configuration for the workflow

use crate::error::WorkflowError;
use reframe_domain::DEFAULT_MAX_RETRIES;
use reframe_gatekeeper::ValidationConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

/// Scenario-dependent fields adapted by default
pub const DEFAULT_EXTRACTION_KEYS: [&str; 8] = [
    "lessonInformation",
    "assessmentCriterion",
    "selectedAssessmentCriterion",
    "simulationName",
    "simulationFlow",
    "workplaceScenario",
    "industryAlignedActivities",
    "selectedIndustryAlignedActivities",
];

/// Configuration for a recontextualization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Failed validations allowed before giving up
    pub max_retries: u32,

    /// Fields of the scenario container eligible for adaptation, in prompt order
    pub extraction_keys: Vec<String>,

    /// Dotted path to the scenario container; empty means the document root
    pub scenario_container: String,

    /// Field overwritten with the new scenario descriptor
    pub selected_option_field: String,

    /// Field that must survive the run unchanged
    pub locked_options_field: String,

    /// Output validation settings
    pub validation: ValidationConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            extraction_keys: DEFAULT_EXTRACTION_KEYS.iter().map(|k| k.to_string()).collect(),
            scenario_container: "topicWizardData".to_string(),
            selected_option_field: "selectedScenarioOption".to_string(),
            locked_options_field: "scenarioOptions".to_string(),
            validation: ValidationConfig::default(),
        }
    }
}

impl WorkflowConfig {
    /// Patient preset: more correction rounds
    pub fn patient() -> Self {
        Self {
            max_retries: 5,
            ..Self::default()
        }
    }

    /// Strict preset: no JSON repair, a single attempt
    pub fn strict() -> Self {
        Self {
            max_retries: 1,
            validation: ValidationConfig::strict(),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.extraction_keys.is_empty() {
            return Err("extraction_keys must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for key in &self.extraction_keys {
            if key.is_empty() {
                return Err("extraction_keys must not contain empty names".to_string());
            }
            if !seen.insert(key.as_str()) {
                return Err(format!("extraction key '{}' is listed twice", key));
            }
        }
        if self.selected_option_field.is_empty() {
            return Err("selected_option_field must not be empty".to_string());
        }
        if self.locked_options_field.is_empty() {
            return Err("locked_options_field must not be empty".to_string());
        }
        if seen.contains(self.locked_options_field.as_str()) {
            return Err(format!(
                "locked field '{}' cannot also be an extraction key",
                self.locked_options_field
            ));
        }
        if self.locked_options_field == self.selected_option_field {
            return Err("locked and selected option fields must differ".to_string());
        }
        self.validation.validate()
    }

    /// Whether `key` may be overwritten by the generator
    pub fn is_extraction_key(&self, key: &str) -> bool {
        self.extraction_keys.iter().any(|k| k == key)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }

    /// Borrow the scenario container of `document`
    pub fn container<'a>(&self, document: &'a Value) -> Result<&'a Map<String, Value>, WorkflowError> {
        let mut current = document;
        for segment in self.container_segments() {
            current = current.get(segment).ok_or_else(|| self.missing_container())?;
        }
        current.as_object().ok_or_else(|| self.container_not_object())
    }

    /// Mutably borrow the scenario container of `document`
    pub fn container_mut<'a>(
        &self,
        document: &'a mut Value,
    ) -> Result<&'a mut Map<String, Value>, WorkflowError> {
        let mut current = document;
        for segment in self.container_segments() {
            current = current
                .get_mut(segment)
                .ok_or_else(|| self.missing_container())?;
        }
        match current {
            Value::Object(map) => Ok(map),
            _ => Err(self.container_not_object()),
        }
    }

    /// The scenario-dependent subset of `document`, in extraction key order
    ///
    /// Keys absent from the container are skipped.
    pub fn extract_subset(&self, document: &Value) -> Result<Value, WorkflowError> {
        let container = self.container(document)?;
        let mut subset = Map::new();
        for key in &self.extraction_keys {
            match container.get(key) {
                Some(value) => {
                    subset.insert(key.clone(), value.clone());
                }
                None => warn!("Extraction key '{}' not present in scenario container", key),
            }
        }
        Ok(Value::Object(subset))
    }

    /// The locked field of `document`, if present
    pub fn locked_value<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.container(document)
            .ok()
            .and_then(|c| c.get(&self.locked_options_field))
    }

    fn container_segments(&self) -> impl Iterator<Item = &str> {
        self.scenario_container.split('.').filter(|s| !s.is_empty())
    }

    fn container_label(&self) -> &str {
        if self.scenario_container.is_empty() {
            "(root)"
        } else {
            &self.scenario_container
        }
    }

    fn missing_container(&self) -> WorkflowError {
        WorkflowError::InvalidDocument(format!(
            "scenario container '{}' not found",
            self.container_label()
        ))
    }

    fn container_not_object(&self) -> WorkflowError {
        WorkflowError::InvalidDocument(format!(
            "scenario container '{}' is not an object",
            self.container_label()
        ))
    }
}
