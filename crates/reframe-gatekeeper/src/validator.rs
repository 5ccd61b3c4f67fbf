//! Generator output validation

use crate::config::ValidationConfig;
use crate::error::GatekeeperError;
use crate::repair::repair_json;
use crate::sanitize::sanitize;
use jsonschema::{Draft, JSONSchema};
use reframe_domain::ValidationVerdict;
use serde_json::Value;
use tracing::{debug, warn};

/// How a document was obtained from text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Strict JSON parsing succeeded
    Clean,

    /// Strict parsing failed and the repair parser recovered a value
    Repaired,
}

/// A parsed document together with how it was parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// The parsed value
    pub value: Value,

    /// Whether repair was needed
    pub outcome: ParseOutcome,
}

/// Result of validating generator text
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Classified verdict
    pub verdict: ValidationVerdict,

    /// The parsed document, when parsing succeeded
    pub document: Option<ParsedDocument>,
}

/// The Gatekeeper checks generator output against an inferred schema
#[derive(Debug, Clone, Default)]
pub struct Gatekeeper {
    config: ValidationConfig,
}

impl Gatekeeper {
    /// Create a new Gatekeeper with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Create a Gatekeeper with default configuration
    pub fn default_config() -> Self {
        Self::new(ValidationConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Sanitize and parse generator text
    ///
    /// Strict parsing is tried first; the repair parser only runs when it
    /// fails and repair is enabled.
    pub fn parse(&self, text: &str) -> Result<ParsedDocument, GatekeeperError> {
        let cleaned = if self.config.strip_code_fences {
            sanitize(text)
        } else {
            text.trim().to_string()
        };

        let strict_error = match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => {
                return Ok(ParsedDocument {
                    value,
                    outcome: ParseOutcome::Clean,
                })
            }
            Err(e) => e,
        };

        if !self.config.repair_malformed_json {
            return Err(GatekeeperError::Parse(strict_error.to_string()));
        }

        debug!("Strict JSON parse failed ({}), attempting repair", strict_error);
        match repair_json(&cleaned) {
            Ok(value) => {
                warn!("Generator output needed JSON repair: {}", strict_error);
                Ok(ParsedDocument {
                    value,
                    outcome: ParseOutcome::Repaired,
                })
            }
            Err(repair_error) => Err(GatekeeperError::Parse(format!(
                "{} (repair failed: {})",
                strict_error, repair_error
            ))),
        }
    }

    /// Check that `schema` compiles as a draft 7 schema
    pub fn check_schema(&self, schema: &Value) -> Result<(), GatekeeperError> {
        compile(schema).map(|_| ())
    }

    /// Check a parsed value against a schema
    ///
    /// On mismatch the error carries the first violation, naming the
    /// offending path and the expected versus actual value.
    pub fn check(&self, value: &Value, schema: &Value) -> Result<(), GatekeeperError> {
        let compiled = compile(schema)?;

        let first_violation = match compiled.validate(value) {
            Ok(()) => None,
            Err(mut errors) => errors.next().map(|error| {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() { "(root)".to_string() } else { path };
                format!("at '{}': {}", path, error)
            }),
        };

        match first_violation {
            None => Ok(()),
            Some(message) => Err(GatekeeperError::Violation(self.truncate(message))),
        }
    }

    /// Whether a parsed value conforms to a schema
    pub fn conforms(&self, value: &Value, schema: &Value) -> bool {
        self.check(value, schema).is_ok()
    }

    /// Validate generator text and keep the parsed document
    pub fn validate_document(&self, text: &str, schema: &Value) -> ValidationReport {
        let document = match self.parse(text) {
            Ok(document) => document,
            Err(e) => {
                return ValidationReport {
                    verdict: ValidationVerdict::ParseError(self.truncate(e.to_string())),
                    document: None,
                }
            }
        };

        let verdict = match self.check(&document.value, schema) {
            Ok(()) => ValidationVerdict::Pass,
            Err(e) => ValidationVerdict::SchemaViolation(e.to_string()),
        };

        ValidationReport {
            verdict,
            document: Some(document),
        }
    }

    /// Validate generator text against a schema
    pub fn validate(&self, text: &str, schema: &Value) -> ValidationVerdict {
        self.validate_document(text, schema).verdict
    }

    fn truncate(&self, message: String) -> String {
        let limit = self.config.max_message_chars;
        if message.chars().count() <= limit {
            return message;
        }
        let mut cut: String = message.chars().take(limit).collect();
        cut.push('…');
        cut
    }
}

fn compile(schema: &Value) -> Result<JSONSchema, GatekeeperError> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|e| GatekeeperError::Schema(e.to_string()))
}
