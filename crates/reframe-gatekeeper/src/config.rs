//! Gatekeeper configuration

use serde::{Deserialize, Serialize};

/// Configuration for output validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Attempt best-effort repair when strict JSON parsing fails
    pub repair_malformed_json: bool,

    /// Strip a surrounding markdown code fence before parsing
    pub strip_code_fences: bool,

    /// Longest violation message handed back to the generator (characters)
    pub max_message_chars: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            repair_malformed_json: true,
            strip_code_fences: true,
            max_message_chars: 2_000,
        }
    }
}

impl ValidationConfig {
    /// Strict configuration: only clean JSON is accepted
    pub fn strict() -> Self {
        Self {
            repair_malformed_json: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_message_chars == 0 {
            return Err("max_message_chars must be greater than 0".to_string());
        }
        Ok(())
    }
}
