//! Command implementations.

pub mod profile;
pub mod run;
pub mod schema;
pub mod validate;

pub use self::profile::execute_profile;
pub use self::run::{execute_run, run_pipeline};
pub use self::schema::execute_schema;
pub use self::validate::execute_validate;

use crate::error::{CliError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read and parse a JSON document.
pub(crate) fn read_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::InvalidInput(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::InvalidInput(format!("{} is not valid JSON: {}", path.display(), e)))
}
