//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use reframe_domain::FidelityVerdict;
use reframe_gatekeeper::{ParseOutcome, ValidationReport};
use reframe_workflow::WorkflowState;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// What a run produced, for display.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: String,
    /// Final phase
    pub status: String,
    /// Correction rounds used
    pub retries: u32,
    /// Schema fidelity, when aggregation ran
    pub schema_fidelity: Option<FidelityVerdict>,
    /// Locked field equality, when aggregation ran
    pub locked_field_equality: Option<FidelityVerdict>,
    /// Wall time of the run
    pub duration_ms: Option<u64>,
    /// Paths that differ between input and output
    pub changed_paths: Vec<String>,
    /// Files written
    pub files: Vec<PathBuf>,
    /// Fatal error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    /// Summarize a final or last-known state.
    pub fn from_state(state: &WorkflowState, files: Vec<PathBuf>, error: Option<String>) -> Self {
        let aggregation = state.aggregation.as_ref();
        Self {
            run_id: state.run_id.to_string(),
            status: state.phase.to_string(),
            retries: state.retries,
            schema_fidelity: aggregation.map(|a| a.schema_fidelity),
            locked_field_equality: aggregation.map(|a| a.locked_field_equality),
            duration_ms: state.duration_ms,
            changed_paths: aggregation
                .map(|a| a.diff.changed_paths().into_iter().map(String::from).collect())
                .unwrap_or_default(),
            files,
            error,
        }
    }

    /// Whether the run produced a merged document.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.schema_fidelity.is_some()
    }
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a run summary.
    pub fn format_run(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
            OutputFormat::Table => Ok(self.format_run_table(summary)),
            OutputFormat::Quiet => Ok(summary.status.clone()),
        }
    }

    fn format_run_table(&self, summary: &RunSummary) -> String {
        let verdict = |v: Option<FidelityVerdict>| match v {
            Some(FidelityVerdict::Pass) => self.colorize("PASS", "green"),
            Some(FidelityVerdict::Fail) => self.colorize("FAIL", "red"),
            None => "-".to_string(),
        };
        let status = if summary.succeeded() {
            self.colorize(&summary.status, "green")
        } else {
            self.colorize(&summary.status, "red")
        };

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        builder.push_record(["Run".to_string(), summary.run_id.clone()]);
        builder.push_record(["Status".to_string(), status]);
        builder.push_record(["Retries".to_string(), summary.retries.to_string()]);
        builder.push_record(["Schema fidelity".to_string(), verdict(summary.schema_fidelity)]);
        builder.push_record(["Locked field".to_string(), verdict(summary.locked_field_equality)]);
        builder.push_record([
            "Duration".to_string(),
            summary
                .duration_ms
                .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
                .unwrap_or_else(|| "-".to_string()),
        ]);
        builder.push_record(["Changed paths".to_string(), summary.changed_paths.join("\n")]);
        builder.push_record([
            "Files".to_string(),
            summary
                .files
                .iter()
                .map(|f| f.display().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        ]);
        if let Some(error) = &summary.error {
            builder.push_record(["Error".to_string(), self.colorize(error, "red")]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format an inferred schema.
    pub fn format_schema(&self, schema: &Value) -> Result<String> {
        match self.format {
            OutputFormat::Quiet => Ok(schema.to_string()),
            OutputFormat::Json | OutputFormat::Table => Ok(serde_json::to_string_pretty(schema)?),
        }
    }

    /// Format a validation report.
    pub fn format_validation(&self, report: &ValidationReport) -> Result<String> {
        let repaired = report
            .document
            .as_ref()
            .map(|d| d.outcome == ParseOutcome::Repaired);

        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "status": report.verdict.label(),
                "message": report.verdict.message(),
                "repaired": repaired,
            }))?),
            OutputFormat::Quiet => Ok(report.verdict.label().to_string()),
            OutputFormat::Table => {
                let mut lines = Vec::new();
                if report.verdict.is_pass() {
                    lines.push(self.success("Document conforms to the schema"));
                } else {
                    lines.push(self.error(&report.verdict.to_string()));
                }
                if repaired == Some(true) {
                    lines.push(self.warning("JSON needed repair before parsing"));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
