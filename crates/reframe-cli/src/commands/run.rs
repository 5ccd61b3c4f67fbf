//! Run command implementation.

use crate::cli::RunArgs;
use crate::commands::read_document;
use crate::config::{load_workflow_config, Config};
use crate::error::{CliError, Result};
use crate::output::{Formatter, RunSummary};
use reframe_domain::traits::GenerationPort;
use reframe_llm::OllamaProvider;
use reframe_workflow::{
    RecontextualizationRequest, Recontextualizer, StructuralDiff, WorkflowConfig, WorkflowOutcome,
};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Execute the run command.
pub async fn execute_run(args: RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let document = read_document(&args.input)?;
    let current_scenario = scenario_text(args.current_scenario, args.current_scenario_file.as_deref())?;
    let new_scenario = scenario_text(args.new_scenario, args.new_scenario_file.as_deref())?;

    let mut workflow = load_workflow_config(args.workflow_config.as_deref())?;
    if let Some(max_retries) = args.max_retries {
        workflow.max_retries = max_retries;
    }

    let profile = config.get_active_profile()?;
    let generator = OllamaProvider::with_timeout(
        &profile.endpoint,
        &profile.model,
        Duration::from_secs(profile.timeout_secs),
    )?;
    info!("Using model '{}' at {}", profile.model, profile.endpoint);

    let request = RecontextualizationRequest {
        current_scenario,
        new_scenario,
        document,
    };
    let summary = run_pipeline(generator, workflow, request, &args.output_dir).await?;

    println!("{}", formatter.format_run(&summary)?);
    if summary.succeeded() {
        Ok(())
    } else {
        Err(CliError::RunFailed(
            summary
                .error
                .unwrap_or_else(|| format!("ended in phase {}", summary.status)),
        ))
    }
}

/// Run the pipeline and write its artifacts to `output_dir`.
///
/// A completed run writes `output.json` and `changed_fields.json`. An
/// exhausted or failed run writes `state.json` with the last known state.
pub async fn run_pipeline<L>(
    generator: L,
    workflow: WorkflowConfig,
    request: RecontextualizationRequest,
    output_dir: &Path,
) -> Result<RunSummary>
where
    L: GenerationPort + Send + Sync + 'static,
    L::Error: Display,
{
    fs::create_dir_all(output_dir)?;
    let pipeline = Recontextualizer::new(generator, workflow);

    match pipeline.run(request).await {
        Ok(WorkflowOutcome::Completed(state)) => {
            let mut files = Vec::new();
            if let Some(result) = &state.aggregation {
                files.push(write_json(output_dir, "output.json", &result.merged_document)?);
                let changed = ChangedFields {
                    changed_paths: result.diff.changed_paths(),
                    entries: &result.diff,
                };
                files.push(write_json(output_dir, "changed_fields.json", &changed)?);
            }
            Ok(RunSummary::from_state(&state, files, None))
        }
        Ok(WorkflowOutcome::RetryLimitExceeded(state)) => {
            let file = write_json(output_dir, "state.json", &state)?;
            Ok(RunSummary::from_state(&state, vec![file], None))
        }
        Err(failure) => {
            let file = write_json(output_dir, "state.json", &failure.last_state)?;
            Ok(RunSummary::from_state(
                &failure.last_state,
                vec![file],
                Some(failure.error.to_string()),
            ))
        }
    }
}

/// Contents of `changed_fields.json`
#[derive(Serialize)]
struct ChangedFields<'a> {
    changed_paths: Vec<&'a str>,
    entries: &'a StructuralDiff,
}

fn scenario_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => return Err(CliError::InvalidInput("scenario text is required".to_string())),
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(CliError::InvalidInput("scenario text is empty".to_string()));
    }
    Ok(text)
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value)?)?;
    info!("Wrote {}", path.display());
    Ok(path)
}
