//! The recontextualization pipeline driver

use crate::aggregator::{AggregationResult, Aggregator};
use crate::config::WorkflowConfig;
use crate::error::{RunFailure, WorkflowError};
use crate::retry::RetryController;
use crate::state::{now_millis, StateLog, StateUpdate, WorkflowState};
use reframe_domain::traits::GenerationPort;
use reframe_domain::{ChatMessage, WorkflowPhase};
use reframe_gatekeeper::{infer_schema, Gatekeeper};
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Input to a run
#[derive(Debug, Clone)]
pub struct RecontextualizationRequest {
    /// Scenario the document currently describes
    pub current_scenario: String,

    /// Scenario to adapt the document to
    pub new_scenario: String,

    /// The full document
    pub document: Value,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// Validation passed and the fragment was merged
    Completed(WorkflowState),

    /// Every allowed attempt failed validation; nothing was merged
    RetryLimitExceeded(WorkflowState),
}

impl WorkflowOutcome {
    /// Final state of the run
    pub fn state(&self) -> &WorkflowState {
        match self {
            WorkflowOutcome::Completed(state) | WorkflowOutcome::RetryLimitExceeded(state) => state,
        }
    }

    /// Consume the outcome, returning the final state
    pub fn into_state(self) -> WorkflowState {
        match self {
            WorkflowOutcome::Completed(state) | WorkflowOutcome::RetryLimitExceeded(state) => state,
        }
    }

    /// Whether the run produced a merged document
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed(_))
    }

    /// Aggregation result of a completed run
    pub fn aggregation(&self) -> Option<&AggregationResult> {
        self.state().aggregation.as_ref()
    }
}

/// Adapts a document to a new scenario through a generator
pub struct Recontextualizer<L>
where
    L: GenerationPort,
{
    port: Arc<L>,
    gatekeeper: Gatekeeper,
    config: WorkflowConfig,
}

impl<L> Recontextualizer<L>
where
    L: GenerationPort + Send + Sync + 'static,
    L::Error: Display,
{
    /// Create a new Recontextualizer
    pub fn new(port: L, config: WorkflowConfig) -> Self {
        Self {
            port: Arc::new(port),
            gatekeeper: Gatekeeper::new(config.validation.clone()),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the pipeline
    ///
    /// Retry exhaustion is a normal outcome. Generator failures, invalid
    /// configuration and documents without a scenario container are
    /// returned as a [`RunFailure`] carrying the last committed state.
    pub async fn run(&self, request: RecontextualizationRequest) -> Result<WorkflowOutcome, RunFailure> {
        let (log, result) = self.run_with_log(request).await;
        result.map_err(|error| RunFailure::new(error, log.into_latest()))
    }

    /// Run the pipeline and keep every committed snapshot
    pub async fn run_with_log(
        &self,
        request: RecontextualizationRequest,
    ) -> (StateLog, Result<WorkflowOutcome, WorkflowError>) {
        let initial = WorkflowState::new(request.current_scenario, request.new_scenario, request.document);
        let mut log = StateLog::new(initial);

        let result = self.execute(&mut log).await;
        if let Err(e) = &result {
            error!(
                "Run {} failed in phase {}: {}",
                log.latest().run_id,
                log.latest().phase,
                e
            );
        }
        (log, result)
    }

    async fn execute(&self, log: &mut StateLog) -> Result<WorkflowOutcome, WorkflowError> {
        self.config.validate().map_err(WorkflowError::Config)?;

        info!(
            "Starting run {} with model '{}', max {} retries",
            log.latest().run_id,
            self.port.model_name(),
            self.config.max_retries
        );

        let update = self.prepare(log.latest())?;
        log.commit(update);

        let controller = RetryController::new(&self.gatekeeper, self.config.max_retries);
        let port = Arc::clone(&self.port);
        let phase = controller
            .drive(log, |history| call_port(Arc::clone(&port), history))
            .await?;

        if phase != WorkflowPhase::Passed {
            log.commit(StateUpdate {
                ended_at_ms: Some(now_millis()),
                ..StateUpdate::default()
            });
            warn!(
                "Run {} exhausted {} retries without valid output",
                log.latest().run_id,
                self.config.max_retries
            );
            return Ok(WorkflowOutcome::RetryLimitExceeded(log.latest().clone()));
        }

        let update = self.aggregate(log.latest())?;
        log.commit(update);

        let state = log.latest();
        info!(
            "Run {} completed in {} ms after {} retries",
            state.run_id,
            state.duration_ms.unwrap_or_default(),
            state.retries
        );
        Ok(WorkflowOutcome::Completed(state.clone()))
    }

    /// Extract the scenario-dependent subset and infer its schema
    fn prepare(&self, state: &WorkflowState) -> Result<StateUpdate, WorkflowError> {
        let fragment = self.config.extract_subset(&state.original_document)?;
        let schema = infer_schema(&fragment);
        self.gatekeeper.check_schema(&schema)?;

        debug!(
            "Extracted {} scenario fields, schema {} bytes",
            fragment.as_object().map(|m| m.len()).unwrap_or_default(),
            schema.to_string().len()
        );

        Ok(StateUpdate {
            source_fragment: Some(fragment),
            fragment_schema: Some(schema),
            ..StateUpdate::default()
        })
    }

    fn aggregate(&self, state: &WorkflowState) -> Result<StateUpdate, WorkflowError> {
        let fragment = state.validated_fragment.as_ref().ok_or_else(|| {
            WorkflowError::Phase("aggregation requested without a validated fragment".to_string())
        })?;

        let result = Aggregator::new(&self.config, &self.gatekeeper).aggregate(
            &state.original_document,
            fragment,
            &state.new_scenario,
            state.started_at_ms,
        )?;

        Ok(StateUpdate {
            ended_at_ms: Some(state.started_at_ms + result.duration_ms),
            aggregation: Some(result),
            ..StateUpdate::default()
        })
    }
}

/// Call the synchronous port on the blocking pool
async fn call_port<L>(port: Arc<L>, history: Vec<ChatMessage>) -> Result<String, WorkflowError>
where
    L: GenerationPort + Send + Sync + 'static,
    L::Error: Display,
{
    let reply = tokio::task::spawn_blocking(move || {
        port.generate(&history).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| WorkflowError::Task(e.to_string()))?
    .map_err(WorkflowError::Generation)?;

    debug!("Generator reply length: {} chars", reply.len());
    Ok(reply)
}
