//! The generate / validate / correct loop

use crate::error::WorkflowError;
use crate::prompt::{correction_prompt, PromptBuilder};
use crate::state::{StateLog, StateUpdate, WorkflowState};
use reframe_domain::{ChatMessage, WorkflowPhase};
use reframe_gatekeeper::Gatekeeper;
use std::future::Future;
use tracing::{debug, info, warn};

/// Drives a run from `Generating` to `Passed` or `FailedLimitExceeded`
///
/// Each step reads the latest snapshot and returns a [`StateUpdate`]; only
/// [`drive`](Self::drive) commits updates to the log.
pub struct RetryController<'a> {
    gatekeeper: &'a Gatekeeper,
    max_retries: u32,
}

impl<'a> RetryController<'a> {
    /// Create a controller allowing `max_retries` failed validations
    pub fn new(gatekeeper: &'a Gatekeeper, max_retries: u32) -> Self {
        Self {
            gatekeeper,
            max_retries,
        }
    }

    /// Configured retry bound
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The user message to send in the current phase
    ///
    /// `Generating` asks for the adaptation; `Correcting` quotes the last
    /// verdict and restates the schema.
    pub fn next_prompt(&self, state: &WorkflowState) -> Result<ChatMessage, WorkflowError> {
        match state.phase {
            WorkflowPhase::Generating => {
                let fragment = state.source_fragment.clone().ok_or_else(|| {
                    WorkflowError::Phase("generation requested before extraction".to_string())
                })?;
                let prompt =
                    PromptBuilder::new(&state.current_scenario, &state.new_scenario, fragment).build();
                Ok(ChatMessage::user(prompt))
            }
            WorkflowPhase::Correcting => {
                let message = state
                    .last_verdict
                    .as_ref()
                    .and_then(|v| v.message())
                    .ok_or_else(|| {
                        WorkflowError::Phase("correction requested without a failed verdict".to_string())
                    })?;
                let schema = self.schema(state)?;
                Ok(ChatMessage::user(correction_prompt(message, schema)))
            }
            other => Err(WorkflowError::Phase(format!("no generation step from {}", other))),
        }
    }

    /// Record a generator reply to `prompt`
    pub fn record_generation(
        &self,
        state: &WorkflowState,
        prompt: ChatMessage,
        reply: String,
    ) -> StateUpdate {
        StateUpdate {
            phase: Some(state.phase.next_after_generation()),
            generated_output: Some(reply.clone()),
            new_outputs: vec![reply.clone()],
            new_messages: vec![prompt, ChatMessage::assistant(reply)],
            ..StateUpdate::default()
        }
    }

    /// Validate the latest output and pick the next phase
    pub fn validate(&self, state: &WorkflowState) -> Result<StateUpdate, WorkflowError> {
        if state.phase != WorkflowPhase::Validating {
            return Err(WorkflowError::Phase(format!("cannot validate in {}", state.phase)));
        }

        let schema = self.schema(state)?;
        let report = self.gatekeeper.validate_document(&state.generated_output, schema);
        let (phase, retries) =
            WorkflowPhase::next_after_validation(&report.verdict, state.retries, self.max_retries);

        match phase {
            WorkflowPhase::Passed => info!("Validation passed after {} retries", retries),
            WorkflowPhase::Correcting => warn!(
                "Validation failed ({}), retry {}/{}",
                report.verdict, retries, self.max_retries
            ),
            _ => warn!(
                "Validation failed ({}), retry limit {} reached",
                report.verdict, self.max_retries
            ),
        }

        let validated_fragment = if report.verdict.is_pass() {
            report.document.map(|d| d.value)
        } else {
            None
        };

        Ok(StateUpdate {
            phase: Some(phase),
            retries: Some(retries),
            last_verdict: Some(report.verdict.clone()),
            new_verdicts: vec![report.verdict],
            validated_fragment,
            ..StateUpdate::default()
        })
    }

    /// Run the loop until a terminal phase, committing every step to `log`
    ///
    /// `generate` receives the full conversation to send. Its errors end
    /// the loop immediately; the log keeps the last committed snapshot.
    pub async fn drive<F, Fut>(
        &self,
        log: &mut StateLog,
        mut generate: F,
    ) -> Result<WorkflowPhase, WorkflowError>
    where
        F: FnMut(Vec<ChatMessage>) -> Fut,
        Fut: Future<Output = Result<String, WorkflowError>>,
    {
        loop {
            let phase = log.latest().phase;
            match phase {
                WorkflowPhase::Generating | WorkflowPhase::Correcting => {
                    let (prompt, history) = {
                        let state = log.latest();
                        let prompt = self.next_prompt(state)?;
                        let history = state.conversation.with(prompt.clone());
                        (prompt, history.messages().to_vec())
                    };
                    debug!("{}: sending {} messages", phase, history.len());

                    let reply = generate(history).await?;
                    let update = self.record_generation(log.latest(), prompt, reply);
                    log.commit(update);
                }
                WorkflowPhase::Validating => {
                    let update = self.validate(log.latest())?;
                    log.commit(update);
                }
                WorkflowPhase::Passed | WorkflowPhase::FailedLimitExceeded => return Ok(phase),
            }
        }
    }

    fn schema<'s>(&self, state: &'s WorkflowState) -> Result<&'s serde_json::Value, WorkflowError> {
        state
            .fragment_schema
            .as_ref()
            .ok_or_else(|| WorkflowError::Phase("no schema inferred for this run".to_string()))
    }
}
