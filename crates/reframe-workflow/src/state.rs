//! Run state, partial updates and snapshot history

use crate::aggregator::AggregationResult;
use reframe_domain::{ChatMessage, ConversationHistory, RunId, ValidationVerdict, WorkflowPhase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The record threaded through a run
///
/// Stages never modify a state in place. They read it and return a
/// [`StateUpdate`], which [`WorkflowState::apply`] merges into a new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Run identifier
    pub run_id: RunId,

    /// Current position in the retry state machine
    pub phase: WorkflowPhase,

    /// Scenario the document currently describes
    pub current_scenario: String,

    /// Scenario the document should be adapted to
    pub new_scenario: String,

    /// The full input document
    pub original_document: Value,

    /// Scenario-dependent subset handed to the generator
    pub source_fragment: Option<Value>,

    /// Schema inferred from the subset
    pub fragment_schema: Option<Value>,

    /// Latest raw generator output
    pub generated_output: String,

    /// Failed validations counted so far
    pub retries: u32,

    /// Most recent validation verdict
    pub last_verdict: Option<ValidationVerdict>,

    /// Every raw generator output, oldest first
    pub generator_outputs: Vec<String>,

    /// Every validation verdict, oldest first
    pub verdicts: Vec<ValidationVerdict>,

    /// Messages exchanged with the generator
    pub conversation: ConversationHistory,

    /// Parsed output of the passing validation
    pub validated_fragment: Option<Value>,

    /// Run start (ms since epoch)
    pub started_at_ms: u64,

    /// Run end (ms since epoch)
    pub ended_at_ms: Option<u64>,

    /// Wall time of the run
    pub duration_ms: Option<u64>,

    /// Merge results, present once aggregation ran
    pub aggregation: Option<AggregationResult>,
}

impl WorkflowState {
    /// Fresh state with empty histories and a zero counter
    pub fn new(
        current_scenario: impl Into<String>,
        new_scenario: impl Into<String>,
        original_document: Value,
    ) -> Self {
        Self {
            run_id: RunId::new(),
            phase: WorkflowPhase::initial(),
            current_scenario: current_scenario.into(),
            new_scenario: new_scenario.into(),
            original_document,
            source_fragment: None,
            fragment_schema: None,
            generated_output: String::new(),
            retries: 0,
            last_verdict: None,
            generator_outputs: Vec::new(),
            verdicts: Vec::new(),
            conversation: ConversationHistory::new(),
            validated_fragment: None,
            started_at_ms: now_millis(),
            ended_at_ms: None,
            duration_ms: None,
            aggregation: None,
        }
    }

    /// Whether the run has reached `Passed` or `FailedLimitExceeded`
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Merge a partial update into a copy of this state
    ///
    /// Fields the update leaves unset keep their value, histories are only
    /// appended to and the retry counter never decreases.
    pub fn apply(&self, update: StateUpdate) -> WorkflowState {
        let mut next = self.clone();

        if let Some(phase) = update.phase {
            next.phase = phase;
        }
        if let Some(fragment) = update.source_fragment {
            next.source_fragment = Some(fragment);
        }
        if let Some(schema) = update.fragment_schema {
            next.fragment_schema = Some(schema);
        }
        if let Some(output) = update.generated_output {
            next.generated_output = output;
        }
        if let Some(retries) = update.retries {
            next.retries = next.retries.max(retries);
        }
        if let Some(verdict) = update.last_verdict {
            next.last_verdict = Some(verdict);
        }
        if let Some(fragment) = update.validated_fragment {
            next.validated_fragment = Some(fragment);
        }
        if let Some(ended) = update.ended_at_ms {
            next.ended_at_ms = Some(ended);
            next.duration_ms = Some(ended.saturating_sub(next.started_at_ms));
        }
        if let Some(aggregation) = update.aggregation {
            next.aggregation = Some(aggregation);
        }

        next.generator_outputs.extend(update.new_outputs);
        next.verdicts.extend(update.new_verdicts);
        next.conversation.extend(update.new_messages);
        next
    }
}

/// Changes produced by one stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    /// Phase to move to
    pub phase: Option<WorkflowPhase>,

    /// Extracted subset
    pub source_fragment: Option<Value>,

    /// Inferred subset schema
    pub fragment_schema: Option<Value>,

    /// Latest raw output
    pub generated_output: Option<String>,

    /// New retry count
    pub retries: Option<u32>,

    /// Latest verdict
    pub last_verdict: Option<ValidationVerdict>,

    /// Parsed passing output
    pub validated_fragment: Option<Value>,

    /// Run end; also sets the duration
    pub ended_at_ms: Option<u64>,

    /// Aggregation result
    pub aggregation: Option<AggregationResult>,

    /// Outputs to append
    pub new_outputs: Vec<String>,

    /// Verdicts to append
    pub new_verdicts: Vec<ValidationVerdict>,

    /// Messages to append
    pub new_messages: Vec<ChatMessage>,
}

/// Snapshots committed by the driver, oldest first
#[derive(Debug, Clone)]
pub struct StateLog {
    snapshots: Vec<WorkflowState>,
}

impl StateLog {
    /// Start a log from the initial state
    pub fn new(initial: WorkflowState) -> Self {
        Self {
            snapshots: vec![initial],
        }
    }

    /// Most recent snapshot
    pub fn latest(&self) -> &WorkflowState {
        // never empty: constructed with one snapshot and only appended to
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Merge `update` into the latest snapshot and record the result
    pub fn commit(&mut self, update: StateUpdate) -> &WorkflowState {
        let next = self.latest().apply(update);
        self.snapshots.push(next);
        self.latest()
    }

    /// All snapshots, oldest first
    pub fn snapshots(&self) -> &[WorkflowState] {
        &self.snapshots
    }

    /// Number of committed snapshots, including the initial one
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false; a log holds at least its initial state
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consume the log, keeping only the most recent snapshot
    pub fn into_latest(mut self) -> WorkflowState {
        let last = self.snapshots.len() - 1;
        self.snapshots.swap_remove(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn initial() -> WorkflowState {
        WorkflowState::new("old", "new", json!({"topicWizardData": {}}))
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = initial();
        assert_eq!(state.phase, WorkflowPhase::Generating);
        assert_eq!(state.retries, 0);
        assert!(state.generator_outputs.is_empty());
        assert!(state.verdicts.is_empty());
        assert!(state.conversation.is_empty());
        assert!(state.aggregation.is_none());
    }

    #[test]
    fn test_apply_leaves_source_untouched() {
        let state = initial();
        let next = state.apply(StateUpdate {
            phase: Some(WorkflowPhase::Validating),
            generated_output: Some("{}".to_string()),
            new_outputs: vec!["{}".to_string()],
            ..StateUpdate::default()
        });

        assert_eq!(state.phase, WorkflowPhase::Generating);
        assert!(state.generator_outputs.is_empty());
        assert_eq!(next.phase, WorkflowPhase::Validating);
        assert_eq!(next.generator_outputs, vec!["{}"]);
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        let state = initial();
        assert_eq!(state.apply(StateUpdate::default()), state);
    }

    #[test]
    fn test_histories_only_grow() {
        let state = initial()
            .apply(StateUpdate {
                new_messages: vec![ChatMessage::user("a"), ChatMessage::assistant("b")],
                new_verdicts: vec![ValidationVerdict::ParseError("x".into())],
                ..StateUpdate::default()
            })
            .apply(StateUpdate {
                new_messages: vec![ChatMessage::user("c")],
                new_verdicts: vec![ValidationVerdict::Pass],
                ..StateUpdate::default()
            });

        assert_eq!(state.conversation.len(), 3);
        assert_eq!(state.conversation.messages()[0].content, "a");
        assert_eq!(state.verdicts.len(), 2);
    }

    #[test]
    fn test_retries_never_decrease() {
        let state = initial().apply(StateUpdate {
            retries: Some(2),
            ..StateUpdate::default()
        });
        let state = state.apply(StateUpdate {
            retries: Some(1),
            ..StateUpdate::default()
        });
        assert_eq!(state.retries, 2);
    }

    #[test]
    fn test_end_time_sets_duration() {
        let state = initial();
        let ended = state.started_at_ms + 250;
        let state = state.apply(StateUpdate {
            ended_at_ms: Some(ended),
            ..StateUpdate::default()
        });
        assert_eq!(state.duration_ms, Some(250));
    }

    #[test]
    fn test_log_keeps_every_snapshot() {
        let mut log = StateLog::new(initial());
        log.commit(StateUpdate {
            phase: Some(WorkflowPhase::Validating),
            ..StateUpdate::default()
        });
        log.commit(StateUpdate {
            phase: Some(WorkflowPhase::Passed),
            ..StateUpdate::default()
        });

        assert_eq!(log.len(), 3);
        assert!(!log.is_empty());
        assert_eq!(log.snapshots()[1].phase, WorkflowPhase::Validating);
        assert_eq!(log.into_latest().phase, WorkflowPhase::Passed);
    }

    #[test]
    fn test_state_serializes() {
        let state = initial();
        let text = serde_json::to_string(&state).unwrap();
        let back: WorkflowState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, state);
        assert!(text.contains("\"phase\":\"generating\""));
    }
}
