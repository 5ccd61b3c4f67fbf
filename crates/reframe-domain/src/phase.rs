//! Phase module - the generate/validate/correct state machine
//!
//! The transition table is expressed as pure functions so the retry bound can
//! be tested without ever invoking a generator.

use crate::verdict::ValidationVerdict;
use serde::{Deserialize, Serialize};

/// Default bound on failed validations before a run gives up
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Phase of a recontextualization run
///
/// ```text
/// Generating ──► Validating ──► Passed
///                  ▲   │
///                  │   ├──► FailedLimitExceeded
///                  │   ▼
///                Correcting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// Waiting for the first completion
    Generating,

    /// Checking the latest completion against the schema
    Validating,

    /// Waiting for a corrected completion
    Correcting,

    /// The latest completion passed validation
    Passed,

    /// The retry budget ran out
    FailedLimitExceeded,
}

impl WorkflowPhase {
    /// Phase every run starts in
    pub fn initial() -> Self {
        WorkflowPhase::Generating
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowPhase::Passed | WorkflowPhase::FailedLimitExceeded
        )
    }

    /// Get the phase name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Generating => "generating",
            WorkflowPhase::Validating => "validating",
            WorkflowPhase::Correcting => "correcting",
            WorkflowPhase::Passed => "passed",
            WorkflowPhase::FailedLimitExceeded => "failed_limit_exceeded",
        }
    }

    /// Transition taken after a completion has been recorded
    ///
    /// Both `Generating` and `Correcting` move to `Validating`; any other
    /// phase has no generation edge and is returned unchanged.
    pub fn next_after_generation(self) -> Self {
        match self {
            WorkflowPhase::Generating | WorkflowPhase::Correcting => WorkflowPhase::Validating,
            other => other,
        }
    }

    /// Transition taken out of `Validating`
    ///
    /// Returns the next phase and the updated retry counter. A failing
    /// verdict is counted first and the bound is checked against the new
    /// count, so with `max_retries = N >= 1` a run makes at most `N`
    /// generation attempts and ends with exactly `N` recorded retries. A
    /// counter that already sits at the bound is never incremented, which
    /// keeps `retries <= max_retries` for every trace (including `N = 0`).
    ///
    /// # Examples
    ///
    /// ```
    /// use reframe_domain::{ValidationVerdict, WorkflowPhase};
    ///
    /// let fail = ValidationVerdict::ParseError("eof".into());
    /// assert_eq!(
    ///     WorkflowPhase::next_after_validation(&fail, 0, 3),
    ///     (WorkflowPhase::Correcting, 1)
    /// );
    /// assert_eq!(
    ///     WorkflowPhase::next_after_validation(&fail, 2, 3),
    ///     (WorkflowPhase::FailedLimitExceeded, 3)
    /// );
    /// ```
    pub fn next_after_validation(
        verdict: &ValidationVerdict,
        retries: u32,
        max_retries: u32,
    ) -> (Self, u32) {
        if verdict.is_pass() {
            return (WorkflowPhase::Passed, retries);
        }
        if retries >= max_retries {
            return (WorkflowPhase::FailedLimitExceeded, retries);
        }

        let retries = retries + 1;
        if retries >= max_retries {
            (WorkflowPhase::FailedLimitExceeded, retries)
        } else {
            (WorkflowPhase::Correcting, retries)
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
