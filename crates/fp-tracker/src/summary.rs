//! Progress summary returned to pollers

use fp_core::ExecutionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendered in place of an absent current state or result
const ABSENT: &str = "null";

/// Projection of an execution's current standing
///
/// Recomputed on every poll and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    /// States in the order the engine entered them
    pub passed_states: Vec<String>,
    pub current_state: Option<String>,
    pub status: ExecutionStatus,
    pub result: Option<String>,
    pub failure_cause: Option<String>,
}

impl ProgressSummary {
    pub fn new(
        passed_states: Vec<String>,
        status: ExecutionStatus,
        result: Option<String>,
        failure_cause: Option<String>,
    ) -> Self {
        let current_state = passed_states.last().cloned();
        Self {
            passed_states,
            current_state,
            status,
            result,
            failure_cause,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure_cause.is_some()
    }

    /// Plain text body served to pollers
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProgressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cause) = &self.failure_cause {
            write!(f, "Execution Error: {}\n\n", cause)?;
        }
        write!(
            f,
            "Passed States: {}\nCurrent State: {}\nExecution Status: {}\nExecution Result: {}",
            self.passed_states.join(", "),
            self.current_state.as_deref().unwrap_or(ABSENT),
            self.status,
            self.result.as_deref().unwrap_or(ABSENT),
        )
    }
}
