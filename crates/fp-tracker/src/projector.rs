//! Progress projection
//!
//! Builds a [`ProgressSummary`] from two independent engine reads: the full
//! event history and the status snapshot. The history is walked twice.
//! [`passed_states`] stops at the first terminal event, while
//! [`failure_cause`] always scans every event, so moving the stopping point
//! of the trail can never hide a failure cause.

use crate::summary::ProgressSummary;
use fp_core::{EventKind, ExecutionId, HistoryEvent, Result, WorkflowEngine};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Trail of states in event order, ending at the first terminal event
pub fn passed_states(events: &[HistoryEvent]) -> Vec<String> {
    let mut passed = Vec::new();

    for event in events {
        match &event.kind {
            EventKind::ExecutionStarted => passed.push(event.kind.to_string()),
            EventKind::ExecutionSucceeded | EventKind::ExecutionFailed => {
                passed.push(event.kind.to_string());
                break;
            }
            _ => {
                if let Some(name) = event.entered_state() {
                    passed.push(name.to_string());
                }
            }
        }
    }

    passed
}

/// Cause of the first `ExecutionFailed` event anywhere in the history
pub fn failure_cause(events: &[HistoryEvent]) -> Option<String> {
    events
        .iter()
        .find(|event| event.kind == EventKind::ExecutionFailed)
        .and_then(|event| event.failure_cause())
        .map(str::to_string)
}

/// Derives progress summaries from engine reads. Holds no mutable state.
#[derive(Clone)]
pub struct ExecutionProjector {
    engine: Arc<dyn WorkflowEngine>,
}

impl ExecutionProjector {
    pub fn new(engine: Arc<dyn WorkflowEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn WorkflowEngine> {
        &self.engine
    }

    #[instrument(skip(self), fields(execution_id = %execution_id, engine = self.engine.name()))]
    pub async fn project(&self, execution_id: &ExecutionId) -> Result<ProgressSummary> {
        let events = self.engine.get_execution_history(execution_id).await?;
        let passed = passed_states(&events);

        let description = self.engine.describe_execution(execution_id).await?;

        let cause = failure_cause(&events);

        debug!(
            events = events.len(),
            passed = passed.len(),
            status = %description.status,
            failed = cause.is_some(),
            "Projected execution progress"
        );

        Ok(ProgressSummary::new(
            passed,
            description.status,
            description.output,
            cause,
        ))
    }
}
