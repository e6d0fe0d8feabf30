use crate::registry::SessionKey;
use crate::summary::ProgressSummary;
use fp_core::{Error, ExecutionId};
use tracing::{info, instrument, warn};

/// Structured trace events for trigger activity
/// Uses tracing directly rather than an OpenTelemetry exporter
pub struct ExecutionTelemetry {
    service_name: String,
}

impl ExecutionTelemetry {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[instrument(skip(self), fields(service = %self.service_name))]
    pub fn execution_started(&self, session: &SessionKey, execution_id: &ExecutionId) {
        info!("Execution started");
    }

    #[instrument(skip(self, summary), fields(
        service = %self.service_name,
        status = %summary.status,
        current_state = ?summary.current_state,
        passed = summary.passed_states.len()
    ))]
    pub fn progress_reported(
        &self,
        session: &SessionKey,
        execution_id: &ExecutionId,
        summary: &ProgressSummary,
        duration_ms: u64,
    ) {
        if let Some(cause) = &summary.failure_cause {
            info!(cause = %cause, "Reported failed execution");
        } else {
            info!("Reported execution progress");
        }
    }

    #[instrument(skip(self, error), fields(service = %self.service_name, kind = error.kind()))]
    pub fn engine_failed(&self, session: &SessionKey, error: &Error) {
        warn!(error = %error, "Engine call failed");
    }
}
