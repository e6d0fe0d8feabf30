//! Shared application state handed to every route

use fp_core::WorkflowEngine;
use fp_tracker::{ExecutionMetrics, ExecutionProjector, ExecutionRegistry, ExecutionTelemetry};
use std::sync::Arc;

pub const SERVICE_NAME: &str = "flowpoll-service";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn WorkflowEngine>,
    pub registry: Arc<dyn ExecutionRegistry>,
    pub projector: ExecutionProjector,
    pub metrics: Arc<ExecutionMetrics>,
    pub telemetry: Arc<ExecutionTelemetry>,
    /// Workflow definition started by POST
    pub state_machine_arn: Arc<str>,
}

impl AppState {
    pub fn new(
        engine: Arc<dyn WorkflowEngine>,
        registry: Arc<dyn ExecutionRegistry>,
        metrics: Arc<ExecutionMetrics>,
        state_machine_arn: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            projector: ExecutionProjector::new(engine.clone()),
            engine,
            registry,
            metrics,
            telemetry: Arc::new(ExecutionTelemetry::new(SERVICE_NAME)),
            state_machine_arn: state_machine_arn.into(),
        }
    }
}
