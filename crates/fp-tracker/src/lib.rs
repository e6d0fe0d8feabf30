//! FP Execution Tracker - progress projection for externally owned executions
//!
//! Provides:
//! - A registry remembering which execution each caller polls
//! - A projector turning engine history into a progress summary
//! - Metrics and tracing around both

pub mod metrics;
pub mod projector;
pub mod registry;
pub mod summary;
pub mod telemetry;

pub use metrics::ExecutionMetrics;
pub use projector::{failure_cause, passed_states, ExecutionProjector};
pub use registry::{ExecutionRegistry, LatestExecution, RegistryEntry, SessionKey, SessionRegistry};
pub use summary::ProgressSummary;
pub use telemetry::ExecutionTelemetry;
