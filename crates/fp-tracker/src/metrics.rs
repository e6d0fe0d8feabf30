use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Execution metrics collector
#[derive(Clone)]
pub struct ExecutionMetrics {
    /// Executions started through the trigger
    executions_started: IntCounter,

    /// Polls answered with a summary
    polls_served: IntCounter,

    /// Polls rejected because nothing was recorded
    polls_without_execution: IntCounter,

    /// Engine failures by error kind
    engine_errors: IntCounterVec,

    /// Time spent building a summary
    projection_duration: Histogram,

    registry: Registry,
}

impl ExecutionMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let executions_started = IntCounter::new(
            "flowpoll_executions_started_total",
            "Total number of executions started",
        )?;
        registry.register(Box::new(executions_started.clone()))?;

        let polls_served = IntCounter::new(
            "flowpoll_polls_served_total",
            "Total number of progress polls answered",
        )?;
        registry.register(Box::new(polls_served.clone()))?;

        let polls_without_execution = IntCounter::new(
            "flowpoll_polls_without_execution_total",
            "Total number of polls made before any execution was started",
        )?;
        registry.register(Box::new(polls_without_execution.clone()))?;

        let engine_errors = IntCounterVec::new(
            Opts::new("flowpoll_engine_errors_total", "Engine calls that failed"),
            &["kind"],
        )?;
        registry.register(Box::new(engine_errors.clone()))?;

        let projection_duration = Histogram::with_opts(
            HistogramOpts::new(
                "flowpoll_projection_duration_seconds",
                "Time to fetch history and status and build a summary",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(projection_duration.clone()))?;

        Ok(Self {
            executions_started,
            polls_served,
            polls_without_execution,
            engine_errors,
            projection_duration,
            registry,
        })
    }

    pub fn execution_started(&self) {
        self.executions_started.inc();
    }

    pub fn poll_served(&self, duration_ms: u64) {
        self.polls_served.inc();
        self.projection_duration.observe(duration_ms as f64 / 1000.0);
    }

    pub fn poll_without_execution(&self) {
        self.polls_without_execution.inc();
    }

    /// `kind` comes from `fp_core::Error::kind`, which keeps cardinality fixed
    pub fn engine_error(&self, kind: &str) {
        self.engine_errors.with_label_values(&[kind]).inc();
    }

    pub fn executions_started_total(&self) -> u64 {
        self.executions_started.get()
    }

    pub fn polls_served_total(&self) -> u64 {
        self.polls_served.get()
    }

    pub fn engine_errors_total(&self, kind: &str) -> u64 {
        self.engine_errors.with_label_values(&[kind]).get()
    }

    /// Prometheus text exposition of every metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
