//! flowpoll service
//!
//! HTTP trigger for one workflow definition:
//! - `POST /` starts an execution
//! - `GET /` reports the progress of the caller's latest execution
//! - `GET /health`, `GET /metrics` for operators

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fp_core::{config::load_environment, EngineConfig, WorkflowEngine};
use fp_engine::{MemoryEngine, StepFunctionsClient};
use fp_http::{axum::Router, HttpServer, RouterBuilder};
use fp_tracker::{
    registry::DEFAULT_MAX_SESSIONS, ExecutionMetrics, ExecutionRegistry, LatestExecution,
    SessionRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod error;
mod ops;
mod state;
mod trigger;

use state::AppState;

/// Definition started by the in-memory engine when none is configured
const LOCAL_STATE_MACHINE: &str = "arn:aws:states:local:000000000000:stateMachine:flowpoll";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// Step Functions JSON protocol over HTTP
    Http,
    /// In-process engine, for local runs
    Memory,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum RegistryKind {
    /// One latest execution shared by every caller
    Latest,
    /// One latest execution per X-Session-Id
    Session,
}

#[derive(Parser, Debug)]
#[command(name = "flowpoll-service")]
#[command(about = "Start a workflow execution over HTTP and poll its progress")]
struct Args {
    /// Bind address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Workflow engine backend
    #[arg(long, value_enum, default_value_t = EngineKind::Http)]
    engine: EngineKind,

    /// Which execution a poll targets
    #[arg(long, value_enum, default_value_t = RegistryKind::Latest)]
    registry: RegistryKind,

    /// State machine to start (overrides FLOWPOLL_STATE_MACHINE_ARN)
    #[arg(long)]
    state_machine_arn: Option<String>,

    /// Engine endpoint (overrides FLOWPOLL_ENGINE_ENDPOINT)
    #[arg(long)]
    engine_endpoint: Option<String>,

    /// Per-call engine timeout in seconds (overrides FLOWPOLL_ENGINE_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Sessions kept by the session registry before the oldest is evicted
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,

    /// Disable compression
    #[arg(long)]
    no_compression: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(endpoint) = &self.engine_endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(arn) = &self.state_machine_arn {
            config = config.with_state_machine_arn(arn.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs.max(1)));
        }
        config
    }
}

fn build_engine(kind: EngineKind, config: &EngineConfig) -> Result<(Arc<dyn WorkflowEngine>, String)> {
    match kind {
        EngineKind::Http => {
            let arn = config.require_state_machine_arn()?.to_string();
            let client = StepFunctionsClient::new(config.clone())?;
            info!(endpoint = %config.endpoint, state_machine = %arn, "Using Step Functions engine");
            Ok((Arc::new(client), arn))
        }
        EngineKind::Memory => {
            let arn = config
                .state_machine_arn
                .clone()
                .unwrap_or_else(|| LOCAL_STATE_MACHINE.to_string());
            info!(state_machine = %arn, "Using in-memory engine");
            Ok((Arc::new(MemoryEngine::new()), arn))
        }
    }
}

fn build_registry(kind: RegistryKind, max_sessions: usize) -> Arc<dyn ExecutionRegistry> {
    match kind {
        RegistryKind::Latest => Arc::new(LatestExecution::new()),
        RegistryKind::Session => Arc::new(SessionRegistry::with_capacity(max_sessions)),
    }
}

/// Overall request deadline. A poll makes at least two engine calls, more
/// when history is paged.
fn request_timeout(engine_timeout: Duration) -> Duration {
    engine_timeout
        .checked_mul(3)
        .unwrap_or(Duration::MAX)
        .max(Duration::from_secs(30))
}

fn build_router(state: AppState) -> Router {
    RouterBuilder::new()
        .merge("trigger", trigger::create_router(state.clone()))
        .merge("ops", ops::create_router(state))
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loaded first so an env file can carry RUST_LOG
    let env_file = load_environment();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flowpoll_service=info".parse()?)
                .add_directive("fp_http=info".parse()?)
                .add_directive("fp_tracker=info".parse()?)
                .add_directive("fp_engine=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    match env_file {
        Some(path) => info!(path = %path, "Loaded environment file"),
        None => info!("No environment file found, using process environment"),
    }

    let args = Args::parse();
    let engine_config = args.engine_config();

    let (engine, state_machine_arn) = build_engine(args.engine, &engine_config)
        .context("Failed to initialize workflow engine")?;
    let registry = build_registry(args.registry, args.max_sessions);
    let metrics = Arc::new(ExecutionMetrics::new().context("Failed to register metrics")?);
    info!(registry = ?args.registry, max_sessions = args.max_sessions, "Initialized execution registry");

    let state = AppState::new(engine, registry, metrics, state_machine_arn);


    let server = HttpServer::builder()
        .bind(args.bind.clone())
        .router(build_router(state))
        .cors(!args.no_cors)
        .compression(!args.no_compression)
        .timeout(request_timeout(engine_config.timeout))
        .build()?;

    info!("Starting flowpoll service...");
    server.serve().await?;

    Ok(())
}
