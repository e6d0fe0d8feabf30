//! In-memory workflow engine
//!
//! Keeps executions in a map and serves their history in fixed-size pages.
//! Nothing runs on its own: callers drive an execution forward with
//! `enter_state`, `succeed` and `fail`.

use async_trait::async_trait;
use chrono::Utc;
use fp_core::{
    Error, ExecutionDescription, ExecutionId, ExecutionStatus, HistoryEvent, HistoryPage, Result,
    StartedExecution, WorkflowEngine,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct MemoryExecution {
    input: String,
    status: ExecutionStatus,
    output: Option<String>,
    events: Vec<HistoryEvent>,
    description: ExecutionDescription,
}

/// Engine that lives entirely in process memory
pub struct MemoryEngine {
    executions: RwLock<HashMap<ExecutionId, MemoryExecution>>,
    page_size: usize,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// History pages will hold at most `page_size` events
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            executions: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Input JSON the execution was started with
    pub async fn input(&self, execution_id: &ExecutionId) -> Result<String> {
        let executions = self.executions.read().await;
        executions
            .get(execution_id)
            .map(|execution| execution.input.clone())
            .ok_or_else(|| Error::unknown_execution(execution_id.as_str()))
    }

    /// Number of executions started so far
    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }

    /// Append a raw event. Ids are assigned in insertion order.
    pub async fn append_event(&self, execution_id: &ExecutionId, mut event: HistoryEvent) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(execution_id)
            .ok_or_else(|| Error::unknown_execution(execution_id.as_str()))?;

        let id = execution.events.len() as i64 + 1;
        event.id = id;
        event.previous_event_id = Some(id - 1);
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }
        execution.events.push(event);
        Ok(())
    }

    /// Record entry into a task state named `name`
    pub async fn enter_state(&self, execution_id: &ExecutionId, name: &str) -> Result<()> {
        self.append_event(execution_id, HistoryEvent::state_entered("Task", name))
            .await
    }

    /// Finish the execution successfully with `output`
    pub async fn succeed(&self, execution_id: &ExecutionId, output: &str) -> Result<()> {
        self.append_event(
            execution_id,
            HistoryEvent::execution_succeeded(Some(output.to_string())),
        )
        .await?;
        self.finish(execution_id, ExecutionStatus::Succeeded, Some(output.to_string()))
            .await
    }

    /// Finish the execution with a failure
    pub async fn fail(&self, execution_id: &ExecutionId, error: &str, cause: &str) -> Result<()> {
        self.append_event(
            execution_id,
            HistoryEvent::execution_failed(Some(error.to_string()), Some(cause.to_string())),
        )
        .await?;

        let mut executions = self.executions.write().await;
        if let Some(execution) = executions.get_mut(execution_id) {
            execution.description.error = Some(error.to_string());
            execution.description.cause = Some(cause.to_string());
        }
        drop(executions);

        self.finish(execution_id, ExecutionStatus::Failed, None).await
    }

    /// Overwrite the reported status without touching history
    pub async fn set_status(&self, execution_id: &ExecutionId, status: ExecutionStatus) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(execution_id)
            .ok_or_else(|| Error::unknown_execution(execution_id.as_str()))?;
        execution.status = status;
        Ok(())
    }

    async fn finish(
        &self,
        execution_id: &ExecutionId,
        status: ExecutionStatus,
        output: Option<String>,
    ) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(execution_id)
            .ok_or_else(|| Error::unknown_execution(execution_id.as_str()))?;
        execution.status = status;
        execution.output = output;
        execution.description.stop_date = Some(Utc::now());
        Ok(())
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// `...:stateMachine:Name` -> `Name`
fn definition_name(definition: &str) -> &str {
    definition.rsplit(':').next().unwrap_or(definition)
}

#[async_trait]
impl WorkflowEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn start_execution(&self, definition: &str, input: &str) -> Result<StartedExecution> {
        serde_json::from_str::<serde_json::Value>(input)
            .map_err(|e| Error::engine_api(400, "InvalidExecutionInput", e.to_string()))?;

        let execution_id = ExecutionId::new(format!(
            "arn:aws:states:local:000000000000:execution:{}:{}",
            definition_name(definition),
            Uuid::new_v4()
        ));
        let started_at = Utc::now();

        let mut started = HistoryEvent::execution_started(Some(input.to_string()));
        started.id = 1;
        started.previous_event_id = Some(0);
        started.timestamp = Some(started_at);

        let execution = MemoryExecution {
            input: input.to_string(),
            status: ExecutionStatus::Running,
            output: None,
            events: vec![started],
            description: ExecutionDescription {
                execution_arn: execution_id.clone(),
                status: ExecutionStatus::Running,
                output: None,
                error: None,
                cause: None,
                start_date: Some(started_at),
                stop_date: None,
            },
        };

        self.executions
            .write()
            .await
            .insert(execution_id.clone(), execution);

        info!(execution_id = %execution_id, "Started in-memory execution");
        Ok(StartedExecution {
            execution_arn: execution_id,
            start_date: Some(started_at),
        })
    }

    async fn get_execution_history_page(
        &self,
        execution_id: &ExecutionId,
        next_token: Option<&str>,
    ) -> Result<HistoryPage> {
        let executions = self.executions.read().await;
        let execution = executions
            .get(execution_id)
            .ok_or_else(|| Error::unknown_execution(execution_id.as_str()))?;

        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .ok()
                .filter(|offset| *offset <= execution.events.len())
                .ok_or_else(|| Error::engine_api(400, "InvalidToken", format!("bad token {}", token)))?,
            None => 0,
        };

        let end = (offset + self.page_size).min(execution.events.len());
        let next_token = (end < execution.events.len()).then(|| end.to_string());
        debug!(execution_id = %execution_id, offset, end, "Serving history page");

        Ok(HistoryPage {
            events: execution.events[offset..end].to_vec(),
            next_token,
        })
    }

    async fn describe_execution(&self, execution_id: &ExecutionId) -> Result<ExecutionDescription> {
        let executions = self.executions.read().await;
        let execution = executions
            .get(execution_id)
            .ok_or_else(|| Error::unknown_execution(execution_id.as_str()))?;

        let mut description = execution.description.clone();
        description.status = execution.status.clone();
        description.output = execution.output.clone();
        Ok(description)
    }
}
