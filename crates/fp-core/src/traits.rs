//! Workflow engine contract consumed by flowpoll

use crate::{Error, ExecutionDescription, ExecutionId, HistoryEvent, HistoryPage, Result, StartedExecution};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

/// Upper bound on history pages fetched for one projection. Step Functions
/// caps a history at 25,000 events, so a well-behaved engine never needs more.
pub const MAX_HISTORY_PAGES: usize = 25_000;

/// External orchestration service that owns execution semantics
///
/// flowpoll only starts executions and reads back what the engine recorded.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &'static str;

    /// Start `definition` with the given JSON input text
    async fn start_execution(&self, definition: &str, input: &str) -> Result<StartedExecution>;

    /// Fetch one page of history. `next_token` is None for the first page.
    async fn get_execution_history_page(
        &self,
        execution_id: &ExecutionId,
        next_token: Option<&str>,
    ) -> Result<HistoryPage>;

    /// Status and output snapshot
    async fn describe_execution(&self, execution_id: &ExecutionId) -> Result<ExecutionDescription>;

    /// Full history in event order, with all pages concatenated
    ///
    /// Fails if the engine hands back a token it already issued or keeps
    /// paging past [`MAX_HISTORY_PAGES`].
    async fn get_execution_history(&self, execution_id: &ExecutionId) -> Result<Vec<HistoryEvent>> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages == MAX_HISTORY_PAGES {
                return Err(Error::engine_unavailable(format!(
                    "history for {} exceeded {} pages",
                    execution_id, MAX_HISTORY_PAGES
                )));
            }
            let page = self
                .get_execution_history_page(execution_id, next_token.as_deref())
                .await?;
            pages += 1;
            events.extend(page.events);

            match page.next_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(Error::engine_unavailable(format!(
                        "history pagination for {} repeated token {}",
                        execution_id, token
                    )));
                }
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(
            execution_id = %execution_id,
            pages,
            events = events.len(),
            "Fetched execution history"
        );
        Ok(events)
    }
}
