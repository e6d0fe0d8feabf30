//! Execution registries: which execution a poll targets

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fp_core::ExecutionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Caller/session token selecting a registry slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub const DEFAULT: &'static str = "default";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latest execution recorded for a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub execution_id: ExecutionId,
    pub recorded_at: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn new(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            recorded_at: Utc::now(),
        }
    }
}

/// Remembers which execution a poll should target
///
/// `record` replaces whatever the slot held; the last writer wins.
#[async_trait]
pub trait ExecutionRegistry: Send + Sync {
    async fn record(&self, session: &SessionKey, execution_id: ExecutionId);

    /// The stored identifier, or None if nothing was ever recorded
    async fn current(&self, session: &SessionKey) -> Option<ExecutionId>;
}

/// Single slot shared by every caller. The session key is ignored.
#[derive(Default)]
pub struct LatestExecution {
    slot: RwLock<Option<RegistryEntry>>,
}

impl LatestExecution {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry(&self) -> Option<RegistryEntry> {
        self.slot.read().await.clone()
    }
}

#[async_trait]
impl ExecutionRegistry for LatestExecution {
    #[instrument(skip(self, _session), fields(execution_id = %execution_id))]
    async fn record(&self, _session: &SessionKey, execution_id: ExecutionId) {
        let previous = self.slot.write().await.replace(RegistryEntry::new(execution_id));
        if let Some(previous) = previous {
            debug!(previous = %previous.execution_id, "Replaced latest execution");
        }
        info!("Recorded latest execution");
    }

    async fn current(&self, _session: &SessionKey) -> Option<ExecutionId> {
        self.slot
            .read()
            .await
            .as_ref()
            .map(|entry| entry.execution_id.clone())
    }
}

/// Sessions kept by [`SessionRegistry::new`]
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// One latest-execution slot per session
///
/// Holds at most `max_sessions` slots. Recording a new session when full
/// evicts the session recorded longest ago.
pub struct SessionRegistry {
    slots: RwLock<SessionSlots>,
    max_sessions: usize,
}

#[derive(Default)]
struct SessionSlots {
    entries: HashMap<SessionKey, (u64, RegistryEntry)>,
    next_seq: u64,
}

impl SessionSlots {
    fn evict_oldest(&mut self) -> Option<SessionKey> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, (seq, _))| *seq)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            slots: RwLock::new(SessionSlots::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub async fn entry(&self, session: &SessionKey) -> Option<RegistryEntry> {
        self.slots
            .read()
            .await
            .entries
            .get(session)
            .map(|(_, entry)| entry.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.slots.read().await.entries.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionRegistry for SessionRegistry {
    #[instrument(skip(self), fields(session = %session, execution_id = %execution_id))]
    async fn record(&self, session: &SessionKey, execution_id: ExecutionId) {
        let mut slots = self.slots.write().await;

        if !slots.entries.contains_key(session) && slots.entries.len() >= self.max_sessions {
            if let Some(evicted) = slots.evict_oldest() {
                debug!(evicted = %evicted, "Evicted oldest session");
            }
        }

        let seq = slots.next_seq;
        slots.next_seq += 1;
        let previous = slots
            .entries
            .insert(session.clone(), (seq, RegistryEntry::new(execution_id)));
        if let Some((_, previous)) = previous {
            debug!(previous = %previous.execution_id, "Replaced session execution");
        }
        info!("Recorded session execution");
    }

    async fn current(&self, session: &SessionKey) -> Option<ExecutionId> {
        self.slots
            .read()
            .await
            .entries
            .get(session)
            .map(|(_, entry)| entry.execution_id.clone())
    }
}
