//! Common types shared by the engine client, the registry and the projector
//!
//! Field names follow the Step Functions JSON wire format so the same
//! structs decode engine responses directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque execution identifier issued by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExecutionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ExecutionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// History event type, as named by the engine
///
/// Only the execution-level kinds are distinguished. Everything else,
/// including the various `*StateEntered` kinds, is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    ExecutionStarted,
    ExecutionSucceeded,
    ExecutionFailed,
    ExecutionAborted,
    ExecutionTimedOut,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::ExecutionStarted => "ExecutionStarted",
            EventKind::ExecutionSucceeded => "ExecutionSucceeded",
            EventKind::ExecutionFailed => "ExecutionFailed",
            EventKind::ExecutionAborted => "ExecutionAborted",
            EventKind::ExecutionTimedOut => "ExecutionTimedOut",
            EventKind::Other(kind) => kind,
        }
    }
}

impl From<String> for EventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "ExecutionStarted" => EventKind::ExecutionStarted,
            "ExecutionSucceeded" => EventKind::ExecutionSucceeded,
            "ExecutionFailed" => EventKind::ExecutionFailed,
            "ExecutionAborted" => EventKind::ExecutionAborted,
            "ExecutionTimedOut" => EventKind::ExecutionTimedOut,
            _ => EventKind::Other(kind),
        }
    }
}

impl From<&str> for EventKind {
    fn from(kind: &str) -> Self {
        EventKind::from(kind.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEnteredEventDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailedEventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSucceededEventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStartedEventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, rename = "roleArn", skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

/// One entry of an execution's append-only event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    #[serde(default)]
    pub id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_event_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "epoch_seconds")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(rename = "type")]
    pub kind: EventKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_started_event_details: Option<ExecutionStartedEventDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_entered_event_details: Option<StateEnteredEventDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_succeeded_event_details: Option<ExecutionSucceededEventDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_failed_event_details: Option<ExecutionFailedEventDetails>,
}

impl HistoryEvent {
    /// Bare event of the given kind with no details attached
    pub fn new(kind: impl Into<EventKind>) -> Self {
        Self {
            id: 0,
            previous_event_id: None,
            timestamp: None,
            kind: kind.into(),
            execution_started_event_details: None,
            state_entered_event_details: None,
            execution_succeeded_event_details: None,
            execution_failed_event_details: None,
        }
    }

    pub fn execution_started(input: Option<String>) -> Self {
        let mut event = Self::new(EventKind::ExecutionStarted);
        event.execution_started_event_details = Some(ExecutionStartedEventDetails {
            input,
            role_arn: None,
        });
        event
    }

    /// State entry, recorded under the engine's `<Type>StateEntered` kind
    pub fn state_entered(state_type: &str, name: impl Into<String>) -> Self {
        let mut event = Self::new(format!("{}StateEntered", state_type));
        event.state_entered_event_details = Some(StateEnteredEventDetails {
            name: name.into(),
            input: None,
        });
        event
    }

    pub fn execution_succeeded(output: Option<String>) -> Self {
        let mut event = Self::new(EventKind::ExecutionSucceeded);
        event.execution_succeeded_event_details = Some(ExecutionSucceededEventDetails { output });
        event
    }

    pub fn execution_failed(error: Option<String>, cause: Option<String>) -> Self {
        let mut event = Self::new(EventKind::ExecutionFailed);
        event.execution_failed_event_details = Some(ExecutionFailedEventDetails { error, cause });
        event
    }

    /// Name of the state this event entered, if it is a state entry
    pub fn entered_state(&self) -> Option<&str> {
        self.state_entered_event_details
            .as_ref()
            .map(|details| details.name.as_str())
    }

    /// Cause attached to an execution failure event
    pub fn failure_cause(&self) -> Option<&str> {
        self.execution_failed_event_details
            .as_ref()
            .and_then(|details| details.cause.as_deref())
    }
}

/// One page of `GetExecutionHistory` output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// Execution status reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
    PendingRedrive,
    Other(String),
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::TimedOut => "TIMED_OUT",
            ExecutionStatus::Aborted => "ABORTED",
            ExecutionStatus::PendingRedrive => "PENDING_REDRIVE",
            ExecutionStatus::Other(status) => status,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running | ExecutionStatus::PendingRedrive)
    }
}

impl From<String> for ExecutionStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "RUNNING" => ExecutionStatus::Running,
            "SUCCEEDED" => ExecutionStatus::Succeeded,
            "FAILED" => ExecutionStatus::Failed,
            "TIMED_OUT" => ExecutionStatus::TimedOut,
            "ABORTED" => ExecutionStatus::Aborted,
            "PENDING_REDRIVE" => ExecutionStatus::PendingRedrive,
            _ => ExecutionStatus::Other(status),
        }
    }
}

impl From<ExecutionStatus> for String {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `DescribeExecution` output: status snapshot plus result payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDescription {
    pub execution_arn: ExecutionId,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "epoch_seconds")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "epoch_seconds")]
    pub stop_date: Option<DateTime<Utc>>,
}

/// `StartExecution` output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedExecution {
    pub execution_arn: ExecutionId,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "epoch_seconds")]
    pub start_date: Option<DateTime<Utc>>,
}

/// Timestamps travel as fractional epoch seconds on the wire
mod epoch_seconds {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_f64(ts.timestamp_millis() as f64 / 1000.0),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.and_then(|secs| {
            Utc.timestamp_millis_opt((secs * 1000.0).round() as i64)
                .single()
        }))
    }
}
