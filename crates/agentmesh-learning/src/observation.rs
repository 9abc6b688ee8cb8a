//! Typed observation events
//!
//! Every payload field is optional; detectors skip whatever is missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    UserMessage,
    AgentAction,
    CodeChange,
    WorkflowExecution,
    Error,
}

impl ObservationKind {
    pub const ALL: [ObservationKind; 5] = [
        ObservationKind::UserMessage,
        ObservationKind::AgentAction,
        ObservationKind::CodeChange,
        ObservationKind::WorkflowExecution,
        ObservationKind::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserMessage => "user_message",
            Self::AgentAction => "agent_action",
            Self::CodeChange => "code_change",
            Self::WorkflowExecution => "workflow_execution",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown observation type: {}", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMessage {
    pub user_id: Option<String>,
    pub message: Option<String>,
    pub language: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentAction {
    pub agent_id: Option<String>,
    pub action: Option<String>,
    pub success: Option<bool>,
    pub latency_ms: Option<f64>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeChange {
    pub file: Option<String>,
    pub change_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowStep {
    pub name: String,
    pub agent_id: Option<String>,
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowExecution {
    pub workflow_id: Option<String>,
    pub duration_ms: Option<f64>,
    pub success: Option<bool>,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorEvent {
    pub error_type: Option<String>,
    pub message: Option<String>,
    pub stack: Option<String>,
    pub solution: Option<String>,
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Observation {
    UserMessage(UserMessage),
    AgentAction(AgentAction),
    CodeChange(CodeChange),
    WorkflowExecution(WorkflowExecution),
    Error(ErrorEvent),
}

impl Observation {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Self::UserMessage(_) => ObservationKind::UserMessage,
            Self::AgentAction(_) => ObservationKind::AgentAction,
            Self::CodeChange(_) => ObservationKind::CodeChange,
            Self::WorkflowExecution(_) => ObservationKind::WorkflowExecution,
            Self::Error(_) => ObservationKind::Error,
        }
    }

    pub fn user_message(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UserMessage(UserMessage {
            user_id: Some(user_id.into()),
            message: Some(message.into()),
            ..Default::default()
        })
    }

    pub fn agent_action(agent_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self::AgentAction(AgentAction {
            agent_id: Some(agent_id.into()),
            action: Some(action.into()),
            ..Default::default()
        })
    }

    pub fn code_change(file: impl Into<String>, change_type: impl Into<String>) -> Self {
        Self::CodeChange(CodeChange {
            file: Some(file.into()),
            change_type: Some(change_type.into()),
        })
    }

    pub fn error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            error_type: Some(error_type.into()),
            message: Some(message.into()),
            ..Default::default()
        })
    }
}

/// An observation as held in short-term memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub id: u64,
    pub observation: Observation,
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
}

/// Entry in the episodic log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    pub data: Observation,
}
