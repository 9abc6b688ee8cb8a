//! Error types for agentmesh

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("agent already registered: {0}")]
    AgentAlreadyRegistered(String),

    #[error("superposition requires at least one state")]
    EmptyStateSet,

    #[error("task failed: {agent} - {message}")]
    TaskFailed { agent: String, message: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn task_failed(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            agent: agent.into(),
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Short type name, used as the `errorType` of error observations.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_) => "AgentNotFound",
            Self::AgentAlreadyRegistered(_) => "AgentAlreadyRegistered",
            Self::EmptyStateSet => "EmptyStateSet",
            Self::TaskFailed { .. } => "TaskFailed",
            Self::InvariantViolation(_) => "InvariantViolation",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Toml(_) => "Toml",
            Self::Internal(_) => "Internal",
        }
    }
}
