//! Core types shared across the mesh

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::Arc;

/// Agent identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct AgentId(Arc<str>);

impl AgentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for AgentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AgentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Registration input handed over by the agent-definition loader.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_agent_type")]
    pub agent_type: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Free-text coordination role, e.g. "Lead coordinator of specialist mini-agents".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Personality trait scores in [0, 1] keyed by trait name.
    #[serde(default)]
    pub traits: HashMap<String, f64>,
}

fn default_agent_type() -> String {
    "agent".to_string()
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent_type: default_agent_type(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = agent_type.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_trait(mut self, name: impl Into<String>, score: f64) -> Self {
        self.traits.insert(name.into(), score);
        self
    }
}

/// Opaque task handed to an agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskDescriptor {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TaskDescriptor {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// What a task body reports back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl TaskOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            tokens_used: None,
            quality_score: None,
        }
    }

    pub fn unsuccessful(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            tokens_used: None,
            quality_score: None,
        }
    }
}
