//! Mesh events - fan-out to any number of subscribers via tokio broadcast

use agentmesh_core::{AgentId, TaskDescriptor, TaskOutcome};
use agentmesh_topology::ConsciousnessLevel;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MeshEvent {
    AgentRegistered {
        agent_id: AgentId,
        level: ConsciousnessLevel,
    },
    AgentDeregistered {
        agent_id: AgentId,
    },
    TaskStarted {
        agent_id: AgentId,
        task_type: String,
    },
    TaskCompleted {
        agent_id: AgentId,
        task: TaskDescriptor,
        outcome: TaskOutcome,
        latency_ms: f64,
    },
    TaskFailed {
        agent_id: AgentId,
        task_type: String,
        error: String,
        latency_ms: f64,
    },
    AgentEvolved {
        agent_id: AgentId,
        level: ConsciousnessLevel,
    },
    WorkflowCompleted {
        workflow_id: String,
        success: bool,
        agents: usize,
        duration_ms: f64,
    },
    PatternsLearned {
        knowledge_ids: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MeshEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: MeshEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MeshEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
