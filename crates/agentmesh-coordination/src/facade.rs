//! Coordination facade - runs tasks against the topology and feeds memory

use crate::events::{EventBus, MeshEvent};
use crate::metrics::{ExecutionMetrics, SystemMetrics, TopologySummary};
use crate::recommendations::{recommend, Recommendation};
use crate::task::{TaskBody, TaskContext};
use crate::views::{HealthReport, Visualization};
use agentmesh_core::config::CoordinationConfig;
use agentmesh_core::{
    AgentDescriptor, AgentId, Error, MeshConfig, Result, TaskDescriptor, TaskOutcome,
};
use agentmesh_learning::{
    AgentAction, ErrorEvent, MemoryStore, Observation, ObservationKind, WorkflowExecution,
    WorkflowStep,
};
use agentmesh_topology::quantum::parse_states;
use agentmesh_topology::{
    AgentNode, BehaviorState, MetricsUpdate, RelationType, TopologyGraph, TopologySnapshot,
};
use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One agent's share of a multi-agent run.
#[derive(Clone)]
pub struct Assignment {
    pub agent_id: AgentId,
    pub task: TaskDescriptor,
    pub body: Arc<dyn TaskBody>,
}

impl Assignment {
    pub fn new(agent_id: impl Into<AgentId>, task: TaskDescriptor, body: Arc<dyn TaskBody>) -> Self {
        Self {
            agent_id: agent_id.into(),
            task,
            body,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub success: bool,
    /// Every agent's output, in assignment order.
    pub output: String,
    pub results: Vec<TaskOutcome>,
    pub agents_involved: usize,
    pub duration_ms: f64,
}

/// Restores a superposition if a task is abandoned mid-flight.
struct RestoreOnDrop<'a> {
    topology: &'a TopologyGraph,
    agent_id: &'a str,
    states: &'a [BehaviorState],
    armed: bool,
}

impl RestoreOnDrop<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RestoreOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.topology.restore_superposition(self.agent_id, self.states);
            warn!(agent = self.agent_id, "Task abandoned, superposition restored");
        }
    }
}

pub struct CoordinationFacade {
    topology: Arc<TopologyGraph>,
    memory: Arc<MemoryStore>,
    events: EventBus,
    metrics: Mutex<ExecutionMetrics>,
    config: CoordinationConfig,
    confidence_threshold: f64,
    latency_alpha: f64,
    success_states: Vec<BehaviorState>,
    failure_states: Vec<BehaviorState>,
}

impl CoordinationFacade {
    pub fn new(config: &MeshConfig) -> Result<Self> {
        Self::with_parts(
            Arc::new(TopologyGraph::new(config)),
            Arc::new(MemoryStore::new(config)),
            config,
        )
    }

    /// Build around an existing topology and memory store.
    pub fn with_parts(
        topology: Arc<TopologyGraph>,
        memory: Arc<MemoryStore>,
        config: &MeshConfig,
    ) -> Result<Self> {
        let success_states = parse_states(&config.coordination.success_states);
        let failure_states = parse_states(&config.coordination.failure_states);
        if success_states.is_empty() || failure_states.is_empty() {
            return Err(Error::EmptyStateSet);
        }
        Ok(Self {
            topology,
            memory,
            events: EventBus::new(config.coordination.event_buffer),
            metrics: Mutex::new(ExecutionMetrics::default()),
            config: config.coordination.clone(),
            confidence_threshold: config.learning.confidence_threshold,
            latency_alpha: config.evolution.metrics_ema_alpha,
            success_states,
            failure_states,
        })
    }

    pub fn topology(&self) -> &Arc<TopologyGraph> {
        &self.topology
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MeshEvent> {
        self.events.subscribe()
    }

    pub fn execution_metrics(&self) -> ExecutionMetrics {
        self.metrics.lock().clone()
    }

    // ------------------------------------------------------------------
    // Agents
    // ------------------------------------------------------------------

    pub fn register_agent(&self, descriptor: &AgentDescriptor) -> Result<AgentNode> {
        let node = self.topology.register_agent(descriptor)?;
        self.events.publish(MeshEvent::AgentRegistered {
            agent_id: node.id.clone(),
            level: node.consciousness.current,
        });
        Ok(node)
    }

    pub fn deregister_agent(&self, agent_id: &str) -> Option<AgentNode> {
        let node = self.topology.deregister_agent(agent_id)?;
        self.events.publish(MeshEvent::AgentDeregistered {
            agent_id: node.id.clone(),
        });
        Some(node)
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Run one task on one agent.
    ///
    /// The agent is collapsed to `acting` for the duration of the body and
    /// put back into superposition afterwards: the success states when the
    /// body returns an outcome, the failure states when it errors or the
    /// returned future is dropped before finishing.
    pub async fn run_task(
        &self,
        agent_id: &str,
        task: &TaskDescriptor,
        body: &dyn TaskBody,
    ) -> Result<TaskOutcome> {
        self.execute(agent_id, task, body).await.0
    }

    async fn execute(
        &self,
        agent_id: &str,
        task: &TaskDescriptor,
        body: &dyn TaskBody,
    ) -> (Result<TaskOutcome>, f64) {
        if !self.topology.contains(agent_id) {
            return (Err(Error::AgentNotFound(agent_id.to_string())), 0.0);
        }
        let agent = AgentId::new(agent_id);

        self.memory.observe(Observation::AgentAction(AgentAction {
            agent_id: Some(agent_id.to_string()),
            action: Some(task.task_type.clone()),
            ..Default::default()
        }));

        self.topology.collapse(agent_id, BehaviorState::Acting);
        let mut guard = RestoreOnDrop {
            topology: &self.topology,
            agent_id,
            states: &self.failure_states,
            armed: true,
        };
        self.events.publish(MeshEvent::TaskStarted {
            agent_id: agent.clone(),
            task_type: task.task_type.clone(),
        });
        debug!(agent = agent_id, task = %task.task_type, "Task started");

        let ctx = self.task_context(&agent, task);
        let started = Instant::now();
        let result = body.run(ctx).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        guard.disarm();

        match result {
            Ok(outcome) => {
                self.complete(&agent, task, &outcome, latency_ms);
                (Ok(outcome), latency_ms)
            }
            Err(err) => {
                self.fail(&agent, task, &err, latency_ms);
                (Err(err), latency_ms)
            }
        }
    }

    fn task_context(&self, agent: &AgentId, task: &TaskDescriptor) -> TaskContext {
        let kind = task
            .task_type
            .parse::<ObservationKind>()
            .unwrap_or(ObservationKind::AgentAction);
        TaskContext {
            agent_id: agent.clone(),
            task: task.clone(),
            position: self.topology.agent_position(agent.as_str()),
            insights: self.memory.get_insights(),
            knowledge: self.memory.get_knowledge(Some(kind)),
        }
    }

    fn complete(&self, agent: &AgentId, task: &TaskDescriptor, outcome: &TaskOutcome, latency_ms: f64) {
        let learned = if self.config.auto_learn {
            self.auto_learn()
        } else {
            0
        };
        let evolved = self.topology.update_metrics(
            agent.as_str(),
            &MetricsUpdate::completed(outcome.success, latency_ms).learned(learned > 0),
        );

        self.memory.observe(Observation::AgentAction(AgentAction {
            agent_id: Some(agent.to_string()),
            action: Some(task.task_type.clone()),
            success: Some(outcome.success),
            latency_ms: Some(latency_ms),
            output: Some(outcome.output.clone()),
        }));
        self.topology
            .restore_superposition(agent.as_str(), &self.success_states);

        self.metrics
            .lock()
            .record_completed(outcome.success, latency_ms, self.latency_alpha);
        if evolved {
            self.announce_evolution(agent);
        }
        self.events.publish(MeshEvent::TaskCompleted {
            agent_id: agent.clone(),
            task: task.clone(),
            outcome: outcome.clone(),
            latency_ms,
        });
        info!(
            agent = %agent,
            task = %task.task_type,
            success = outcome.success,
            latency_ms,
            "Task complete"
        );
    }

    fn fail(&self, agent: &AgentId, task: &TaskDescriptor, err: &Error, latency_ms: f64) {
        self.memory.observe(Observation::Error(ErrorEvent {
            error_type: Some(err.kind().to_string()),
            message: Some(err.to_string()),
            agent_id: Some(agent.to_string()),
            ..Default::default()
        }));
        let evolved = self
            .topology
            .update_metrics(agent.as_str(), &MetricsUpdate::failed());
        self.topology
            .restore_superposition(agent.as_str(), &self.failure_states);

        self.metrics.lock().record_failed(latency_ms, self.latency_alpha);
        if evolved {
            self.announce_evolution(agent);
        }
        self.events.publish(MeshEvent::TaskFailed {
            agent_id: agent.clone(),
            task_type: task.task_type.clone(),
            error: err.to_string(),
            latency_ms,
        });
        warn!(agent = %agent, task = %task.task_type, error = %err, "Task failed");
    }

    fn announce_evolution(&self, agent: &AgentId) {
        self.metrics.lock().agents_evolved += 1;
        if let Some(node) = self.topology.get_node(agent.as_str()) {
            self.events.publish(MeshEvent::AgentEvolved {
                agent_id: agent.clone(),
                level: node.consciousness.current,
            });
        }
    }

    /// Consolidate, then learn every unlearned pattern above the confidence
    /// threshold. Returns how many patterns were learned.
    pub fn auto_learn(&self) -> usize {
        self.memory.consolidate();
        let learned = self.memory.learn_pending(self.confidence_threshold);
        if learned.is_empty() {
            return 0;
        }
        let count = learned.len();
        self.metrics.lock().patterns_learned += count as u64;
        info!(count, "Auto-learned patterns");
        self.events.publish(MeshEvent::PatternsLearned {
            knowledge_ids: learned.into_iter().map(|k| k.id).collect(),
        });
        count
    }

    /// Run every assignment concurrently as one workflow.
    ///
    /// Consecutive agents are entangled as coordinators before the run and
    /// their interaction counted after it. Every assignment runs to the end
    /// even when some fail; the first error in assignment order is returned.
    pub async fn run_many(&self, assignments: &[Assignment]) -> Result<WorkflowResult> {
        let workflow_id = format!("workflow-{}", Uuid::new_v4());
        let started = Instant::now();
        info!(
            workflow = %workflow_id,
            agents = assignments.len(),
            "Starting multi-agent coordination"
        );

        for pair in assignments.windows(2) {
            self.topology.entangle(
                pair[0].agent_id.as_str(),
                pair[1].agent_id.as_str(),
                RelationType::Coordination,
            );
        }

        let runs = join_all(
            assignments
                .iter()
                .map(|a| self.execute(a.agent_id.as_str(), &a.task, a.body.as_ref())),
        )
        .await;

        for pair in assignments.windows(2) {
            self.topology
                .record_interaction(pair[0].agent_id.as_str(), pair[1].agent_id.as_str());
        }

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let success = runs
            .iter()
            .all(|(result, _)| matches!(result, Ok(outcome) if outcome.success));
        let steps = assignments
            .iter()
            .zip(&runs)
            .map(|(a, (_, latency_ms))| WorkflowStep {
                name: a.task.task_type.clone(),
                agent_id: Some(a.agent_id.to_string()),
                duration_ms: Some(*latency_ms),
            })
            .collect();
        self.memory
            .observe(Observation::WorkflowExecution(WorkflowExecution {
                workflow_id: Some(workflow_id.clone()),
                duration_ms: Some(duration_ms),
                success: Some(success),
                steps,
            }));
        self.events.publish(MeshEvent::WorkflowCompleted {
            workflow_id: workflow_id.clone(),
            success,
            agents: assignments.len(),
            duration_ms,
        });

        let mut results = Vec::with_capacity(runs.len());
        for (result, _) in runs {
            results.push(result?);
        }
        let output = results
            .iter()
            .map(|r| r.output.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        info!(workflow = %workflow_id, success, duration_ms, "Coordination complete");

        Ok(WorkflowResult {
            workflow_id,
            success,
            output,
            agents_involved: results.len(),
            results,
            duration_ms,
        })
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    pub fn system_metrics(&self) -> SystemMetrics {
        let execution = self.execution_metrics();
        let snapshot = self.topology.snapshot();
        SystemMetrics {
            success_rate: execution.success_rate(),
            execution,
            learning: self.memory.stats(),
            topology: TopologySummary {
                agents: snapshot.nodes.len(),
                connections: snapshot.edges.len(),
                energy: snapshot.energy,
                consciousness: snapshot.consciousness,
            },
        }
    }

    pub fn improvement_recommendations(&self) -> Vec<Recommendation> {
        recommend(&self.memory.get_insights())
    }

    /// Whole-network view, or one agent and its direct neighbours.
    pub fn visualization(&self, agent_id: Option<&str>) -> Visualization {
        let snapshot = self.topology.snapshot();
        let insights = self.memory.get_insights();
        let Some(id) = agent_id else {
            return Visualization {
                agent: None,
                topology: snapshot,
                insights,
                metrics: Some(self.system_metrics()),
            };
        };

        let TopologySnapshot {
            nodes,
            edges,
            energy,
            consciousness,
        } = snapshot;
        let edges: Vec<_> = edges
            .into_iter()
            .filter(|e| e.from.as_str() == id || e.to.as_str() == id)
            .collect();
        let nodes = nodes
            .into_iter()
            .filter(|n| {
                n.id.as_str() == id
                    || edges
                        .iter()
                        .any(|e| e.from == n.id || e.to == n.id)
            })
            .collect();
        Visualization {
            agent: self.topology.agent_position(id),
            topology: TopologySnapshot {
                nodes,
                edges,
                energy,
                consciousness,
            },
            insights: insights.for_agent(id),
            metrics: None,
        }
    }

    pub fn health_check(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            agents: self.topology.len(),
            patterns_detected: self.memory.learning_metrics().patterns_detected,
            timestamp: Utc::now(),
            metrics: self.system_metrics(),
        }
    }
}
