//! Read-only projections of the topology for dashboards and diagnostics

use crate::consciousness::{ConsciousnessLevel, ConsciousnessState};
use crate::graph::Edge;
use crate::node::NodeMetrics;
use crate::quantum::{BehaviorState, QuantumPhase};
use agentmesh_core::AgentId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<Edge>,
    pub energy: EnergyView,
    pub consciousness: Vec<LevelView>,
}

impl TopologySnapshot {
    pub fn node(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: AgentId,
    pub name: String,
    pub phase: QuantumPhase,
    pub states: Vec<BehaviorState>,
    pub coherence: f64,
    pub energy: f64,
    pub consciousness: ConsciousnessLevel,
    pub connections: Vec<AgentId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnergyView {
    pub total: f64,
    pub available: f64,
    pub distributed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelView {
    pub level: ConsciousnessLevel,
    pub description: &'static str,
    pub agent_count: usize,
}

/// Where an agent sits in the network.
#[derive(Debug, Clone, Serialize)]
pub struct AgentPosition {
    pub id: AgentId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub consciousness: ConsciousnessState,
    pub energy: f64,
    pub connections: usize,
    pub entanglements: usize,
    pub metrics: NodeMetrics,
}
