//! Read-only reports served by the facade

use crate::metrics::SystemMetrics;
use agentmesh_learning::Insights;
use agentmesh_topology::{AgentPosition, TopologySnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Topology, insights and metrics for a dashboard. When scoped to one agent
/// the topology only holds that agent and its neighbours, and metrics are
/// left out.
#[derive(Debug, Clone, Serialize)]
pub struct Visualization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentPosition>,
    pub topology: TopologySnapshot,
    pub insights: Insights,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SystemMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub agents: usize,
    pub patterns_detected: u64,
    pub timestamp: DateTime<Utc>,
    pub metrics: SystemMetrics,
}
