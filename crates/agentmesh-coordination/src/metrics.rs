//! Execution metrics owned by the facade

use agentmesh_learning::LearningStats;
use agentmesh_topology::{EnergyView, LevelView};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// EMA over every finished execution.
    pub average_latency_ms: f64,
    pub patterns_learned: u64,
    pub agents_evolved: u64,
}

impl ExecutionMetrics {
    /// A task body returned an outcome, successful or not.
    pub fn record_completed(&mut self, success: bool, latency_ms: f64, alpha: f64) {
        self.total_executions += 1;
        if success {
            self.successful_executions += 1;
        } else {
            self.failed_executions += 1;
        }
        self.observe_latency(latency_ms, alpha);
    }

    /// A task body returned an error.
    pub fn record_failed(&mut self, latency_ms: f64, alpha: f64) {
        self.total_executions += 1;
        self.failed_executions += 1;
        self.observe_latency(latency_ms, alpha);
    }

    fn observe_latency(&mut self, latency_ms: f64, alpha: f64) {
        self.average_latency_ms = if self.total_executions == 1 {
            latency_ms
        } else {
            (1.0 - alpha) * self.average_latency_ms + alpha * latency_ms
        };
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.successful_executions as f64 / self.total_executions as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopologySummary {
    pub agents: usize,
    pub connections: usize,
    pub energy: EnergyView,
    pub consciousness: Vec<LevelView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    pub execution: ExecutionMetrics,
    pub success_rate: f64,
    pub learning: LearningStats,
    pub topology: TopologySummary,
}
