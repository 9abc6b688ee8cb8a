//! Agent nodes and their running metrics

use crate::consciousness::ConsciousnessState;
use crate::quantum::QuantumState;
use agentmesh_core::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub task_count: u64,
    /// EMA over task outcomes (1 = success).
    pub success_rate: f64,
    /// EMA over task latency.
    pub average_latency_ms: f64,
    pub learning_rate: f64,
}

impl NodeMetrics {
    pub fn new(success_rate: f64, learning_rate: f64) -> Self {
        Self {
            task_count: 0,
            success_rate,
            average_latency_ms: 0.0,
            learning_rate,
        }
    }

    /// Fold one update into the metrics. `alpha` weights the new sample.
    pub fn apply(&mut self, update: &MetricsUpdate, alpha: f64, learned_increment: f64) {
        if update.task_completed {
            self.task_count += 1;
        }
        if let Some(success) = update.success {
            let sample = if success { 1.0 } else { 0.0 };
            self.success_rate = ema(self.success_rate, sample, alpha);
        }
        if let Some(latency) = update.latency_ms {
            self.average_latency_ms = ema(self.average_latency_ms, latency, alpha);
        }
        if update.learned {
            self.learning_rate = (self.learning_rate + learned_increment).min(1.0);
        }
    }
}

/// Exponential moving average step.
pub fn ema(current: f64, sample: f64, alpha: f64) -> f64 {
    (1.0 - alpha) * current + alpha * sample
}

/// Partial metrics update; absent fields leave the metric untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(default)]
    pub task_completed: bool,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub learned: bool,
}

impl MetricsUpdate {
    pub fn completed(success: bool, latency_ms: f64) -> Self {
        Self {
            task_completed: true,
            success: Some(success),
            latency_ms: Some(latency_ms),
            learned: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: Some(false),
            ..Default::default()
        }
    }

    pub fn learned(mut self, learned: bool) -> Self {
        self.learned = learned;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: AgentId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub quantum: QuantumState,
    pub energy: f64,
    pub consciousness: ConsciousnessState,
    pub connections: BTreeSet<AgentId>,
    pub metrics: NodeMetrics,
    pub created: DateTime<Utc>,
}
