//! Mesh configuration
//!
//! All tunable thresholds in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level mesh configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Shared energy pool.
    pub energy: EnergyConfig,
    /// Collapse/restore coherence dynamics.
    pub quantum: QuantumConfig,
    /// Per-node metrics and consciousness evolution.
    pub evolution: EvolutionConfig,
    /// Memory tier capacities.
    pub memory: MemoryConfig,
    /// Pattern detection, consolidation and decay.
    pub learning: LearningConfig,
    /// Task execution facade.
    pub coordination: CoordinationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Fixed size of the pool.
    pub pool_total: f64,
    /// Units granted to each agent on registration.
    pub initial_allocation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantumConfig {
    /// Coherence multiplier applied on collapse.
    pub collapse_coherence_factor: f64,
    /// Coherence added back on restore, capped at 1.0.
    pub restore_coherence_boost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Completed tasks required before a node may evolve.
    pub min_tasks: u64,
    /// Success-rate EMA required before a node may evolve.
    pub min_success_rate: f64,
    /// Learning rate required before a node may evolve.
    pub min_learning_rate: f64,
    pub awareness_step: f64,
    pub adaptability_step: f64,
    /// Added to a node's learning rate for every `learned` metrics update.
    pub learned_increment: f64,
    /// Smoothing factor for node success-rate and latency EMAs.
    pub metrics_ema_alpha: f64,
    pub initial_success_rate: f64,
    pub initial_learning_rate: f64,
    pub initial_adaptability: f64,
    /// Role substring that places a new agent at L3.
    pub coordinator_role_hint: String,
    /// Capability count above which a new agent starts at L2.
    pub context_aware_capability_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub short_term_capacity: usize,
    pub episodic_capacity: usize,
    /// Error contexts retained per error type.
    pub error_context_window: usize,
    /// Hour-of-day samples retained per user.
    pub max_hour_samples: usize,
    /// Improvement-area markers retained per agent.
    pub max_improvement_areas: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Strength added to a pattern each time it is matched again.
    pub learning_rate: f64,
    /// Cluster size needed to promote an observation to a pattern.
    pub min_occurrences: usize,
    /// Pattern strength needed to synthesize knowledge.
    pub confidence_threshold: f64,
    /// Daily decay base for pattern strength.
    pub decay_factor: f64,
    /// Patterns weaker than this are evicted.
    pub eviction_threshold: f64,
    /// Similarity above which an observation strengthens an existing pattern.
    pub match_similarity: f64,
    /// Similarity above which short-term observations count as one cluster.
    pub cluster_similarity: f64,
    /// Smoothing factor for detector EMAs.
    pub detector_ema_alpha: f64,
    /// Agent success rate below which an improvement area is recorded.
    pub improvement_threshold: f64,
    /// Step share of the average workflow duration that marks a bottleneck.
    pub bottleneck_ratio: f64,
    pub error_prone_changes: u64,
    pub error_prone_bug_fixes: u64,
    /// Change count above which a file shows up in code insights.
    pub unstable_change_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Consolidate and learn after every successful task.
    pub auto_learn: bool,
    /// Period of the background consolidation loop.
    pub consolidation_interval_secs: u64,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
    /// Superposition restored after a successful task.
    pub success_states: Vec<String>,
    /// Superposition restored after a failed or abandoned task.
    pub failure_states: Vec<String>,
}

// ============================================================
// Defaults
// ============================================================

impl Default for EnergyConfig {
    fn default() -> Self {
        Self { pool_total: 1000.0, initial_allocation: 100.0 }
    }
}

impl Default for QuantumConfig {
    fn default() -> Self {
        Self { collapse_coherence_factor: 0.9, restore_coherence_boost: 0.2 }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            min_tasks: 100,
            min_success_rate: 0.8,
            min_learning_rate: 0.5,
            awareness_step: 0.1,
            adaptability_step: 0.1,
            learned_increment: 0.01,
            metrics_ema_alpha: 0.1,
            initial_success_rate: 1.0,
            initial_learning_rate: 0.1,
            initial_adaptability: 0.5,
            coordinator_role_hint: "coordinator".into(),
            context_aware_capability_count: 5,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 100,
            episodic_capacity: 1000,
            error_context_window: 10,
            max_hour_samples: 256,
            max_improvement_areas: 50,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            min_occurrences: 3,
            confidence_threshold: 0.7,
            decay_factor: 0.95,
            eviction_threshold: 0.1,
            match_similarity: 0.8,
            cluster_similarity: 0.7,
            detector_ema_alpha: 0.1,
            improvement_threshold: 0.8,
            bottleneck_ratio: 0.3,
            error_prone_changes: 10,
            error_prone_bug_fixes: 5,
            unstable_change_count: 5,
        }
    }
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            auto_learn: true,
            consolidation_interval_secs: 60,
            event_buffer: 256,
            success_states: vec!["idle".into(), "listening".into()],
            failure_states: vec!["idle".into()],
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl MeshConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Reject values that would break the pool or decay arithmetic.
    pub fn validate(&self) -> Result<()> {
        if !(self.energy.pool_total >= 0.0) {
            return Err(Error::Config("energy.pool_total must be non-negative".into()));
        }
        if !(self.energy.initial_allocation >= 0.0) {
            return Err(Error::Config("energy.initial_allocation must be non-negative".into()));
        }
        if !(0.0..=1.0).contains(&self.learning.decay_factor) {
            return Err(Error::Config("learning.decay_factor must be within [0, 1]".into()));
        }
        for (name, alpha) in [
            ("evolution.metrics_ema_alpha", self.evolution.metrics_ema_alpha),
            ("learning.detector_ema_alpha", self.learning.detector_ema_alpha),
        ] {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(Error::Config(format!("{} must be within [0, 1]", name)));
            }
        }
        if self.memory.short_term_capacity == 0 || self.memory.episodic_capacity == 0 {
            return Err(Error::Config("memory capacities must be positive".into()));
        }
        if self.coordination.success_states.is_empty() || self.coordination.failure_states.is_empty() {
            return Err(Error::Config("coordination restore states must not be empty".into()));
        }
        if self.coordination.event_buffer == 0 {
            return Err(Error::Config("coordination.event_buffer must be positive".into()));
        }
        if self.coordination.consolidation_interval_secs == 0 {
            return Err(Error::Config(
                "coordination.consolidation_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
