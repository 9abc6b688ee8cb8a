//! Memory store - short-term, episodic, long-term and semantic tiers plus
//! the per-domain pattern tables
//!
//! Tiers shared by every execution sit behind coarse `parking_lot` locks.
//! Pattern tables are sharded by row key so different agents never contend.

use crate::consolidation::LongTermPattern;
use crate::detectors::{
    AgentPattern, CodePattern, DetectorSettings, ErrorPattern, UserPattern, WorkflowPattern,
};
use crate::knowledge::KnowledgeBase;
use crate::observation::{Episode, Observation, ObservationKind, ObservationRecord};
use agentmesh_core::config::{LearningConfig, MemoryConfig};
use agentmesh_core::MeshConfig;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct LearningMetrics {
    pub observations: u64,
    pub patterns_detected: u64,
    pub last_learned: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub short_term: usize,
    pub long_term: usize,
    pub episodic: usize,
    pub semantic: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningStats {
    pub observations: u64,
    pub patterns_detected: u64,
    pub knowledge_items: usize,
    pub memory_usage: MemoryUsage,
    pub last_learned: Option<DateTime<Utc>>,
}

pub struct MemoryStore {
    pub(crate) memory: MemoryConfig,
    pub(crate) learning: LearningConfig,
    pub(crate) detectors: DetectorSettings,
    next_id: AtomicU64,
    pub(crate) short_term: Mutex<BTreeMap<u64, ObservationRecord>>,
    episodic: Mutex<VecDeque<Episode>>,
    pub(crate) long_term: RwLock<BTreeMap<String, LongTermPattern>>,
    pub(crate) knowledge: RwLock<KnowledgeBase>,
    pub(crate) metrics: Mutex<LearningMetrics>,
    /// Serializes consolidation passes.
    pub(crate) consolidating: Mutex<()>,
    users: DashMap<String, UserPattern>,
    agents: DashMap<String, AgentPattern>,
    code: DashMap<String, CodePattern>,
    workflows: DashMap<String, WorkflowPattern>,
    errors: DashMap<String, ErrorPattern>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&MeshConfig::default())
    }
}

impl MemoryStore {
    pub fn new(config: &MeshConfig) -> Self {
        info!(
            learning_rate = config.learning.learning_rate,
            min_occurrences = config.learning.min_occurrences,
            "Memory store initialized"
        );
        Self {
            memory: config.memory.clone(),
            learning: config.learning.clone(),
            detectors: DetectorSettings::from_config(&config.memory, &config.learning),
            next_id: AtomicU64::new(1),
            short_term: Mutex::new(BTreeMap::new()),
            episodic: Mutex::new(VecDeque::new()),
            long_term: RwLock::new(BTreeMap::new()),
            knowledge: RwLock::new(KnowledgeBase::default()),
            metrics: Mutex::new(LearningMetrics::default()),
            consolidating: Mutex::new(()),
            users: DashMap::new(),
            agents: DashMap::new(),
            code: DashMap::new(),
            workflows: DashMap::new(),
            errors: DashMap::new(),
        }
    }

    /// Record an observation now. Returns its short-term id.
    pub fn observe(&self, observation: Observation) -> u64 {
        self.observe_at(observation, Utc::now())
    }

    /// Record an observation with an explicit timestamp.
    pub fn observe_at(&self, observation: Observation, now: DateTime<Utc>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = observation.kind();

        {
            let mut short_term = self.short_term.lock();
            short_term.insert(
                id,
                ObservationRecord {
                    id,
                    observation: observation.clone(),
                    timestamp: now,
                    processed: false,
                },
            );
            while short_term.len() > self.memory.short_term_capacity {
                short_term.pop_first();
            }
        }

        self.detect(&observation, now);

        {
            let mut episodic = self.episodic.lock();
            episodic.push_back(Episode {
                timestamp: now,
                kind,
                data: observation,
            });
            while episodic.len() > self.memory.episodic_capacity {
                episodic.pop_front();
            }
        }

        let total = {
            let mut metrics = self.metrics.lock();
            metrics.observations += 1;
            metrics.observations
        };
        debug!(kind = %kind, total, "Observation recorded");
        id
    }

    fn detect(&self, observation: &Observation, now: DateTime<Utc>) {
        let settings = &self.detectors;
        match observation {
            Observation::UserMessage(m) => {
                if let Some(user) = &m.user_id {
                    self.users.entry(user.clone()).or_default().record(m, now, settings);
                }
            }
            Observation::AgentAction(a) => {
                if let Some(agent) = &a.agent_id {
                    self.agents.entry(agent.clone()).or_default().record(a, now, settings);
                }
            }
            Observation::CodeChange(c) => {
                if let Some(file) = &c.file {
                    self.code.entry(file.clone()).or_default().record(c, now, settings);
                }
            }
            Observation::WorkflowExecution(w) => {
                if let Some(workflow) = &w.workflow_id {
                    self.workflows.entry(workflow.clone()).or_default().record(w, settings);
                }
            }
            Observation::Error(e) => {
                let error_type = e.error_type.clone().unwrap_or_else(|| "unknown".to_string());
                let (recurring, occurrences) = {
                    let mut row = self.errors.entry(error_type.clone()).or_default();
                    let recurring = row.record(e, now, settings);
                    (recurring, row.occurrences)
                };
                if recurring {
                    self.metrics.lock().patterns_detected += 1;
                    warn!(error_type = %error_type, occurrences, "Recurring error pattern detected");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Tier views
    // ------------------------------------------------------------------

    pub fn short_term(&self) -> Vec<ObservationRecord> {
        self.short_term.lock().values().cloned().collect()
    }

    pub fn short_term_len(&self) -> usize {
        self.short_term.lock().len()
    }

    pub fn episodes(&self) -> Vec<Episode> {
        self.episodic.lock().iter().cloned().collect()
    }

    pub fn episodic_len(&self) -> usize {
        self.episodic.lock().len()
    }

    pub fn patterns(&self) -> Vec<LongTermPattern> {
        self.long_term.read().values().cloned().collect()
    }

    pub fn pattern(&self, id: &str) -> Option<LongTermPattern> {
        self.long_term.read().get(id).cloned()
    }

    pub fn user_pattern(&self, user: &str) -> Option<UserPattern> {
        self.users.get(user).map(|r| r.value().clone())
    }

    pub fn agent_pattern(&self, agent: &str) -> Option<AgentPattern> {
        self.agents.get(agent).map(|r| r.value().clone())
    }

    pub fn code_pattern(&self, file: &str) -> Option<CodePattern> {
        self.code.get(file).map(|r| r.value().clone())
    }

    pub fn workflow_pattern(&self, workflow: &str) -> Option<WorkflowPattern> {
        self.workflows.get(workflow).map(|r| r.value().clone())
    }

    pub fn error_pattern(&self, error_type: &str) -> Option<ErrorPattern> {
        self.errors.get(error_type).map(|r| r.value().clone())
    }

    pub(crate) fn user_rows(&self) -> Vec<(String, UserPattern)> {
        self.users.iter().map(|r| (r.key().clone(), r.value().clone())).collect()
    }

    pub(crate) fn agent_rows(&self) -> Vec<(String, AgentPattern)> {
        self.agents.iter().map(|r| (r.key().clone(), r.value().clone())).collect()
    }

    pub(crate) fn code_rows(&self) -> Vec<(String, CodePattern)> {
        self.code.iter().map(|r| (r.key().clone(), r.value().clone())).collect()
    }

    pub(crate) fn workflow_rows(&self) -> Vec<(String, WorkflowPattern)> {
        self.workflows.iter().map(|r| (r.key().clone(), r.value().clone())).collect()
    }

    pub(crate) fn error_rows(&self) -> Vec<(String, ErrorPattern)> {
        self.errors.iter().map(|r| (r.key().clone(), r.value().clone())).collect()
    }

    pub fn learning_metrics(&self) -> LearningMetrics {
        self.metrics.lock().clone()
    }

    pub fn stats(&self) -> LearningStats {
        let metrics = self.learning_metrics();
        let (knowledge_items, semantic) = {
            let kb = self.knowledge.read();
            (kb.len(), kb.semantic_len())
        };
        LearningStats {
            observations: metrics.observations,
            patterns_detected: metrics.patterns_detected,
            knowledge_items,
            memory_usage: MemoryUsage {
                short_term: self.short_term_len(),
                long_term: self.long_term.read().len(),
                episodic: self.episodic_len(),
                semantic,
            },
            last_learned: metrics.last_learned,
        }
    }

    /// Knowledge ids indexed under an observation kind.
    pub fn semantic_index(&self, kind: ObservationKind) -> Vec<String> {
        self.knowledge.read().indexed(kind).to_vec()
    }
}
