//! Consciousness levels - five ordered awareness tiers
//!
//! L1 → L2 → L3 → L4 → L5, monotonic, terminal at L5. The registry keeps a
//! membership list per tier in sync with each node's current level.

use agentmesh_core::AgentId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConsciousnessLevel {
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl ConsciousnessLevel {
    pub const ALL: [ConsciousnessLevel; 5] = [
        ConsciousnessLevel::L1,
        ConsciousnessLevel::L2,
        ConsciousnessLevel::L3,
        ConsciousnessLevel::L4,
        ConsciousnessLevel::L5,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::L1 => 0,
            Self::L2 => 1,
            Self::L3 => 2,
            Self::L4 => 3,
            Self::L5 => 4,
        }
    }

    /// Next tier, or self at L5.
    pub fn next(self) -> Self {
        match self {
            Self::L1 => Self::L2,
            Self::L2 => Self::L3,
            Self::L3 => Self::L4,
            Self::L4 | Self::L5 => Self::L5,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::L5
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::L1 => "Simple execution",
            Self::L2 => "Context awareness",
            Self::L3 => "Multi-agent coordination",
            Self::L4 => "Temporal learning",
            Self::L5 => "Meta-cognitive optimization",
        }
    }
}

impl fmt::Display for ConsciousnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.index() + 1)
    }
}

/// Per-node consciousness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsciousnessState {
    pub current: ConsciousnessLevel,
    pub evolving_to: ConsciousnessLevel,
    pub awareness: f64,
    pub adaptability: f64,
    /// Task count when the node entered its current level.
    pub level_entry_tasks: u64,
}

impl ConsciousnessState {
    pub fn new(current: ConsciousnessLevel, awareness: f64, adaptability: f64) -> Self {
        Self {
            current,
            evolving_to: current.next(),
            awareness: awareness.clamp(0.0, 1.0),
            adaptability: adaptability.clamp(0.0, 1.0),
            level_entry_tasks: 0,
        }
    }

    pub fn can_evolve(&self) -> bool {
        self.current != self.evolving_to
    }

    /// Advance one tier. Returns the level left behind.
    pub fn advance(&mut self, awareness_step: f64, adaptability_step: f64, task_count: u64) -> ConsciousnessLevel {
        let previous = self.current;
        self.current = self.evolving_to;
        self.evolving_to = self.current.next();
        self.awareness = (self.awareness + awareness_step).min(1.0);
        self.adaptability = (self.adaptability + adaptability_step).min(1.0);
        self.level_entry_tasks = task_count;
        previous
    }
}

/// Membership lists for the five tiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsciousnessRegistry {
    members: [Vec<AgentId>; 5],
}

impl ConsciousnessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, level: ConsciousnessLevel, id: &AgentId) {
        let list = &mut self.members[level.index()];
        if !list.contains(id) {
            list.push(id.clone());
        }
    }

    pub fn remove(&mut self, level: ConsciousnessLevel, id: &AgentId) -> bool {
        let list = &mut self.members[level.index()];
        let before = list.len();
        list.retain(|m| m != id);
        list.len() != before
    }

    pub fn promote(&mut self, from: ConsciousnessLevel, to: ConsciousnessLevel, id: &AgentId) {
        self.remove(from, id);
        self.add(to, id);
    }

    pub fn members(&self, level: ConsciousnessLevel) -> &[AgentId] {
        &self.members[level.index()]
    }

    pub fn count(&self, level: ConsciousnessLevel) -> usize {
        self.members[level.index()].len()
    }

    pub fn level_of(&self, id: &AgentId) -> Option<ConsciousnessLevel> {
        ConsciousnessLevel::ALL
            .into_iter()
            .find(|l| self.members[l.index()].contains(id))
    }

    pub fn total(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }
}
