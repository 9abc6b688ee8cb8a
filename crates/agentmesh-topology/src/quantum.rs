//! Quantum state - superposition over behavioral states
//!
//! A node is either in superposition (one or more candidate states with a
//! uniform distribution) or collapsed onto a single state while it acts.
//! Collapsing costs coherence; restoring superposition wins some back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Tolerance used when checking that a distribution sums to one.
pub const PROBABILITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorState {
    Idle,
    Listening,
    Thinking,
    Acting,
    Learning,
}

impl BehaviorState {
    pub const ALL: [BehaviorState; 5] = [
        BehaviorState::Idle,
        BehaviorState::Listening,
        BehaviorState::Thinking,
        BehaviorState::Acting,
        BehaviorState::Learning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Acting => "acting",
            Self::Learning => "learning",
        }
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehaviorState {
    type Err = String;

    /// "working" is accepted as a synonym for `acting`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "listening" => Ok(Self::Listening),
            "thinking" => Ok(Self::Thinking),
            "acting" | "working" => Ok(Self::Acting),
            "learning" => Ok(Self::Learning),
            other => Err(format!("unknown behavior state: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantumPhase {
    Superposition,
    Collapsed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantumState {
    pub phase: QuantumPhase,
    /// Active state set, never empty.
    pub states: BTreeSet<BehaviorState>,
    /// Distribution over every `BehaviorState`.
    pub probabilities: BTreeMap<BehaviorState, f64>,
    pub coherence: f64,
    pub last_collapse: DateTime<Utc>,
}

impl QuantumState {
    /// Fresh superposition holding only `idle`.
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut state = Self {
            phase: QuantumPhase::Superposition,
            states: BTreeSet::new(),
            probabilities: BTreeMap::new(),
            coherence: 1.0,
            last_collapse: now,
        };
        state.assign(&[BehaviorState::Idle]);
        state
    }

    /// Force a single state. Coherence is multiplied by `coherence_factor`.
    pub fn collapse(&mut self, state: BehaviorState, coherence_factor: f64, now: DateTime<Utc>) {
        self.assign(&[state]);
        self.phase = QuantumPhase::Collapsed;
        self.coherence = (self.coherence * coherence_factor).clamp(0.0, 1.0);
        self.last_collapse = now;
    }

    /// Spread uniformly over `states`. Returns false (unchanged) for an empty slice.
    pub fn restore(&mut self, states: &[BehaviorState], coherence_boost: f64) -> bool {
        if states.is_empty() {
            return false;
        }
        self.assign(states);
        self.phase = QuantumPhase::Superposition;
        self.coherence = (self.coherence + coherence_boost).min(1.0);
        true
    }

    pub fn is_collapsed(&self) -> bool {
        self.phase == QuantumPhase::Collapsed
    }

    pub fn probability(&self, state: BehaviorState) -> f64 {
        self.probabilities.get(&state).copied().unwrap_or(0.0)
    }

    pub fn probability_sum(&self) -> f64 {
        self.probabilities.values().sum()
    }

    pub fn is_normalized(&self) -> bool {
        (self.probability_sum() - 1.0).abs() < PROBABILITY_EPSILON
    }

    fn assign(&mut self, states: &[BehaviorState]) {
        self.states = states.iter().copied().collect();
        let share = 1.0 / self.states.len() as f64;
        for s in BehaviorState::ALL {
            let p = if self.states.contains(&s) { share } else { 0.0 };
            self.probabilities.insert(s, p);
        }
    }
}

/// Parse state names, dropping unknown ones.
pub fn parse_states<S: AsRef<str>>(names: &[S]) -> Vec<BehaviorState> {
    names
        .iter()
        .filter_map(|n| n.as_ref().parse().ok())
        .collect()
}
