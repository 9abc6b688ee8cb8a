//! Topology graph - the arena of agent nodes, edges and shared energy
//!
//! Each node sits behind its own mutex so executions on different agents
//! never contend. The energy pool and the consciousness registry are shared
//! and take a coarse lock.
//!
//! Lock order: membership → pool → node → registry. Nothing holds a node
//! lock while waiting on the pool, and nothing holds the registry while
//! waiting on a node. The membership lock serializes changes to the set of
//! agents and their connections, so no edge can outlive an endpoint.

use crate::consciousness::{ConsciousnessLevel, ConsciousnessRegistry, ConsciousnessState};
use crate::energy::{EnergyPool, ENERGY_EPSILON};
use crate::node::{AgentNode, MetricsUpdate, NodeMetrics};
use crate::quantum::{BehaviorState, QuantumState};
use crate::snapshot::{AgentPosition, EnergyView, LevelView, NodeView, TopologySnapshot};
use agentmesh_core::config::{EnergyConfig, EvolutionConfig, QuantumConfig};
use agentmesh_core::{AgentDescriptor, AgentId, Error, MeshConfig, Result};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Trait weights used to derive a new agent's awareness.
const AWARENESS_WEIGHTS: [(&str, f64); 5] = [
    ("curious", 0.3),
    ("empathetic", 0.2),
    ("innovative", 0.2),
    ("analytical", 0.2),
    ("patient", 0.1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Coordination,
    Delegation,
    Learning,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordination => write!(f, "coordination"),
            Self::Delegation => write!(f, "delegation"),
            Self::Learning => write!(f, "learning"),
        }
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coordination" => Ok(Self::Coordination),
            "delegation" => Ok(Self::Delegation),
            "learning" => Ok(Self::Learning),
            other => Err(format!("unknown relation type: {}", other)),
        }
    }
}

/// Directed edge record; the connection it creates is bidirectional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: AgentId,
    pub to: AgentId,
    #[serde(rename = "type")]
    pub relation: RelationType,
    pub strength: f64,
    pub bandwidth: f64,
    pub latency: f64,
    pub interactions: u64,
    pub created: DateTime<Utc>,
}

impl Edge {
    fn new(from: AgentId, to: AgentId, relation: RelationType, now: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            relation,
            strength: 1.0,
            bandwidth: 100.0,
            latency: 0.0,
            interactions: 0,
            created: now,
        }
    }
}

/// Entry in the (symmetric) entanglement index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entanglement {
    pub correlation_strength: f64,
    pub last_sync: DateTime<Utc>,
}

pub struct TopologyGraph {
    nodes: DashMap<AgentId, Arc<Mutex<AgentNode>>>,
    edges: DashMap<(AgentId, AgentId), Edge>,
    entanglements: DashMap<AgentId, HashMap<AgentId, Entanglement>>,
    membership: Mutex<()>,
    pool: Mutex<EnergyPool>,
    registry: RwLock<ConsciousnessRegistry>,
    energy: EnergyConfig,
    quantum: QuantumConfig,
    evolution: EvolutionConfig,
}

impl Default for TopologyGraph {
    fn default() -> Self {
        Self::new(&MeshConfig::default())
    }
}

impl TopologyGraph {
    pub fn new(config: &MeshConfig) -> Self {
        info!(pool = config.energy.pool_total, "Topology graph initialized");
        Self {
            nodes: DashMap::new(),
            edges: DashMap::new(),
            entanglements: DashMap::new(),
            membership: Mutex::new(()),
            pool: Mutex::new(EnergyPool::new(config.energy.pool_total)),
            registry: RwLock::new(ConsciousnessRegistry::new()),
            energy: config.energy.clone(),
            quantum: config.quantum.clone(),
            evolution: config.evolution.clone(),
        }
    }

    fn node(&self, id: &str) -> Option<Arc<Mutex<AgentNode>>> {
        self.nodes.get(id).map(|n| n.value().clone())
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add an agent to the graph and grant it its initial energy.
    pub fn register_agent(&self, descriptor: &AgentDescriptor) -> Result<AgentNode> {
        let id = AgentId::new(descriptor.id.clone());
        let level = self.initial_level(descriptor);
        let now = Utc::now();
        let node = AgentNode {
            id: id.clone(),
            name: descriptor.name.clone(),
            node_type: descriptor.agent_type.clone(),
            quantum: QuantumState::new(now),
            energy: 0.0,
            consciousness: ConsciousnessState::new(
                level,
                awareness_from_traits(&descriptor.traits),
                self.evolution.initial_adaptability,
            ),
            connections: BTreeSet::new(),
            metrics: NodeMetrics::new(
                self.evolution.initial_success_rate,
                self.evolution.initial_learning_rate,
            ),
            created: now,
        };

        let _membership = self.membership.lock();
        match self.nodes.entry(id.clone()) {
            Entry::Occupied(_) => return Err(Error::AgentAlreadyRegistered(id.to_string())),
            Entry::Vacant(slot) => {
                self.registry.write().add(level, &id);
                slot.insert(Arc::new(Mutex::new(node)));
            }
        }
        let granted = self.allocate_energy(id.as_str(), self.energy.initial_allocation);

        info!(agent = %id, consciousness = %level, energy = granted, "Agent registered in topology");
        self.get_node(id.as_str())
            .ok_or_else(|| Error::AgentNotFound(id.to_string()))
    }

    fn initial_level(&self, descriptor: &AgentDescriptor) -> ConsciousnessLevel {
        let hint = self.evolution.coordinator_role_hint.to_ascii_lowercase();
        let is_coordinator = descriptor
            .role
            .as_deref()
            .map(|r| !hint.is_empty() && r.to_ascii_lowercase().contains(&hint))
            .unwrap_or(false);
        if is_coordinator {
            ConsciousnessLevel::L3
        } else if descriptor.capabilities.len() > self.evolution.context_aware_capability_count {
            ConsciousnessLevel::L2
        } else {
            ConsciousnessLevel::L1
        }
    }

    /// Remove an agent, every edge touching it, and return its energy to the pool.
    pub fn deregister_agent(&self, id: &str) -> Option<AgentNode> {
        let _membership = self.membership.lock();
        let (id, node) = self.nodes.remove(id)?;
        self.edges.retain(|(from, to), _| *from != id && *to != id);
        self.entanglements.remove(&id);

        let peers = node.lock().connections.clone();
        for peer in &peers {
            if let Some(p) = self.node(peer.as_str()) {
                p.lock().connections.remove(&id);
            }
            if let Some(mut index) = self.entanglements.get_mut(peer) {
                index.remove(&id);
            }
        }

        let released = self.pool.lock().release(&id);
        let mut guard = node.lock();
        self.registry.write().remove(guard.consciousness.current, &id);
        guard.energy = 0.0;
        guard.connections.clear();
        info!(agent = %id, released, "Agent deregistered");
        Some(guard.clone())
    }

    // ------------------------------------------------------------------
    // Entanglement
    // ------------------------------------------------------------------

    /// Create or overwrite the (a, b) edge and connect both endpoints.
    /// Returns None when either agent is unknown or a == b.
    pub fn entangle(&self, a: &str, b: &str, relation: RelationType) -> Option<Edge> {
        if a == b {
            return None;
        }
        let _membership = self.membership.lock();
        let (node_a, node_b) = (self.node(a)?, self.node(b)?);
        let (id_a, id_b) = (AgentId::new(a), AgentId::new(b));
        let now = Utc::now();

        let edge = Edge::new(id_a.clone(), id_b.clone(), relation, now);
        self.edges.insert((id_a.clone(), id_b.clone()), edge.clone());

        node_a.lock().connections.insert(id_b.clone());
        node_b.lock().connections.insert(id_a.clone());

        let link = Entanglement {
            correlation_strength: 1.0,
            last_sync: now,
        };
        self.entanglements
            .entry(id_a.clone())
            .or_default()
            .insert(id_b.clone(), link.clone());
        self.entanglements
            .entry(id_b.clone())
            .or_default()
            .insert(id_a.clone(), link);

        info!(from = %id_a, to = %id_b, relation = %relation, "Agents entangled");
        Some(edge)
    }

    /// Remove both directed edge records between a and b and their connection.
    pub fn disentangle(&self, a: &str, b: &str) -> bool {
        let (id_a, id_b) = (AgentId::new(a), AgentId::new(b));
        let _membership = self.membership.lock();
        let forward = self.edges.remove(&(id_a.clone(), id_b.clone())).is_some();
        let backward = self.edges.remove(&(id_b.clone(), id_a.clone())).is_some();

        let mut linked = false;
        if let Some(n) = self.node(a) {
            linked |= n.lock().connections.remove(&id_b);
        }
        if let Some(n) = self.node(b) {
            linked |= n.lock().connections.remove(&id_a);
        }
        if let Some(mut index) = self.entanglements.get_mut(a) {
            index.remove(&id_b);
        }
        if let Some(mut index) = self.entanglements.get_mut(b) {
            index.remove(&id_a);
        }

        let removed = forward || backward || linked;
        if removed {
            info!(a = %id_a, b = %id_b, "Agents disentangled");
        }
        removed
    }

    /// Count one interaction on the edge between `from` and `to` (either direction).
    pub fn record_interaction(&self, from: &str, to: &str) -> bool {
        let (id_from, id_to) = (AgentId::new(from), AgentId::new(to));
        for key in [(id_from.clone(), id_to.clone()), (id_to, id_from)] {
            if let Some(mut edge) = self.edges.get_mut(&key) {
                edge.interactions += 1;
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Quantum state
    // ------------------------------------------------------------------

    /// Collapse the node onto `state`. No-op (false) for unknown agents.
    pub fn collapse(&self, id: &str, state: BehaviorState) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let mut guard = node.lock();
        guard
            .quantum
            .collapse(state, self.quantum.collapse_coherence_factor, Utc::now());
        debug!(agent = id, state = %state, coherence = guard.quantum.coherence, "Quantum state collapsed");
        true
    }

    /// Return the node to a uniform superposition over `states`.
    /// No-op (false) for unknown agents or an empty state list.
    pub fn restore_superposition(&self, id: &str, states: &[BehaviorState]) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let mut guard = node.lock();
        let restored = guard
            .quantum
            .restore(states, self.quantum.restore_coherence_boost);
        if restored {
            debug!(agent = id, states = ?states, coherence = guard.quantum.coherence, "Superposition restored");
        }
        restored
    }

    // ------------------------------------------------------------------
    // Energy
    // ------------------------------------------------------------------

    /// Grant up to `amount` from the pool. Returns what was actually granted.
    pub fn allocate_energy(&self, id: &str, amount: f64) -> f64 {
        let Some(node) = self.node(id) else {
            return 0.0;
        };
        let mut pool = self.pool.lock();
        if !self.nodes.contains_key(id) {
            return 0.0;
        }
        let agent = AgentId::new(id);
        let granted = pool.allocate(&agent, amount);
        node.lock().energy = pool.allocation(&agent);
        debug!(agent = id, granted, available = pool.available, "Energy allocated");
        granted
    }

    /// Move up to `amount` of energy between two agents.
    /// Returns false if either agent is unknown; nothing moves in that case.
    pub fn flow_energy(&self, from: &str, to: &str, amount: f64) -> bool {
        let (Some(src), Some(dst)) = (self.node(from), self.node(to)) else {
            return false;
        };
        let mut pool = self.pool.lock();
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return false;
        }
        let (id_from, id_to) = (AgentId::new(from), AgentId::new(to));
        let moved = pool.transfer(&id_from, &id_to, amount);
        src.lock().energy = pool.allocation(&id_from);
        dst.lock().energy = pool.allocation(&id_to);
        debug!(from, to, moved, "Energy flowed");
        true
    }

    pub fn energy_pool(&self) -> EnergyPool {
        self.pool.lock().clone()
    }

    // ------------------------------------------------------------------
    // Metrics & evolution
    // ------------------------------------------------------------------

    /// Fold a metrics update into the node, then try to evolve it.
    /// Returns true if the node evolved.
    pub fn update_metrics(&self, id: &str, update: &MetricsUpdate) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        node.lock().metrics.apply(
            update,
            self.evolution.metrics_ema_alpha,
            self.evolution.learned_increment,
        );
        self.try_evolve(id)
    }

    /// Advance the node one consciousness level if it has completed enough
    /// tasks at its current level with a high enough success and learning rate.
    ///
    /// The task gate counts only tasks finished since the last promotion, so
    /// every level needs `min_tasks` of its own rather than a running total.
    pub fn try_evolve(&self, id: &str) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let mut guard = node.lock();
        if !guard.consciousness.can_evolve() {
            return false;
        }
        let metrics = &guard.metrics;
        let tasks_at_level = metrics
            .task_count
            .saturating_sub(guard.consciousness.level_entry_tasks);
        let ready = tasks_at_level >= self.evolution.min_tasks
            && metrics.success_rate >= self.evolution.min_success_rate
            && metrics.learning_rate >= self.evolution.min_learning_rate;
        if !ready {
            return false;
        }

        let task_count = metrics.task_count;
        let from = guard.consciousness.advance(
            self.evolution.awareness_step,
            self.evolution.adaptability_step,
            task_count,
        );
        let to = guard.consciousness.current;
        self.registry.write().promote(from, to, &guard.id);
        info!(agent = id, from = %from, to = %to, "Agent consciousness evolved");
        true
    }

    pub fn consciousness_registry(&self) -> ConsciousnessRegistry {
        self.registry.read().clone()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.nodes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn get_node(&self, id: &str) -> Option<AgentNode> {
        self.node(id).map(|n| n.lock().clone())
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<Edge> {
        self.edges
            .get(&(AgentId::new(from), AgentId::new(to)))
            .map(|e| e.value().clone())
    }

    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self.edges.iter().map(|e| e.value().clone()).collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        edges
    }

    pub fn entanglement_count(&self, id: &str) -> usize {
        self.entanglements.get(id).map(|m| m.len()).unwrap_or(0)
    }

    pub fn agent_position(&self, id: &str) -> Option<AgentPosition> {
        let node = self.get_node(id)?;
        Some(AgentPosition {
            entanglements: self.entanglement_count(id),
            connections: node.connections.len(),
            id: node.id,
            node_type: node.node_type,
            consciousness: node.consciousness,
            energy: node.energy,
            metrics: node.metrics,
        })
    }

    /// Consistent read-only projection of the whole graph.
    pub fn snapshot(&self) -> TopologySnapshot {
        let pool = self.pool.lock();
        let arcs: Vec<Arc<Mutex<AgentNode>>> =
            self.nodes.iter().map(|e| e.value().clone()).collect();
        let mut nodes: Vec<NodeView> = arcs
            .iter()
            .map(|n| {
                let n = n.lock();
                NodeView {
                    id: n.id.clone(),
                    name: n.name.clone(),
                    phase: n.quantum.phase,
                    states: n.quantum.states.iter().copied().collect(),
                    coherence: n.quantum.coherence,
                    energy: n.energy,
                    consciousness: n.consciousness.current,
                    connections: n.connections.iter().cloned().collect(),
                }
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let energy = EnergyView {
            total: pool.total,
            available: pool.available,
            distributed: pool.distributed(),
        };
        drop(pool);

        let registry = self.registry.read();
        let consciousness = ConsciousnessLevel::ALL
            .into_iter()
            .map(|level| LevelView {
                level,
                description: level.description(),
                agent_count: registry.count(level),
            })
            .collect();

        TopologySnapshot {
            nodes,
            edges: self.edges(),
            energy,
            consciousness,
        }
    }

    /// Check energy conservation, distribution normalization and registry membership.
    ///
    /// Holds every node lock while reading the registry, so a promotion is
    /// seen either entirely or not at all.
    pub fn assert_invariants(&self) -> Result<()> {
        let _membership = self.membership.lock();
        let pool = self.pool.lock();
        if !pool.is_conserved() {
            return Err(Error::invariant(format!(
                "energy pool out of balance: available {} + allocated {} != total {}",
                pool.available,
                pool.allocated_sum(),
                pool.total
            )));
        }
        let mut arcs: Vec<(AgentId, Arc<Mutex<AgentNode>>)> = self
            .nodes
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        arcs.sort_by(|a, b| a.0.cmp(&b.0));
        let guards: Vec<_> = arcs.iter().map(|(_, arc)| arc.lock()).collect();

        let mut node_energy = 0.0;
        for n in &guards {
            node_energy += n.energy;
            if n.energy < -ENERGY_EPSILON {
                return Err(Error::invariant(format!("agent {} has negative energy", n.id)));
            }
            if n.quantum.states.is_empty() || !n.quantum.is_normalized() {
                return Err(Error::invariant(format!(
                    "agent {} distribution sums to {}",
                    n.id,
                    n.quantum.probability_sum()
                )));
            }
        }
        if (pool.available + node_energy - pool.total).abs() > ENERGY_EPSILON {
            return Err(Error::invariant(format!(
                "node energy {} + available {} != total {}",
                node_energy, pool.available, pool.total
            )));
        }

        let registry = self.registry.read();
        for n in &guards {
            let registered = registry.level_of(&n.id);
            if registered != Some(n.consciousness.current) {
                return Err(Error::invariant(format!(
                    "agent {} registered at {:?}, node says {}",
                    n.id, registered, n.consciousness.current
                )));
            }
        }
        Ok(())
    }
}

/// Weighted trait sum, clamped to [0, 1].
pub fn awareness_from_traits(traits: &HashMap<String, f64>) -> f64 {
    AWARENESS_WEIGHTS
        .iter()
        .map(|(name, weight)| traits.get(*name).copied().unwrap_or(0.0) * weight)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}
