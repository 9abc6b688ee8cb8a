//! agentmesh topology - agents as graph nodes with quantum-inspired state
//!
//! - Quantum state: superposition over behavioral states, collapsed while acting
//! - Energy: a fixed pool allocated to and flowed between agents
//! - Consciousness: five ordered awareness tiers, advanced by performance thresholds
//! - Entanglement: weighted coordination edges between agents

pub mod consciousness;
pub mod energy;
pub mod graph;
pub mod node;
pub mod quantum;
pub mod snapshot;

pub use consciousness::{ConsciousnessLevel, ConsciousnessRegistry, ConsciousnessState};
pub use energy::EnergyPool;
pub use graph::{Edge, Entanglement, RelationType, TopologyGraph};
pub use node::{AgentNode, MetricsUpdate, NodeMetrics};
pub use quantum::{BehaviorState, QuantumPhase, QuantumState};
pub use snapshot::{AgentPosition, EnergyView, LevelView, NodeView, TopologySnapshot};
