//! Tests for agentmesh-topology: registration, quantum state, energy, evolution

use agentmesh_core::{AgentDescriptor, Error, MeshConfig};
use agentmesh_topology::*;
use proptest::prelude::*;
use std::sync::Arc;

fn graph_with(agents: &[&str]) -> TopologyGraph {
    let graph = TopologyGraph::default();
    for id in agents {
        graph
            .register_agent(&AgentDescriptor::new(*id, id.to_uppercase()))
            .unwrap();
    }
    graph
}

fn fast_evolution() -> MeshConfig {
    let mut config = MeshConfig::default();
    config.evolution.min_tasks = 5;
    config.evolution.min_learning_rate = 0.1;
    config
}

// ===========================================================================
// Registration
// ===========================================================================

#[test]
fn register_grants_initial_energy_and_idle_superposition() {
    let graph = graph_with(&["a"]);
    let node = graph.get_node("a").unwrap();
    assert_eq!(node.energy, 100.0);
    assert_eq!(node.quantum.phase, QuantumPhase::Superposition);
    assert_eq!(node.quantum.probability(BehaviorState::Idle), 1.0);
    assert_eq!(node.quantum.coherence, 1.0);
    assert_eq!(node.consciousness.current, ConsciousnessLevel::L1);
    assert_eq!(node.consciousness.evolving_to, ConsciousnessLevel::L2);
    assert_eq!(node.metrics.task_count, 0);
    assert_eq!(graph.energy_pool().available, 900.0);
    graph.assert_invariants().unwrap();
}

#[test]
fn register_duplicate_is_rejected() {
    let graph = graph_with(&["a"]);
    let err = graph
        .register_agent(&AgentDescriptor::new("a", "again"))
        .unwrap_err();
    assert!(matches!(err, Error::AgentAlreadyRegistered(ref id) if id == "a"));
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.energy_pool().available, 900.0);
}

#[test]
fn initial_level_follows_role_and_capabilities() {
    let graph = TopologyGraph::default();
    let lead = graph
        .register_agent(&AgentDescriptor::new("lead", "Lead").with_role("Team Coordinator"))
        .unwrap();
    assert_eq!(lead.consciousness.current, ConsciousnessLevel::L3);

    let wide = graph
        .register_agent(
            &AgentDescriptor::new("wide", "Wide")
                .with_capabilities(["a", "b", "c", "d", "e", "f"]),
        )
        .unwrap();
    assert_eq!(wide.consciousness.current, ConsciousnessLevel::L2);

    let narrow = graph
        .register_agent(
            &AgentDescriptor::new("narrow", "Narrow").with_capabilities(["a", "b", "c", "d", "e"]),
        )
        .unwrap();
    assert_eq!(narrow.consciousness.current, ConsciousnessLevel::L1);

    let registry = graph.consciousness_registry();
    assert_eq!(registry.count(ConsciousnessLevel::L3), 1);
    assert_eq!(registry.count(ConsciousnessLevel::L2), 1);
    assert_eq!(registry.count(ConsciousnessLevel::L1), 1);
}

#[test]
fn awareness_derives_from_traits() {
    let graph = TopologyGraph::default();
    let node = graph
        .register_agent(
            &AgentDescriptor::new("a", "A")
                .with_trait("curious", 1.0)
                .with_trait("analytical", 0.5),
        )
        .unwrap();
    assert!((node.consciousness.awareness - 0.4).abs() < 1e-12);
    assert_eq!(node.consciousness.adaptability, 0.5);
}

#[test]
fn pool_exhaustion_clamps_new_agents_to_zero() {
    let ids: Vec<String> = (0..11).map(|i| format!("agent-{}", i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let graph = graph_with(&refs);
    assert_eq!(graph.energy_pool().available, 0.0);
    assert_eq!(graph.get_node("agent-10").unwrap().energy, 0.0);
    graph.assert_invariants().unwrap();
}

#[test]
fn deregister_releases_energy_and_edges() {
    let graph = graph_with(&["a", "b", "c"]);
    graph.entangle("a", "b", RelationType::Coordination).unwrap();
    graph.entangle("c", "a", RelationType::Learning).unwrap();

    let removed = graph.deregister_agent("a").unwrap();
    assert_eq!(removed.id.as_str(), "a");
    assert!(!graph.contains("a"));
    assert!(graph.edges().is_empty());
    assert!(graph.get_node("b").unwrap().connections.is_empty());
    assert_eq!(graph.entanglement_count("c"), 0);
    assert_eq!(graph.energy_pool().available, 800.0);
    assert_eq!(graph.consciousness_registry().total(), 2);
    graph.assert_invariants().unwrap();

    assert!(graph.deregister_agent("a").is_none());
}

// ===========================================================================
// Entanglement
// ===========================================================================

#[test]
fn entangle_connects_both_sides() {
    let graph = graph_with(&["a", "b"]);
    let edge = graph.entangle("a", "b", RelationType::Delegation).unwrap();
    assert_eq!(edge.strength, 1.0);
    assert_eq!(edge.bandwidth, 100.0);
    assert_eq!(edge.latency, 0.0);
    assert_eq!(edge.interactions, 0);

    assert!(graph.get_node("a").unwrap().connections.contains("b"));
    assert!(graph.get_node("b").unwrap().connections.contains("a"));
    assert_eq!(graph.entanglement_count("a"), 1);
    assert_eq!(graph.entanglement_count("b"), 1);
    assert!(graph.edge("a", "b").is_some());
    assert!(graph.edge("b", "a").is_none());
}

#[test]
fn entangle_twice_overwrites_edge() {
    let graph = graph_with(&["a", "b"]);
    graph.entangle("a", "b", RelationType::Coordination).unwrap();
    assert!(graph.record_interaction("b", "a"));
    graph.entangle("a", "b", RelationType::Learning).unwrap();

    let edges = graph.edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].relation, RelationType::Learning);
    assert_eq!(edges[0].interactions, 0);
    assert_eq!(graph.get_node("a").unwrap().connections.len(), 1);
}

#[test]
fn entangle_rejects_unknown_or_self() {
    let graph = graph_with(&["a"]);
    assert!(graph.entangle("a", "ghost", RelationType::Coordination).is_none());
    assert!(graph.entangle("a", "a", RelationType::Coordination).is_none());
    assert!(graph.edges().is_empty());
}

#[test]
fn disentangle_removes_connection() {
    let graph = graph_with(&["a", "b"]);
    graph.entangle("a", "b", RelationType::Coordination).unwrap();
    assert!(graph.disentangle("b", "a"));
    assert!(graph.edges().is_empty());
    assert!(graph.get_node("a").unwrap().connections.is_empty());
    assert_eq!(graph.entanglement_count("b"), 0);
    assert!(!graph.disentangle("a", "b"));
}

#[test]
fn record_interaction_counts() {
    let graph = graph_with(&["a", "b"]);
    assert!(!graph.record_interaction("a", "b"));
    graph.entangle("a", "b", RelationType::Coordination).unwrap();
    graph.record_interaction("a", "b");
    graph.record_interaction("b", "a");
    assert_eq!(graph.edge("a", "b").unwrap().interactions, 2);
}

// ===========================================================================
// Quantum state
// ===========================================================================

#[test]
fn collapse_then_restore_round_trips_coherence() {
    let graph = graph_with(&["a"]);
    assert!(graph.collapse("a", BehaviorState::Thinking));
    let node = graph.get_node("a").unwrap();
    assert!(node.quantum.is_collapsed());
    assert_eq!(node.quantum.probability(BehaviorState::Thinking), 1.0);
    assert!((node.quantum.coherence - 0.9).abs() < 1e-12);

    assert!(graph.restore_superposition("a", &[BehaviorState::Idle, BehaviorState::Listening]));
    let node = graph.get_node("a").unwrap();
    assert_eq!(node.quantum.phase, QuantumPhase::Superposition);
    assert_eq!(node.quantum.probability(BehaviorState::Idle), 0.5);
    assert_eq!(node.quantum.probability(BehaviorState::Listening), 0.5);
    assert_eq!(node.quantum.probability(BehaviorState::Thinking), 0.0);
    assert_eq!(node.quantum.coherence, 1.0);
}

#[test]
fn repeated_collapse_decays_coherence() {
    let graph = graph_with(&["a"]);
    for _ in 0..3 {
        graph.collapse("a", BehaviorState::Acting);
    }
    let coherence = graph.get_node("a").unwrap().quantum.coherence;
    assert!((coherence - 0.729).abs() < 1e-9);
}

#[test]
fn restore_with_empty_states_is_noop() {
    let graph = graph_with(&["a"]);
    graph.collapse("a", BehaviorState::Acting);
    assert!(!graph.restore_superposition("a", &[]));
    assert!(graph.get_node("a").unwrap().quantum.is_collapsed());
}

#[test]
fn quantum_ops_on_unknown_agent_are_noops() {
    let graph = TopologyGraph::default();
    assert!(!graph.collapse("ghost", BehaviorState::Acting));
    assert!(!graph.restore_superposition("ghost", &[BehaviorState::Idle]));
    assert!(graph.agent_position("ghost").is_none());
}

#[test]
fn working_maps_to_acting() {
    let states = quantum::parse_states(&["working", "IDLE", "dreaming"]);
    assert_eq!(states, vec![BehaviorState::Acting, BehaviorState::Idle]);
}

// ===========================================================================
// Energy
// ===========================================================================

#[test]
fn flow_clamps_to_sender_energy() {
    let graph = graph_with(&["a", "b"]);
    assert!(graph.flow_energy("a", "b", 250.0));
    assert_eq!(graph.get_node("a").unwrap().energy, 0.0);
    assert_eq!(graph.get_node("b").unwrap().energy, 200.0);
    graph.assert_invariants().unwrap();
}

#[test]
fn flow_with_unknown_agent_moves_nothing() {
    let graph = graph_with(&["a"]);
    assert!(!graph.flow_energy("a", "ghost", 10.0));
    assert!(!graph.flow_energy("ghost", "a", 10.0));
    assert_eq!(graph.get_node("a").unwrap().energy, 100.0);
}

#[test]
fn allocate_tops_up_from_pool() {
    let graph = graph_with(&["a"]);
    assert_eq!(graph.allocate_energy("a", 50.0), 50.0);
    assert_eq!(graph.get_node("a").unwrap().energy, 150.0);
    assert_eq!(graph.allocate_energy("a", 5000.0), 850.0);
    assert_eq!(graph.energy_pool().available, 0.0);
    assert_eq!(graph.allocate_energy("ghost", 10.0), 0.0);
    graph.assert_invariants().unwrap();
}

proptest! {
    #[test]
    fn energy_is_conserved_under_random_ops(
        ops in prop::collection::vec((0usize..4, 0usize..4, 0.0f64..300.0, any::<bool>()), 0..60)
    ) {
        let names = ["a", "b", "c", "d"];
        let graph = graph_with(&names);
        for (i, j, amount, flow) in ops {
            if flow {
                graph.flow_energy(names[i], names[j], amount);
            } else {
                graph.allocate_energy(names[i], amount);
            }
            prop_assert!(graph.assert_invariants().is_ok());
        }
        let total: f64 = names.iter().map(|n| graph.get_node(n).unwrap().energy).sum();
        let pool = graph.energy_pool();
        prop_assert!((pool.available + total - pool.total).abs() < 1e-6);
    }

    #[test]
    fn distribution_stays_normalized(
        states in prop::collection::vec(0usize..5, 0..6),
        collapse_to in 0usize..5,
    ) {
        let graph = graph_with(&["a"]);
        graph.collapse("a", BehaviorState::ALL[collapse_to]);
        let chosen: Vec<BehaviorState> = states.iter().map(|i| BehaviorState::ALL[*i]).collect();
        graph.restore_superposition("a", &chosen);
        let node = graph.get_node("a").unwrap();
        prop_assert!(node.quantum.is_normalized());
        prop_assert!(!node.quantum.states.is_empty());
    }
}

// ===========================================================================
// Metrics & evolution
// ===========================================================================

#[test]
fn first_evolution_needs_hundred_tasks() {
    let graph = graph_with(&["a"]);
    let update = MetricsUpdate::completed(true, 10.0).learned(true);
    for _ in 0..99 {
        assert!(!graph.update_metrics("a", &update));
    }
    assert!(graph.update_metrics("a", &update));

    let node = graph.get_node("a").unwrap();
    assert_eq!(node.consciousness.current, ConsciousnessLevel::L2);
    assert_eq!(node.consciousness.evolving_to, ConsciousnessLevel::L3);
    assert!((node.consciousness.awareness - 0.1).abs() < 1e-12);
    assert!((node.consciousness.adaptability - 0.6).abs() < 1e-12);
    let registry = graph.consciousness_registry();
    assert_eq!(registry.count(ConsciousnessLevel::L1), 0);
    assert_eq!(registry.members(ConsciousnessLevel::L2)[0].as_str(), "a");
}

#[test]
fn evolution_blocked_by_low_learning_rate() {
    let graph = graph_with(&["a"]);
    let update = MetricsUpdate::completed(true, 10.0);
    for _ in 0..150 {
        assert!(!graph.update_metrics("a", &update));
    }
    assert_eq!(graph.get_node("a").unwrap().consciousness.current, ConsciousnessLevel::L1);
}

#[test]
fn evolution_fires_once_per_level_and_stops_at_l5() {
    let graph = TopologyGraph::new(&fast_evolution());
    graph.register_agent(&AgentDescriptor::new("a", "A")).unwrap();
    let update = MetricsUpdate::completed(true, 1.0);

    let mut evolved_at = Vec::new();
    for task in 1..=40u64 {
        if graph.update_metrics("a", &update) {
            evolved_at.push(task);
        }
    }
    assert_eq!(evolved_at, vec![5, 10, 15, 20]);

    let node = graph.get_node("a").unwrap();
    assert_eq!(node.consciousness.current, ConsciousnessLevel::L5);
    assert!(!node.consciousness.can_evolve());
    assert!(!graph.try_evolve("a"));
    graph.assert_invariants().unwrap();
}

#[test]
fn failures_pull_success_rate_down() {
    let graph = graph_with(&["a"]);
    graph.update_metrics("a", &MetricsUpdate::failed());
    let metrics = graph.get_node("a").unwrap().metrics;
    assert_eq!(metrics.task_count, 0);
    assert!((metrics.success_rate - 0.9).abs() < 1e-12);
}

// ===========================================================================
// Snapshot & position
// ===========================================================================

#[test]
fn snapshot_reports_nodes_edges_and_levels() {
    let graph = graph_with(&["b", "a"]);
    graph.entangle("a", "b", RelationType::Coordination).unwrap();
    graph.collapse("b", BehaviorState::Acting);

    let snap = graph.snapshot();
    assert_eq!(snap.nodes.len(), 2);
    assert_eq!(snap.nodes[0].id.as_str(), "a");
    assert_eq!(snap.edges.len(), 1);
    assert_eq!(snap.energy.total, 1000.0);
    assert_eq!(snap.energy.available, 800.0);
    assert_eq!(snap.energy.distributed, 200.0);
    assert_eq!(snap.consciousness.len(), 5);
    assert_eq!(snap.consciousness[0].agent_count, 2);
    assert_eq!(snap.node("b").unwrap().phase, QuantumPhase::Collapsed);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["edges"][0]["type"], "coordination");
    assert_eq!(json["nodes"][1]["phase"], "collapsed");
}

#[test]
fn agent_position_counts_links() {
    let graph = graph_with(&["a", "b", "c"]);
    graph.entangle("a", "b", RelationType::Coordination).unwrap();
    graph.entangle("a", "c", RelationType::Delegation).unwrap();
    let pos = graph.agent_position("a").unwrap();
    assert_eq!(pos.connections, 2);
    assert_eq!(pos.entanglements, 2);
    assert_eq!(pos.energy, 100.0);
    assert_eq!(pos.consciousness.current, ConsciousnessLevel::L1);
}

// ===========================================================================
// Concurrency
// ===========================================================================

#[test]
fn concurrent_mutations_keep_invariants() {
    let names: Vec<String> = (0..8).map(|i| format!("agent-{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let graph = Arc::new(graph_with(&refs));

    std::thread::scope(|scope| {
        for t in 0..8usize {
            let graph = Arc::clone(&graph);
            let names = &names;
            scope.spawn(move || {
                for i in 0..200usize {
                    let from = &names[(t + i) % 8];
                    let to = &names[(t + i + 3) % 8];
                    graph.flow_energy(from, to, (i % 17) as f64);
                    graph.collapse(from, BehaviorState::Acting);
                    graph.update_metrics(from, &MetricsUpdate::completed(i % 5 != 0, 3.0));
                    graph.restore_superposition(from, &[BehaviorState::Idle]);
                    if i % 50 == 0 {
                        graph.entangle(from, to, RelationType::Coordination);
                    }
                }
            });
        }
    });

    graph.assert_invariants().unwrap();
    let total_tasks: u64 = names
        .iter()
        .map(|n| graph.get_node(n).unwrap().metrics.task_count)
        .sum();
    assert_eq!(total_tasks, 8 * 200);
}

#[test]
fn invariants_hold_while_agents_register_and_evolve() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let mut config = MeshConfig::default();
    config.evolution.min_tasks = 1;
    config.evolution.min_learning_rate = 0.0;
    config.evolution.min_success_rate = 0.0;
    config.energy.pool_total = 100_000.0;
    let graph = TopologyGraph::new(&config);
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let checker = scope.spawn(|| {
            let mut checks = 0u64;
            while !done.load(Ordering::Acquire) {
                graph.assert_invariants().unwrap();
                checks += 1;
            }
            checks
        });

        let workers: Vec<_> = (0..4usize)
            .map(|t| {
                let graph = &graph;
                scope.spawn(move || {
                    for i in 0..100usize {
                        let id = format!("agent-{}-{}", t, i);
                        graph
                            .register_agent(&AgentDescriptor::new(id.as_str(), "Worker"))
                            .unwrap();
                        for _ in 0..3 {
                            graph.update_metrics(&id, &MetricsUpdate::completed(true, 1.0));
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(checker.join().unwrap() > 0);
    });

    graph.assert_invariants().unwrap();
    assert_eq!(graph.len(), 400);
    let registry = graph.consciousness_registry();
    let evolved = graph
        .agent_ids()
        .iter()
        .filter(|id| registry.level_of(id) != Some(ConsciousnessLevel::L1))
        .count();
    assert_eq!(evolved, 400);
}

#[test]
fn entangle_racing_deregister_leaves_no_dangling_edges() {
    let spokes: Vec<String> = (0..64).map(|i| format!("spoke-{}", i)).collect();
    let mut all: Vec<&str> = spokes.iter().map(String::as_str).collect();
    all.push("hub");
    let graph = graph_with(&all);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for spoke in &spokes {
                graph.entangle("hub", spoke, RelationType::Delegation);
            }
        });
        scope.spawn(|| {
            for spoke in spokes.iter().rev() {
                graph.deregister_agent(spoke);
            }
        });
    });

    assert_eq!(graph.len(), 1);
    assert!(graph.edges().is_empty());
    assert!(graph.get_node("hub").unwrap().connections.is_empty());
    assert_eq!(graph.entanglement_count("hub"), 0);
    graph.assert_invariants().unwrap();
}
