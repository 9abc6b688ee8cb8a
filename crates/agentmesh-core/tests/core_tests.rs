//! Tests for agentmesh-core: ids, descriptors, errors, configuration

use agentmesh_core::*;
use std::io::Write;

// ===========================================================================
// AgentId
// ===========================================================================

#[test]
fn agent_id_new_and_display() {
    let id = AgentId::new("planner-1");
    assert_eq!(id.as_str(), "planner-1");
    assert_eq!(format!("{}", id), "planner-1");
}

#[test]
fn agent_id_equality_and_hash() {
    use std::collections::HashSet;
    let a = AgentId::new("same");
    let b: AgentId = "same".into();
    let c: AgentId = String::from("other").into();
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut set = HashSet::new();
    set.insert(a.clone());
    assert!(set.contains(&b));
    assert!(set.contains("same"));
    assert!(!set.contains(&c));
}

#[test]
fn agent_id_serializes_as_plain_string() {
    let id = AgentId::new("scout");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"scout\"");
    let back: AgentId = serde_json::from_str("\"scout\"").unwrap();
    assert_eq!(back, id);
}

// ===========================================================================
// Descriptors
// ===========================================================================

#[test]
fn descriptor_builder_sets_fields() {
    let d = AgentDescriptor::new("a1", "Amrikyy")
        .with_type("travel")
        .with_capabilities(["search", "book"])
        .with_role("Lead coordinator")
        .with_trait("curious", 0.8);
    assert_eq!(d.agent_type, "travel");
    assert_eq!(d.capabilities, vec!["search", "book"]);
    assert_eq!(d.role.as_deref(), Some("Lead coordinator"));
    assert_eq!(d.traits.get("curious"), Some(&0.8));
}

#[test]
fn descriptor_deserializes_with_defaults() {
    let d: AgentDescriptor = serde_json::from_str(r#"{"id":"x","name":"X"}"#).unwrap();
    assert_eq!(d.agent_type, "agent");
    assert!(d.capabilities.is_empty());
    assert!(d.role.is_none());
}

#[test]
fn task_descriptor_uses_type_key() {
    let t = TaskDescriptor::new("search").with_payload(serde_json::json!({"q": "kyoto"}));
    let json = serde_json::to_value(&t).unwrap();
    assert_eq!(json["type"], "search");
    assert_eq!(json["payload"]["q"], "kyoto");
}

#[test]
fn task_outcome_constructors() {
    assert!(TaskOutcome::success("ok").success);
    let bad = TaskOutcome::unsuccessful("nope");
    assert!(!bad.success);
    assert_eq!(bad.output, "nope");
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn error_display_messages() {
    let e = Error::task_failed("a1", "timeout");
    assert_eq!(e.to_string(), "task failed: a1 - timeout");
    assert_eq!(e.kind(), "TaskFailed");
    assert_eq!(Error::AgentNotFound("ghost".into()).to_string(), "agent not found: ghost");
    assert_eq!(Error::invariant("sum").to_string(), "invariant violation: sum");
}

#[test]
fn error_from_json() {
    let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
    let e: Error = err.into();
    assert_eq!(e.kind(), "Json");
}

// ===========================================================================
// MeshConfig
// ===========================================================================

#[test]
fn config_defaults_match_documented_constants() {
    let c = MeshConfig::default();
    assert_eq!(c.energy.pool_total, 1000.0);
    assert_eq!(c.energy.initial_allocation, 100.0);
    assert_eq!(c.evolution.min_tasks, 100);
    assert_eq!(c.memory.short_term_capacity, 100);
    assert_eq!(c.memory.episodic_capacity, 1000);
    assert_eq!(c.learning.min_occurrences, 3);
    assert_eq!(c.learning.decay_factor, 0.95);
    assert_eq!(c.coordination.success_states, vec!["idle", "listening"]);
}

#[test]
fn config_partial_toml_keeps_other_defaults() {
    let c = MeshConfig::from_toml_str("[learning]\nlearning_rate = 0.25\n").unwrap();
    assert_eq!(c.learning.learning_rate, 0.25);
    assert_eq!(c.learning.min_occurrences, 3);
    assert_eq!(c.energy.pool_total, 1000.0);
}

#[test]
fn config_toml_roundtrip() {
    let c = MeshConfig::default();
    let text = c.to_toml();
    let back = MeshConfig::from_toml_str(&text).unwrap();
    assert_eq!(back.learning.confidence_threshold, c.learning.confidence_threshold);
    assert_eq!(back.coordination.failure_states, c.coordination.failure_states);
}

#[test]
fn config_rejects_invalid_decay() {
    let err = MeshConfig::from_toml_str("[learning]\ndecay_factor = 1.5\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn config_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let c = MeshConfig::load(&dir.path().join("absent.toml"));
    assert_eq!(c.energy.pool_total, 1000.0);
}

#[test]
fn config_load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[energy]\npool_total = 250.0").unwrap();
    let c = MeshConfig::load(file.path());
    assert_eq!(c.energy.pool_total, 250.0);
}

#[test]
fn config_load_invalid_file_falls_back() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is = = not toml").unwrap();
    let c = MeshConfig::load(file.path());
    assert_eq!(c.energy.pool_total, 1000.0);
}
