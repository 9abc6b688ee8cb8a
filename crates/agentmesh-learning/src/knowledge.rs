//! Knowledge distilled from strong patterns

use crate::memory::MemoryStore;
use crate::observation::ObservationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeData {
    pub insight: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Knowledge {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    /// Strength of the source pattern when it was learned.
    pub confidence: f64,
    pub occurrences: u64,
    pub created: DateTime<Utc>,
    pub data: KnowledgeData,
}

/// Fixed insight/recommendation pair for each observation kind.
pub fn knowledge_for(kind: ObservationKind) -> KnowledgeData {
    let (insight, recommendation) = match kind {
        ObservationKind::UserMessage => ("Users frequently ask about this", "Prepare quick response"),
        ObservationKind::AgentAction => ("This action is common", "Optimize for speed"),
        ObservationKind::CodeChange => ("This file changes often", "Cover it with tests"),
        ObservationKind::WorkflowExecution => {
            ("This workflow runs repeatedly", "Cache or parallelize its steps")
        }
        ObservationKind::Error => ("This error recurs", "Add prevention logic"),
    };
    KnowledgeData {
        insight: insight.to_string(),
        recommendation: recommendation.to_string(),
    }
}

/// Knowledge items plus the semantic index (kind → knowledge ids).
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    items: BTreeMap<String, Knowledge>,
    semantic: BTreeMap<ObservationKind, Vec<String>>,
}

impl KnowledgeBase {
    pub fn insert(&mut self, knowledge: Knowledge) {
        self.semantic
            .entry(knowledge.kind)
            .or_default()
            .push(knowledge.id.clone());
        self.items.insert(knowledge.id.clone(), knowledge);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of kinds with indexed knowledge.
    pub fn semantic_len(&self) -> usize {
        self.semantic.len()
    }

    pub fn indexed(&self, kind: ObservationKind) -> &[String] {
        self.semantic.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: &str) -> Option<&Knowledge> {
        self.items.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Knowledge> {
        self.items.values()
    }
}

impl MemoryStore {
    /// Turn a pattern into knowledge if it is strong enough.
    /// Returns None for unknown or weak patterns.
    pub fn learn(&self, pattern_id: &str) -> Option<Knowledge> {
        self.learn_pattern(pattern_id, false)
    }

    /// Learn every not-yet-learned pattern stronger than `min_strength`.
    /// A pattern learned concurrently by another caller is skipped.
    pub fn learn_pending(&self, min_strength: f64) -> Vec<Knowledge> {
        self.unlearned_patterns(min_strength)
            .into_iter()
            .filter(|p| p.strength > min_strength)
            .filter_map(|p| self.learn_pattern(&p.id, true))
            .collect()
    }

    fn learn_pattern(&self, pattern_id: &str, only_unlearned: bool) -> Option<Knowledge> {
        let now = Utc::now();
        let knowledge = {
            let mut long_term = self.long_term.write();
            let pattern = long_term.get_mut(pattern_id)?;
            if only_unlearned && pattern.learned {
                return None;
            }
            if pattern.strength < self.learning.confidence_threshold {
                debug!(
                    pattern = pattern_id,
                    strength = pattern.strength,
                    "Pattern below confidence threshold"
                );
                return None;
            }
            pattern.learned = true;
            Knowledge {
                id: format!("knowledge-{}", Uuid::new_v4()),
                kind: pattern.kind,
                confidence: pattern.strength,
                occurrences: pattern.occurrences,
                created: now,
                data: knowledge_for(pattern.kind),
            }
        };

        self.knowledge.write().insert(knowledge.clone());
        self.metrics.lock().last_learned = Some(now);
        info!(
            id = %knowledge.id,
            kind = %knowledge.kind,
            confidence = knowledge.confidence,
            "Knowledge learned"
        );
        Some(knowledge)
    }

    /// All knowledge, optionally only one kind, oldest first.
    pub fn get_knowledge(&self, kind: Option<ObservationKind>) -> Vec<Knowledge> {
        let mut items: Vec<Knowledge> = self
            .knowledge
            .read()
            .all()
            .filter(|k| kind.map_or(true, |want| k.kind == want))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        items
    }
}
