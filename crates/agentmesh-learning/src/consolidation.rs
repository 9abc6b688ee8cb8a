//! Consolidation - promote recurring short-term observations to long-term
//! patterns, then decay and evict
//!
//! A pass works on a snapshot of short-term memory. Observations recorded
//! while the pass runs stay unprocessed until the next one.

use crate::memory::MemoryStore;
use crate::observation::{Observation, ObservationKind};
use crate::similarity::similarity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermPattern {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    /// Representative observation.
    pub data: Observation,
    pub strength: f64,
    pub occurrences: u64,
    pub created: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub learned: bool,
}

/// What one consolidation pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    pub processed: usize,
    pub strengthened: usize,
    pub created: Vec<String>,
    pub evicted: Vec<String>,
}

/// Multiplier for a pattern last seen `age_days` ago.
pub fn decay_multiplier(decay_factor: f64, age_days: f64) -> f64 {
    decay_factor.powf(age_days.max(0.0))
}

fn age_in_days(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - since).num_milliseconds() as f64 / MILLIS_PER_DAY
}

impl MemoryStore {
    pub fn consolidate(&self) -> ConsolidationReport {
        self.consolidate_at(Utc::now())
    }

    pub fn consolidate_at(&self, now: DateTime<Utc>) -> ConsolidationReport {
        let _pass = self.consolidating.lock();
        let snapshot = self.short_term();
        let mut done: BTreeSet<u64> = snapshot
            .iter()
            .filter(|r| r.processed)
            .map(|r| r.id)
            .collect();
        let mut newly_processed = Vec::new();
        let mut report = ConsolidationReport::default();

        {
            let mut long_term = self.long_term.write();
            for record in &snapshot {
                if !done.insert(record.id) {
                    continue;
                }
                newly_processed.push(record.id);
                let kind = record.observation.kind();

                let matched = long_term.values_mut().find(|p| {
                    p.kind == kind
                        && similarity(&record.observation, &p.data) > self.learning.match_similarity
                });
                if let Some(pattern) = matched {
                    pattern.strength += self.learning.learning_rate;
                    pattern.occurrences += 1;
                    pattern.last_seen = now;
                    report.strengthened += 1;
                    continue;
                }

                let cluster: Vec<u64> = snapshot
                    .iter()
                    .filter(|other| {
                        similarity(&record.observation, &other.observation)
                            > self.learning.cluster_similarity
                    })
                    .map(|other| other.id)
                    .collect();
                if cluster.len() < self.learning.min_occurrences {
                    continue;
                }

                for member in cluster {
                    if done.insert(member) {
                        newly_processed.push(member);
                    }
                }
                let id = format!("pattern-{}", Uuid::new_v4());
                long_term.insert(
                    id.clone(),
                    LongTermPattern {
                        id: id.clone(),
                        kind,
                        data: record.observation.clone(),
                        strength: 1.0,
                        occurrences: 1,
                        created: now,
                        last_seen: now,
                        learned: false,
                    },
                );
                info!(pattern = %id, kind = %kind, "New pattern created");
                report.created.push(id);
            }
        }
        report.processed = newly_processed.len();

        {
            let mut short_term = self.short_term.lock();
            for id in &newly_processed {
                if let Some(record) = short_term.get_mut(id) {
                    record.processed = true;
                }
            }
        }
        if !report.created.is_empty() {
            self.metrics.lock().patterns_detected += report.created.len() as u64;
        }

        report.evicted = self.apply_decay_at(now);
        debug!(
            processed = report.processed,
            strengthened = report.strengthened,
            created = report.created.len(),
            evicted = report.evicted.len(),
            "Memory consolidated"
        );
        report
    }

    /// Decay every long-term pattern by its age and drop the weak ones.
    /// Returns the evicted pattern ids.
    pub fn apply_decay_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut long_term = self.long_term.write();
        for pattern in long_term.values_mut() {
            let age = age_in_days(pattern.last_seen, now);
            pattern.strength *= decay_multiplier(self.learning.decay_factor, age);
        }
        let evicted: Vec<String> = long_term
            .values()
            .filter(|p| p.strength < self.learning.eviction_threshold)
            .map(|p| p.id.clone())
            .collect();
        for id in &evicted {
            long_term.remove(id);
            debug!(pattern = %id, "Weak pattern evicted");
        }
        evicted
    }

    /// Patterns not yet learned with at least `min_strength`.
    pub fn unlearned_patterns(&self, min_strength: f64) -> Vec<LongTermPattern> {
        self.long_term
            .read()
            .values()
            .filter(|p| !p.learned && p.strength >= min_strength)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_multiplier_matches_daily_factor() {
        assert!((decay_multiplier(0.95, 30.0) - 0.2146).abs() < 1e-3);
        assert!(decay_multiplier(0.95, 46.0) < 0.1);
        assert_eq!(decay_multiplier(0.95, 0.0), 1.0);
        assert_eq!(decay_multiplier(0.95, -3.0), 1.0);
    }

    #[test]
    fn age_counts_fractional_days() {
        let now = Utc::now();
        let half = now - chrono::Duration::hours(12);
        assert!((age_in_days(half, now) - 0.5).abs() < 1e-9);
    }
}
