//! Per-variant similarity
//!
//! Each observation variant projects onto a fixed feature list. Similarity is
//! the fraction of equal features; observations of different kinds score 0.

use crate::detectors::classify_query;
use crate::observation::Observation;

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Absent,
    Text(String),
    Flag(bool),
    /// Order of magnitude of a positive continuous value.
    Magnitude(i32),
}

impl Feature {
    fn text(value: Option<&str>) -> Self {
        value
            .map(|v| Feature::Text(v.trim().to_lowercase()))
            .unwrap_or(Feature::Absent)
    }

    fn flag(value: Option<bool>) -> Self {
        value.map(Feature::Flag).unwrap_or(Feature::Absent)
    }

    fn magnitude(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() && v > 0.0 => Feature::Magnitude(v.log10().floor() as i32),
            Some(v) if v.is_finite() => Feature::Magnitude(i32::MIN),
            _ => Feature::Absent,
        }
    }
}

pub fn features(observation: &Observation) -> Vec<Feature> {
    match observation {
        Observation::UserMessage(m) => vec![
            Feature::text(m.user_id.as_deref()),
            m.message
                .as_deref()
                .map(|msg| Feature::Text(classify_query(msg).to_string()))
                .unwrap_or(Feature::Absent),
            Feature::text(m.destination.as_deref()),
            Feature::text(m.language.as_deref()),
        ],
        Observation::AgentAction(a) => vec![
            Feature::text(a.agent_id.as_deref()),
            Feature::text(a.action.as_deref()),
            Feature::flag(a.success),
            Feature::magnitude(a.latency_ms),
        ],
        Observation::CodeChange(c) => vec![
            Feature::text(c.file.as_deref()),
            Feature::text(c.change_type.as_deref()),
        ],
        Observation::WorkflowExecution(w) => {
            let route = if w.steps.is_empty() {
                Feature::Absent
            } else {
                Feature::Text(
                    w.steps
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(">"),
                )
            };
            vec![
                Feature::text(w.workflow_id.as_deref()),
                Feature::flag(w.success),
                Feature::magnitude(w.duration_ms),
                route,
            ]
        }
        Observation::Error(e) => vec![
            Feature::text(e.error_type.as_deref()),
            Feature::text(e.message.as_deref()),
            Feature::text(e.solution.as_deref()),
            Feature::text(e.agent_id.as_deref()),
        ],
    }
}

/// Fraction of matching features, in [0, 1].
pub fn similarity(a: &Observation, b: &Observation) -> f64 {
    if a.kind() != b.kind() {
        return 0.0;
    }
    let (fa, fb) = (features(a), features(b));
    let total = fa.len().max(fb.len());
    if total == 0 {
        return 0.0;
    }
    let matches = fa.iter().zip(fb.iter()).filter(|(x, y)| x == y).count();
    matches as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{AgentAction, UserMessage};

    fn message(user: &str, text: &str, destination: &str) -> Observation {
        Observation::UserMessage(UserMessage {
            user_id: Some(user.into()),
            message: Some(text.into()),
            destination: Some(destination.into()),
            language: None,
        })
    }

    #[test]
    fn same_category_and_destination_is_identical() {
        let a = message("u1", "What does a week in Cairo cost?", "Cairo");
        let b = message("u1", "Is the price of Cairo hotels high?", "cairo");
        assert_eq!(similarity(&a, &b), 1.0);
    }

    #[test]
    fn different_kinds_score_zero() {
        let a = message("u1", "help", "Cairo");
        let b = Observation::agent_action("u1", "help");
        assert_eq!(similarity(&a, &b), 0.0);
    }

    #[test]
    fn latency_compares_by_magnitude() {
        let action = |latency| {
            Observation::AgentAction(AgentAction {
                agent_id: Some("a".into()),
                action: Some("search".into()),
                success: Some(true),
                latency_ms: Some(latency),
                output: None,
            })
        };
        assert_eq!(similarity(&action(120.0), &action(480.0)), 1.0);
        assert_eq!(similarity(&action(120.0), &action(1200.0)), 0.75);
    }

    #[test]
    fn partial_overlap() {
        let a = Observation::code_change("src/lib.rs", "bug_fix");
        let b = Observation::code_change("src/lib.rs", "feature");
        assert_eq!(similarity(&a, &b), 0.5);
    }
}
