//! Insights - ranked, human-readable projections of the pattern tables

use crate::detectors::{ImprovementArea, Preferences};
use crate::memory::MemoryStore;
use serde::Serialize;
use std::cmp::Ordering;

/// Agent improvement areas reported per insight.
const RECENT_IMPROVEMENT_AREAS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct UserInsight {
    pub user_id: String,
    pub message_count: u64,
    pub top_query_type: Option<String>,
    pub preferences: Preferences,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentInsight {
    pub agent_id: String,
    pub action_count: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub top_action: Option<String>,
    pub improvement_areas: Vec<ImprovementArea>,
    pub needs_review: bool,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeInsight {
    pub file: String,
    pub change_count: u64,
    pub error_prone: bool,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInsight {
    pub workflow_id: String,
    pub execution_count: u64,
    pub average_duration_ms: f64,
    pub success_rate: f64,
    pub bottleneck: Option<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInsight {
    pub error_type: String,
    pub occurrences: u64,
    pub top_solution: Option<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Insights {
    pub user: Vec<UserInsight>,
    pub agent: Vec<AgentInsight>,
    pub code: Vec<CodeInsight>,
    pub workflow: Vec<WorkflowInsight>,
    pub error: Vec<ErrorInsight>,
}

impl Insights {
    pub fn is_empty(&self) -> bool {
        self.user.is_empty()
            && self.agent.is_empty()
            && self.code.is_empty()
            && self.workflow.is_empty()
            && self.error.is_empty()
    }

    /// Keep only the insights about one agent.
    pub fn for_agent(mut self, agent_id: &str) -> Self {
        self.agent.retain(|a| a.agent_id == agent_id);
        self
    }
}

fn by_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl MemoryStore {
    pub fn get_insights(&self) -> Insights {
        Insights {
            user: self.user_insights(),
            agent: self.agent_insights(),
            code: self.code_insights(),
            workflow: self.workflow_insights(),
            error: self.error_insights(),
        }
    }

    /// Users with the most messages first.
    pub fn user_insights(&self) -> Vec<UserInsight> {
        let mut out: Vec<UserInsight> = self
            .user_rows()
            .into_iter()
            .map(|(user_id, p)| {
                let top = p.common_queries.top().map(str::to_string);
                let recommendation = match &top {
                    Some(q) => format!("Focus on {} responses", q),
                    None => "Not enough messages yet".to_string(),
                };
                UserInsight {
                    user_id,
                    message_count: p.message_count,
                    top_query_type: top,
                    preferences: p.preferences,
                    recommendation,
                }
            })
            .collect();
        out.sort_by(|a, b| {
            b.message_count
                .cmp(&a.message_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        out
    }

    /// Agents with the lowest success rate first.
    pub fn agent_insights(&self) -> Vec<AgentInsight> {
        let threshold = self.learning.improvement_threshold;
        let mut out: Vec<AgentInsight> = self
            .agent_rows()
            .into_iter()
            .map(|(agent_id, p)| {
                let needs_review = p.success_rate < threshold;
                let skip = p.improvement_areas.len().saturating_sub(RECENT_IMPROVEMENT_AREAS);
                AgentInsight {
                    agent_id,
                    action_count: p.action_count,
                    success_rate: p.success_rate,
                    average_latency_ms: p.average_latency_ms,
                    top_action: p.common_actions.top().map(str::to_string),
                    improvement_areas: p.improvement_areas.into_iter().skip(skip).collect(),
                    needs_review,
                    recommendation: if needs_review {
                        "Review and optimize agent logic".to_string()
                    } else {
                        "Performance is good".to_string()
                    },
                }
            })
            .collect();
        out.sort_by(|a, b| {
            by_f64(a.success_rate, b.success_rate)
                .then_with(|| b.action_count.cmp(&a.action_count))
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        out
    }

    /// Error-prone files, plus files changed more than
    /// `unstable_change_count` times, most changed first.
    pub fn code_insights(&self) -> Vec<CodeInsight> {
        let busy = self.learning.unstable_change_count;
        let mut out: Vec<CodeInsight> = self
            .code_rows()
            .into_iter()
            .filter(|(_, p)| p.error_prone || p.change_count > busy)
            .map(|(file, p)| CodeInsight {
                file,
                change_count: p.change_count,
                error_prone: p.error_prone,
                recommendation: if p.error_prone {
                    "Add more tests and error handling".to_string()
                } else {
                    "File is stable".to_string()
                },
            })
            .collect();
        out.sort_by(|a, b| {
            b.error_prone
                .cmp(&a.error_prone)
                .then_with(|| b.change_count.cmp(&a.change_count))
                .then_with(|| a.file.cmp(&b.file))
        });
        out
    }

    /// Most executed workflows first.
    pub fn workflow_insights(&self) -> Vec<WorkflowInsight> {
        let mut out: Vec<WorkflowInsight> = self
            .workflow_rows()
            .into_iter()
            .map(|(workflow_id, p)| {
                let bottleneck = p.bottlenecks.top().map(str::to_string);
                let recommendation = match &bottleneck {
                    Some(step) => format!("Optimize step: {}", step),
                    None => "Workflow is efficient".to_string(),
                };
                WorkflowInsight {
                    workflow_id,
                    execution_count: p.execution_count,
                    average_duration_ms: p.average_duration_ms,
                    success_rate: p.success_rate,
                    bottleneck,
                    recommendation,
                }
            })
            .collect();
        out.sort_by(|a, b| {
            b.execution_count
                .cmp(&a.execution_count)
                .then_with(|| a.workflow_id.cmp(&b.workflow_id))
        });
        out
    }

    /// Recurring error types, most frequent first.
    pub fn error_insights(&self) -> Vec<ErrorInsight> {
        let min = self.learning.min_occurrences as u64;
        let mut out: Vec<ErrorInsight> = self
            .error_rows()
            .into_iter()
            .filter(|(_, p)| p.occurrences >= min)
            .map(|(error_type, p)| {
                let top_solution = p.solutions.top().map(str::to_string);
                let recommendation = match &top_solution {
                    Some(s) => format!("Apply solution: {}", s),
                    None => "Investigate root cause".to_string(),
                };
                ErrorInsight {
                    error_type,
                    occurrences: p.occurrences,
                    top_solution,
                    recommendation,
                }
            })
            .collect();
        out.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.error_type.cmp(&b.error_type))
        });
        out
    }
}
