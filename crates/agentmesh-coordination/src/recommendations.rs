//! Improvement recommendations derived from insights

use agentmesh_learning::Insights;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    AgentOptimization,
    CodeQuality,
    WorkflowOptimization,
    ErrorPrevention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    /// Agent id, file, workflow id or error type the recommendation is about.
    pub subject: String,
    pub issue: String,
    pub recommendation: String,
}

/// Recommendations ordered by priority, highest first. Equal priorities keep
/// their insight order.
pub fn recommend(insights: &Insights) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for agent in insights.agent.iter().filter(|a| a.needs_review) {
        out.push(Recommendation {
            kind: RecommendationKind::AgentOptimization,
            priority: Priority::High,
            subject: agent.agent_id.clone(),
            issue: format!("Low success rate ({:.0}%)", agent.success_rate * 100.0),
            recommendation: agent.recommendation.clone(),
        });
    }

    for code in insights.code.iter().filter(|c| c.error_prone) {
        out.push(Recommendation {
            kind: RecommendationKind::CodeQuality,
            priority: Priority::Medium,
            subject: code.file.clone(),
            issue: "Error-prone file".to_string(),
            recommendation: code.recommendation.clone(),
        });
    }

    for workflow in &insights.workflow {
        if let Some(step) = &workflow.bottleneck {
            out.push(Recommendation {
                kind: RecommendationKind::WorkflowOptimization,
                priority: Priority::Medium,
                subject: workflow.workflow_id.clone(),
                issue: format!("Bottleneck at: {}", step),
                recommendation: workflow.recommendation.clone(),
            });
        }
    }

    for error in &insights.error {
        out.push(Recommendation {
            kind: RecommendationKind::ErrorPrevention,
            priority: Priority::High,
            subject: error.error_type.clone(),
            issue: format!("Recurring error ({} times)", error.occurrences),
            recommendation: error.recommendation.clone(),
        });
    }

    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}
