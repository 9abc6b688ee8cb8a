//! agentmesh learning - pattern learning over execution telemetry
//!
//! Observations flow into tiered memory:
//! - Short-term: the last N observations, consolidated into patterns
//! - Episodic: append-only event log
//! - Long-term: similarity-clustered patterns with a decaying strength
//! - Semantic: knowledge distilled from strong patterns, indexed by kind
//!
//! Detectors keep per-user, per-agent, per-file, per-workflow and per-error
//! statistics that feed the insight lists.

pub mod consolidation;
pub mod detectors;
pub mod insights;
pub mod knowledge;
pub mod memory;
pub mod observation;
pub mod similarity;

pub use consolidation::{ConsolidationReport, LongTermPattern};
pub use detectors::{classify_query, QueryCategory, TravelStyle};
pub use insights::{AgentInsight, CodeInsight, ErrorInsight, Insights, UserInsight, WorkflowInsight};
pub use knowledge::{Knowledge, KnowledgeData};
pub use memory::{LearningMetrics, LearningStats, MemoryStore, MemoryUsage};
pub use observation::{
    AgentAction, CodeChange, Episode, ErrorEvent, Observation, ObservationKind, ObservationRecord,
    UserMessage, WorkflowExecution, WorkflowStep,
};
