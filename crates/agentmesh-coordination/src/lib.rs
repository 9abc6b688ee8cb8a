//! agentmesh coordination - the entry point hosts talk to
//!
//! `CoordinationFacade` runs tasks on registered agents, keeps the topology
//! and memory in step with each execution, and serves metrics, insights,
//! recommendations and visualization data.

pub mod events;
pub mod facade;
pub mod metrics;
pub mod recommendations;
pub mod scheduler;
pub mod task;
pub mod views;

pub use events::{EventBus, MeshEvent};
pub use facade::{Assignment, CoordinationFacade, WorkflowResult};
pub use metrics::{ExecutionMetrics, SystemMetrics, TopologySummary};
pub use recommendations::{recommend, Priority, Recommendation, RecommendationKind};
pub use scheduler::spawn_consolidation_loop;
pub use task::{FnTask, TaskBody, TaskContext};
pub use views::{HealthReport, Visualization};
