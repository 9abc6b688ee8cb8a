//! Task execution boundary
//!
//! The facade owns the bookkeeping around a task; what the task actually does
//! is supplied by the caller through `TaskBody`.

use agentmesh_core::{AgentId, Result, TaskDescriptor, TaskOutcome};
use agentmesh_learning::{Insights, Knowledge};
use agentmesh_topology::AgentPosition;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;

/// Read-only context handed to a task body.
#[derive(Debug, Clone, Serialize)]
pub struct TaskContext {
    pub agent_id: AgentId,
    pub task: TaskDescriptor,
    pub position: Option<AgentPosition>,
    pub insights: Insights,
    /// Knowledge learned for this kind of task.
    pub knowledge: Vec<Knowledge>,
}

/// The work an agent performs for one task.
///
/// Returning `Err` is a task failure: it is recorded and handed back to the
/// caller. An `Ok` outcome with `success == false` is a completed task that
/// did not achieve its goal.
#[async_trait]
pub trait TaskBody: Send + Sync {
    async fn run(&self, ctx: TaskContext) -> Result<TaskOutcome>;
}

/// Adapter turning an async closure into a `TaskBody`.
pub struct FnTask<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnTask<F, Fut>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskOutcome>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _fut: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> TaskBody for FnTask<F, Fut>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskOutcome>> + Send,
{
    async fn run(&self, ctx: TaskContext) -> Result<TaskOutcome> {
        (self.f)(ctx).await
    }
}
