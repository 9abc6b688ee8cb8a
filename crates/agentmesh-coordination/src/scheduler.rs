//! Background consolidation loop

use crate::facade::CoordinationFacade;
use agentmesh_learning::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Consolidate `memory` every `period` until `cancel` fires.
/// The first pass runs one period after the call.
pub fn spawn_consolidation_loop(
    memory: Arc<MemoryStore>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let period = period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "Consolidation loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = memory.consolidate();
                    debug!(
                        processed = report.processed,
                        strengthened = report.strengthened,
                        created = report.created.len(),
                        evicted = report.evicted.len(),
                        "Periodic consolidation"
                    );
                }
            }
        }

        info!("Consolidation loop stopped");
    })
}

impl CoordinationFacade {
    /// Start the consolidation loop at the configured interval.
    pub fn spawn_consolidation(&self, cancel: CancellationToken) -> JoinHandle<()> {
        spawn_consolidation_loop(
            Arc::clone(self.memory()),
            Duration::from_secs(self.config().consolidation_interval_secs),
            cancel,
        )
    }
}
