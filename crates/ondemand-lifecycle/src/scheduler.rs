//! Idle-check loop. Invokes the idle-stop handler on a fixed interval.
//!
//! Evaluations run strictly one after another from a single task. A failed
//! check is logged and the loop carries on; the next tick re-observes the
//! provider from scratch.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use ondemand_controller::ControllerResult;
use ondemand_core::StopResult;

use crate::handlers::Lifecycle;

pub struct IdleStopScheduler {
    lifecycle: Lifecycle,
}

impl IdleStopScheduler {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    /// Run a single idle check.
    pub async fn tick(&self) -> ControllerResult<StopResult> {
        self.lifecycle.handle_idle_stop().await
    }

    /// Run the idle-check loop until `shutdown` fires.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            instance = %self.lifecycle.instance(),
            interval_secs = interval.as_secs(),
            "idle-check loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.tick().await {
                        Ok(result) => info!(
                            instance = %result.instance_id,
                            state = %result.state,
                            stopped = result.stopped,
                            "idle check complete"
                        ),
                        Err(e) => error!(error = %e, "idle check failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("idle-check loop shutting down");
                    break;
                }
            }
        }
    }
}
