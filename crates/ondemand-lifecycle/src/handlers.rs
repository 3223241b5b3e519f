//! Start and idle-stop handlers.

use std::sync::Arc;

use tracing::{debug, info};

use ondemand_controller::{ControllerResult, InstanceController};
use ondemand_core::{InstanceRef, LifecycleAction, StartResult, StatusResult, StopResult};
use ondemand_policy::evaluate_idle_stop;

/// Lifecycle actions for the single configured instance.
///
/// Holds no mutable state: every call re-observes the provider.
#[derive(Clone)]
pub struct Lifecycle {
    instance: InstanceRef,
    controller: Arc<dyn InstanceController>,
}

impl Lifecycle {
    pub fn new(instance: InstanceRef, controller: Arc<dyn InstanceController>) -> Self {
        Self { instance, controller }
    }

    pub fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    /// Start the instance unconditionally.
    ///
    /// Starting is never conditional on observed state; an already running
    /// or starting instance is left to the provider's idempotency.
    pub async fn handle_start(&self) -> ControllerResult<StartResult> {
        self.controller.start(&self.instance).await?;
        info!(instance = %self.instance, "start issued");

        Ok(StartResult {
            started: true,
            instance_id: self.instance.clone(),
        })
    }

    /// Run one idle-stop check: describe, evaluate, and stop if decided.
    pub async fn handle_idle_stop(&self) -> ControllerResult<StopResult> {
        let observed = self.controller.describe(&self.instance).await?;
        let decision = evaluate_idle_stop(observed);

        if decision.action == LifecycleAction::Stop {
            self.controller.stop(&self.instance).await?;
            info!(instance = %self.instance, %observed, "idle instance stop issued");
        } else {
            debug!(instance = %self.instance, %observed, "idle check: no action");
        }

        Ok(StopResult::from_decision(self.instance.clone(), &decision))
    }

    /// Report the current provider state without evaluating any policy.
    pub async fn status(&self) -> ControllerResult<StatusResult> {
        let state = self.controller.describe(&self.instance).await?;
        Ok(StatusResult {
            instance_id: self.instance.clone(),
            state,
        })
    }
}
