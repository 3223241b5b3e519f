//! Idle-stop evaluation.

use tracing::debug;

use ondemand_core::{InstanceState, LifecycleAction, LifecycleDecision};

/// Decide whether an idle check should stop the instance.
///
/// A stop is only ever chosen for an instance observed exactly `running`.
/// States already converging toward stopped yield no action, so repeated
/// scheduler ticks never re-issue a stop.
pub fn evaluate_idle_stop(state: InstanceState) -> LifecycleDecision {
    let decision = match state {
        InstanceState::Running => LifecycleDecision {
            action: LifecycleAction::Stop,
            resulting_state: InstanceState::Stopping,
        },
        InstanceState::Stopping | InstanceState::Stopped => LifecycleDecision::no_change(state),
        InstanceState::Pending
        | InstanceState::ShuttingDown
        | InstanceState::Terminated
        | InstanceState::Unknown => LifecycleDecision::no_change(state),
    };

    debug!(
        observed = %state,
        action = ?decision.action,
        resulting = %decision.resulting_state,
        "idle-stop evaluated"
    );
    decision
}
