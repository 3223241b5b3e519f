//! Domain types shared by the controller, policy, and handler crates.
//!
//! These are the values that cross component boundaries: the configured
//! instance reference, the observed provider state, the decision produced
//! by one policy evaluation, and the result bodies returned to HTTP callers.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Instance reference ─────────────────────────────────────────────

/// Opaque identifier of the managed compute instance.
///
/// Configured once at startup and never derived at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceRef(String);

impl InstanceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Instance state ─────────────────────────────────────────────────

/// Observed state of the instance as reported by the provider.
///
/// `Unknown` means the provider returned no matching record. It is data,
/// not an error, and is never treated as `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
    Unknown,
}

impl InstanceState {
    /// Every state, in provider lifecycle order.
    pub const ALL: [InstanceState; 7] = [
        InstanceState::Pending,
        InstanceState::Running,
        InstanceState::Stopping,
        InstanceState::Stopped,
        InstanceState::ShuttingDown,
        InstanceState::Terminated,
        InstanceState::Unknown,
    ];

    /// Map a provider state name to a state. Unrecognized names are `Unknown`.
    pub fn from_provider_name(name: &str) -> Self {
        match name {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            "shutting-down" => InstanceState::ShuttingDown,
            "terminated" => InstanceState::Terminated,
            _ => InstanceState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
            InstanceState::Unknown => "unknown",
        }
    }

    /// Whether the instance is stopped or converging toward stopped.
    pub fn is_stopped_or_stopping(&self) -> bool {
        matches!(self, InstanceState::Stopping | InstanceState::Stopped)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Lifecycle decision ─────────────────────────────────────────────

/// Action chosen by one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Stop,
    /// Leave the instance alone.
    #[serde(rename = "none")]
    NoChange,
}

/// Output of one policy evaluation. Built fresh per evaluation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleDecision {
    pub action: LifecycleAction,
    pub resulting_state: InstanceState,
}

impl LifecycleDecision {
    /// A decision that leaves `state` untouched.
    pub fn no_change(state: InstanceState) -> Self {
        Self {
            action: LifecycleAction::NoChange,
            resulting_state: state,
        }
    }
}

// ── Result bodies ──────────────────────────────────────────────────

/// Body returned by the start endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResult {
    pub started: bool,
    pub instance_id: InstanceRef,
}

/// Body returned by the idle-stop endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResult {
    pub stopped: bool,
    pub instance_id: InstanceRef,
    pub state: InstanceState,
}

impl StopResult {
    /// Report the outcome of an idle-stop evaluation.
    ///
    /// `stopped` is true iff the resulting state is `stopping` or `stopped`.
    pub fn from_decision(instance_id: InstanceRef, decision: &LifecycleDecision) -> Self {
        Self {
            stopped: decision.resulting_state.is_stopped_or_stopping(),
            instance_id,
            state: decision.resulting_state,
        }
    }
}

/// Body returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub instance_id: InstanceRef,
    pub state: InstanceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_round_trip_through_as_str() {
        for state in InstanceState::ALL {
            assert_eq!(InstanceState::from_provider_name(state.as_str()), state);
        }
    }

    #[test]
    fn unrecognized_provider_name_is_unknown() {
        assert_eq!(InstanceState::from_provider_name("rebooting"), InstanceState::Unknown);
        assert_eq!(InstanceState::from_provider_name(""), InstanceState::Unknown);
        assert_eq!(InstanceState::from_provider_name("Running"), InstanceState::Unknown);
    }

    #[test]
    fn shutting_down_serializes_kebab_case() {
        let json = serde_json::to_string(&InstanceState::ShuttingDown).unwrap();
        assert_eq!(json, "\"shutting-down\"");
    }

    #[test]
    fn no_change_action_serializes_as_none() {
        let json = serde_json::to_string(&LifecycleAction::NoChange).unwrap();
        assert_eq!(json, "\"none\"");
    }

    #[test]
    fn stop_result_stopped_flag_matches_state() {
        let id = InstanceRef::new("i-abc");
        for state in InstanceState::ALL {
            let result = StopResult::from_decision(id.clone(), &LifecycleDecision::no_change(state));
            let expected = matches!(state, InstanceState::Stopping | InstanceState::Stopped);
            assert_eq!(result.stopped, expected, "state {state}");
            assert_eq!(result.state, state);
        }
    }

    #[test]
    fn stop_result_json_shape() {
        let result = StopResult {
            stopped: true,
            instance_id: InstanceRef::new("i-abc"),
            state: InstanceState::Stopping,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"stopped": true, "instance_id": "i-abc", "state": "stopping"})
        );
    }

    #[test]
    fn start_result_json_shape() {
        let result = StartResult {
            started: true,
            instance_id: InstanceRef::new("i-abc"),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, serde_json::json!({"started": true, "instance_id": "i-abc"}));
    }
}
