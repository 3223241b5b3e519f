//! DescribeInstances response shape.
//!
//! Every level of the record is optional on the wire: an eventually
//! consistent control plane may briefly return partial records. The
//! accessor below unwraps the chain once and yields a single normalized
//! [`InstanceState`].

use serde::{Deserialize, Serialize};

use ondemand_core::InstanceState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations: Option<Vec<Reservation>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<ProviderInstance>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProviderInstanceState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderInstanceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DescribeInstancesOutput {
    /// A response carrying one instance in the given state.
    pub fn single(instance_id: &str, state: InstanceState) -> Self {
        Self {
            reservations: Some(vec![Reservation {
                instances: Some(vec![ProviderInstance {
                    instance_id: Some(instance_id.to_string()),
                    state: Some(ProviderInstanceState {
                        code: state_code(state),
                        name: Some(state.as_str().to_string()),
                    }),
                }]),
            }]),
        }
    }

    /// State of the first instance of the first reservation.
    ///
    /// Missing reservations, instances, state, or name all yield `Unknown`.
    pub fn instance_state(&self) -> InstanceState {
        self.reservations
            .as_deref()
            .and_then(<[Reservation]>::first)
            .and_then(|r| r.instances.as_deref())
            .and_then(<[ProviderInstance]>::first)
            .and_then(|i| i.state.as_ref())
            .and_then(|s| s.name.as_deref())
            .map(InstanceState::from_provider_name)
            .unwrap_or(InstanceState::Unknown)
    }
}

/// Numeric state code used by EC2-style control planes.
fn state_code(state: InstanceState) -> Option<u16> {
    match state {
        InstanceState::Pending => Some(0),
        InstanceState::Running => Some(16),
        InstanceState::ShuttingDown => Some(32),
        InstanceState::Terminated => Some(48),
        InstanceState::Stopping => Some(64),
        InstanceState::Stopped => Some(80),
        InstanceState::Unknown => None,
    }
}
