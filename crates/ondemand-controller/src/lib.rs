//! ondemand-controller — sole point of contact with the provider control plane.
//!
//! Exposes the [`InstanceController`] seam with three operations (start,
//! stop, describe) and two implementations:
//!
//! - [`HttpController`] talks to a remote control plane over HTTP, one
//!   bounded request per operation.
//! - [`MemoryController`] simulates a single instance in process, for tests
//!   and dry runs.
//!
//! The controller carries no policy and performs no retries. Describe
//! responses are normalized by [`DescribeInstancesOutput::instance_state`],
//! which maps any missing level of the nested record to
//! [`InstanceState::Unknown`](ondemand_core::InstanceState::Unknown).

pub mod controller;
pub mod describe;
pub mod error;
pub mod memory;
pub mod remote;

pub use controller::{ControllerFuture, InstanceController};
pub use describe::DescribeInstancesOutput;
pub use error::{ControllerError, ControllerResult, Operation};
pub use memory::MemoryController;
pub use remote::HttpController;
