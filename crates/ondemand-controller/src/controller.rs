//! The controller seam.

use std::future::Future;
use std::pin::Pin;

use ondemand_core::{InstanceRef, InstanceState};

use crate::error::ControllerResult;

/// Boxed future returned by controller operations.
pub type ControllerFuture<'a, T> = Pin<Box<dyn Future<Output = ControllerResult<T>> + Send + 'a>>;

/// Start, stop, and describe a provider instance.
///
/// Implementations issue exactly one provider call per operation and never
/// suppress duplicate start/stop calls; idempotency is the provider's. Each
/// call is bounded by the implementation's timeout.
pub trait InstanceController: Send + Sync {
    /// Issue a start command.
    fn start<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, ()>;

    /// Issue a stop command.
    fn stop<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, ()>;

    /// Query current state. "No matching record" is `Ok(InstanceState::Unknown)`.
    fn describe<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, InstanceState>;
}
