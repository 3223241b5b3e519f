//! In-process simulated provider.
//!
//! Holds at most one instance record and applies provider-like transitions
//! to it. Counts every call so tests can assert how many start/stop commands
//! were issued, and can inject a one-shot failure per operation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use ondemand_core::{InstanceRef, InstanceState};

use crate::controller::{ControllerFuture, InstanceController};
use crate::describe::DescribeInstancesOutput;
use crate::error::{ControllerError, ControllerResult, Operation};

#[derive(Debug)]
struct Record {
    id: InstanceRef,
    state: InstanceState,
}

#[derive(Debug, Default)]
struct Simulated {
    record: Option<Record>,
    failures: HashMap<Operation, ControllerError>,
}

#[derive(Debug, Default)]
pub struct MemoryController {
    inner: Mutex<Simulated>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    describe_calls: AtomicUsize,
    /// Advance transient states after each describe.
    auto_settle: bool,
}

impl MemoryController {
    /// A provider that knows one instance in `state`.
    pub fn new(id: InstanceRef, state: InstanceState) -> Self {
        Self {
            inner: Mutex::new(Simulated {
                record: Some(Record { id, state }),
                failures: HashMap::new(),
            }),
            ..Self::default()
        }
    }

    /// A provider with no instance record at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Move pending to running and stopping to stopped after each describe.
    pub fn with_auto_settle(mut self, auto_settle: bool) -> Self {
        self.auto_settle = auto_settle;
        self
    }

    /// Current simulated state, or `None` when there is no record.
    pub fn state(&self) -> Option<InstanceState> {
        self.lock().record.as_ref().map(|r| r.state)
    }

    pub fn set_state(&self, state: InstanceState) {
        if let Some(record) = self.lock().record.as_mut() {
            record.state = state;
        }
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: ControllerError) {
        self.lock().failures.insert(operation, error);
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Simulated> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply(&self, operation: Operation, instance: &InstanceRef) -> ControllerResult<()> {
        let mut sim = self.lock();
        if let Some(err) = sim.failures.remove(&operation) {
            return Err(err);
        }

        let record = match sim.record.as_mut() {
            Some(r) if &r.id == instance => r,
            _ => return Err(not_found(operation, instance)),
        };

        let next = match (operation, record.state) {
            (Operation::Start, InstanceState::Stopped) => InstanceState::Pending,
            (Operation::Start, InstanceState::Pending | InstanceState::Running) => record.state,
            (Operation::Stop, InstanceState::Running | InstanceState::Pending) => InstanceState::Stopping,
            (Operation::Stop, InstanceState::Stopping | InstanceState::Stopped) => record.state,
            (_, InstanceState::Unknown) => record.state,
            (_, current) => {
                return Err(ControllerError::Provider {
                    operation,
                    status: 400,
                    message: format!("IncorrectInstanceState: instance {instance} is {current}"),
                });
            }
        };

        debug!(%operation, %instance, from = %record.state, to = %next, "simulated transition");
        record.state = next;
        Ok(())
    }

    fn observe(&self, instance: &InstanceRef) -> ControllerResult<InstanceState> {
        let mut sim = self.lock();
        if let Some(err) = sim.failures.remove(&Operation::Describe) {
            return Err(err);
        }

        let output = match sim.record.as_ref() {
            Some(r) if &r.id == instance => DescribeInstancesOutput::single(r.id.as_str(), r.state),
            _ => DescribeInstancesOutput {
                reservations: Some(Vec::new()),
            },
        };

        if self.auto_settle
            && let Some(record) = sim.record.as_mut()
        {
            record.state = match record.state {
                InstanceState::Pending => InstanceState::Running,
                InstanceState::Stopping => InstanceState::Stopped,
                other => other,
            };
        }

        Ok(output.instance_state())
    }
}

fn not_found(operation: Operation, instance: &InstanceRef) -> ControllerError {
    ControllerError::Provider {
        operation,
        status: 400,
        message: format!("InvalidInstanceID.NotFound: {instance}"),
    }
}

impl InstanceController for MemoryController {
    fn start<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, ()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.apply(Operation::Start, instance);
        Box::pin(async move { result })
    }

    fn stop<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, ()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.apply(Operation::Stop, instance);
        Box::pin(async move { result })
    }

    fn describe<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, InstanceState> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.observe(instance);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> InstanceRef {
        InstanceRef::new("i-sim")
    }

    #[tokio::test]
    async fn describe_reports_current_state() {
        let controller = MemoryController::new(id(), InstanceState::Running);
        assert_eq!(controller.describe(&id()).await.unwrap(), InstanceState::Running);
        assert_eq!(controller.describe_calls(), 1);
    }

    #[tokio::test]
    async fn empty_provider_describes_unknown() {
        let controller = MemoryController::empty();
        assert_eq!(controller.describe(&id()).await.unwrap(), InstanceState::Unknown);
    }

    #[tokio::test]
    async fn other_instance_describes_unknown() {
        let controller = MemoryController::new(id(), InstanceState::Running);
        let other = InstanceRef::new("i-other");
        assert_eq!(controller.describe(&other).await.unwrap(), InstanceState::Unknown);
    }

    #[tokio::test]
    async fn start_moves_stopped_to_pending() {
        let controller = MemoryController::new(id(), InstanceState::Stopped);
        controller.start(&id()).await.unwrap();
        assert_eq!(controller.state(), Some(InstanceState::Pending));
        assert_eq!(controller.start_calls(), 1);
    }

    #[tokio::test]
    async fn start_on_running_is_not_an_error() {
        let controller = MemoryController::new(id(), InstanceState::Running);
        controller.start(&id()).await.unwrap();
        controller.start(&id()).await.unwrap();
        assert_eq!(controller.state(), Some(InstanceState::Running));
        assert_eq!(controller.start_calls(), 2);
    }

    #[tokio::test]
    async fn stop_moves_running_to_stopping() {
        let controller = MemoryController::new(id(), InstanceState::Running);
        controller.stop(&id()).await.unwrap();
        assert_eq!(controller.state(), Some(InstanceState::Stopping));
    }

    #[tokio::test]
    async fn stop_on_terminated_is_rejected() {
        let controller = MemoryController::new(id(), InstanceState::Terminated);
        let err = controller.stop(&id()).await.unwrap_err();
        assert!(matches!(err, ControllerError::Provider { status: 400, .. }));
        assert_eq!(controller.state(), Some(InstanceState::Terminated));
    }

    #[tokio::test]
    async fn start_on_missing_instance_is_rejected() {
        let controller = MemoryController::empty();
        let err = controller.start(&id()).await.unwrap_err();
        assert!(err.to_string().contains("NotFound"));
    }

    #[tokio::test]
    async fn auto_settle_advances_after_describe() {
        let controller = MemoryController::new(id(), InstanceState::Stopped).with_auto_settle(true);
        controller.start(&id()).await.unwrap();
        assert_eq!(controller.describe(&id()).await.unwrap(), InstanceState::Pending);
        assert_eq!(controller.describe(&id()).await.unwrap(), InstanceState::Running);

        controller.stop(&id()).await.unwrap();
        assert_eq!(controller.describe(&id()).await.unwrap(), InstanceState::Stopping);
        assert_eq!(controller.describe(&id()).await.unwrap(), InstanceState::Stopped);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let controller = MemoryController::new(id(), InstanceState::Running);
        controller.fail_next(
            Operation::Describe,
            ControllerError::Throttled {
                operation: Operation::Describe,
            },
        );

        assert!(controller.describe(&id()).await.is_err());
        assert_eq!(controller.describe(&id()).await.unwrap(), InstanceState::Running);
        assert_eq!(controller.describe_calls(), 2);
    }
}
