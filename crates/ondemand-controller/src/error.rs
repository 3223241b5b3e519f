//! Controller error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Provider control-plane operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Start,
    Stop,
    Describe,
}

impl Operation {
    /// Control-plane action name.
    pub fn action(&self) -> &'static str {
        match self {
            Operation::Start => "StartInstances",
            Operation::Stop => "StopInstances",
            Operation::Describe => "DescribeInstances",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// Result type alias for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// A provider call failed.
///
/// Absence of an instance record is not an error; it is reported as
/// `InstanceState::Unknown` by `describe`.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    #[error("invalid provider endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("{operation}: connection failed: {message}")]
    Connect { operation: Operation, message: String },

    #[error("{operation}: request failed: {message}")]
    Request { operation: Operation, message: String },

    #[error("{operation}: timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },

    #[error("{operation}: unauthorized: {message}")]
    Unauthorized { operation: Operation, message: String },

    #[error("{operation}: throttled by provider")]
    Throttled { operation: Operation },

    #[error("{operation}: provider returned {status}: {message}")]
    Provider {
        operation: Operation,
        status: u16,
        message: String,
    },

    #[error("{operation}: malformed response: {message}")]
    MalformedResponse { operation: Operation, message: String },
}

impl ControllerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ControllerError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let err = ControllerError::Timeout {
            operation: Operation::Describe,
            after: Duration::from_secs(20),
        };
        assert_eq!(err.to_string(), "DescribeInstances: timed out after 20s");
        assert!(err.is_timeout());

        let err = ControllerError::Provider {
            operation: Operation::Stop,
            status: 500,
            message: "internal".to_string(),
        };
        assert_eq!(err.to_string(), "StopInstances: provider returned 500: internal");
        assert!(!err.is_timeout());
    }
}
