//! Error types for service invocations and aggregates.
//!
//! A Task can only ever fail with a [`ServiceError`]. The aggregate layer
//! wraps it in an [`AggregateError`] when a policy lets it escape, and adds
//! the few caller-side conditions that are signalled before anything runs.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single service invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service reported a failure. The message is opaque to the aggregator.
    #[error("{0}")]
    Invocation(String),

    /// The service panicked while handling the request.
    #[error("service panicked: {0}")]
    Panicked(String),

    /// The task was torn down before it settled.
    #[error("task aborted before settling")]
    Aborted,
}

impl ServiceError {
    /// Shorthand for an [`ServiceError::Invocation`] failure.
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation(message.into())
    }
}

/// Failure of an aggregate operation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A task failed and the policy does not absorb failures.
    #[error("task {index} ({service}) failed: {source}")]
    Service {
        index: usize,
        service: String,
        #[source]
        source: ServiceError,
    },

    /// Services and messages could not be paired by index.
    #[error("cannot pair {services} services with {messages} messages")]
    LengthMismatch { services: usize, messages: usize },

    /// No tokio runtime was available to launch the tasks on.
    #[error("no tokio runtime available to launch tasks")]
    NoRuntime,

    /// The caller's deadline expired before the aggregate settled.
    #[error("aggregate did not settle within {0:?}")]
    DeadlineElapsed(Duration),

    /// The reduction task was torn down before producing a result.
    #[error("aggregate reducer stopped before producing a result")]
    ReducerLost,
}

impl AggregateError {
    /// The underlying service failure, if this error carries one.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            AggregateError::Service { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T, E = AggregateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_service_error_display() {
        assert_eq!(ServiceError::invocation("service down").to_string(), "service down");
        assert_eq!(
            ServiceError::Panicked("boom".to_string()).to_string(),
            "service panicked: boom"
        );
    }

    #[test]
    fn test_aggregate_error_keeps_cause() {
        let err = AggregateError::Service {
            index: 1,
            service: "Bad".to_string(),
            source: ServiceError::invocation("service down"),
        };

        assert_eq!(err.to_string(), "task 1 (Bad) failed: service down");
        assert_eq!(err.source().map(|s| s.to_string()), Some("service down".to_string()));
        assert_eq!(
            err.service_error(),
            Some(&ServiceError::invocation("service down"))
        );
    }

    #[test]
    fn test_length_mismatch_message() {
        let err = AggregateError::LengthMismatch {
            services: 3,
            messages: 2,
        };
        assert_eq!(err.to_string(), "cannot pair 3 services with 2 messages");
        assert!(err.service_error().is_none());
    }
}
