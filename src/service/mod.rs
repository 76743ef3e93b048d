//! The service capability consumed by the aggregator.
//!
//! The aggregator treats every service as a black box that settles exactly
//! once per call. Mock implementations live in [`mock`].

pub mod mock;

pub use mock::{EchoService, FailingService};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A remote service that can be asked to retrieve a value for an input.
#[async_trait]
pub trait Microservice: Send + Sync {
    /// Identifier used in logs and error messages.
    fn id(&self) -> &str;

    /// Retrieve a value for `input`.
    async fn retrieve(&self, input: &str) -> Result<String, ServiceError>;
}

/// A service handle that can be shared across concurrently running tasks.
pub type SharedService = Arc<dyn Microservice>;

/// Build a mock service from its configuration entry.
///
/// Entries with a `fail` message become [`FailingService`]s, everything
/// else is an [`EchoService`].
pub fn from_config(config: &ServiceConfig) -> SharedService {
    let delay = Duration::from_millis(config.delay_ms);

    match config.fail {
        Some(ref error) => Arc::new(FailingService::new(&config.id, error).with_delay(delay)),
        None => Arc::new(EchoService::new(&config.id).with_delay(delay)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_echo() {
        let config = ServiceConfig {
            id: "Alpha".to_string(),
            delay_ms: 0,
            fail: None,
        };

        let service = from_config(&config);
        assert_eq!(service.id(), "Alpha");
        assert_eq!(service.retrieve("hello").await, Ok("Alpha:HELLO".to_string()));
    }

    #[tokio::test]
    async fn test_from_config_failing() {
        let config = ServiceConfig {
            id: "Bad".to_string(),
            delay_ms: 0,
            fail: Some("service down".to_string()),
        };

        let service = from_config(&config);
        assert_eq!(
            service.retrieve("hello").await,
            Err(ServiceError::invocation("service down"))
        );
    }
}
