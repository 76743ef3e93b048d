//! In-process mock services.

use super::Microservice;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Answers every request with `"{id}:{INPUT}"`, the input upper-cased.
#[derive(Debug, Clone)]
pub struct EchoService {
    id: String,
    delay: Duration,
}

impl EchoService {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delay: Duration::ZERO,
        }
    }

    /// Simulated latency before the response is produced.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Microservice for EchoService {
    fn id(&self) -> &str {
        &self.id
    }

    async fn retrieve(&self, input: &str) -> Result<String, ServiceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        debug!("{} answering {:?}", self.id, input);
        Ok(format!("{}:{}", self.id, input.to_uppercase()))
    }
}

/// Fails every request with the same error.
#[derive(Debug, Clone)]
pub struct FailingService {
    id: String,
    error: String,
    delay: Duration,
}

impl FailingService {
    pub fn new(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: error.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Microservice for FailingService {
    fn id(&self) -> &str {
        &self.id
    }

    async fn retrieve(&self, _input: &str) -> Result<String, ServiceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        debug!("{} failing: {}", self.id, self.error);
        Err(ServiceError::Invocation(self.error.clone()))
    }
}
