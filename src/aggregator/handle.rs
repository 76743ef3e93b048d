//! The caller-facing handle to an aggregate in flight.

use crate::error::{AggregateError, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// An aggregate whose tasks are already running.
///
/// Await it to get the reduced result, or use [`AggregateHandle::wait_timeout`]
/// to bound the wait. Dropping the handle does not cancel anything: tasks
/// still in flight run to completion on their own.
#[derive(Debug)]
pub struct AggregateHandle<T> {
    runtime: Handle,
    inner: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> AggregateHandle<T> {
    /// Run `reduce` on its own task and hand back a handle to it.
    pub(crate) fn spawn<F>(runtime: &Handle, reduce: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            runtime: runtime.clone(),
            inner: runtime.spawn(reduce),
        }
    }

    /// Wait for the aggregate, giving up after `deadline`.
    ///
    /// On expiry the in-flight tasks are left running.
    pub async fn wait_timeout(self, deadline: Duration) -> Result<T> {
        match tokio::time::timeout(deadline, self).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Aggregate still pending after {:?}, giving up", deadline);
                Err(AggregateError::DeadlineElapsed(deadline))
            }
        }
    }

    /// Whether the reduction has already produced its result.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Transform the successful result once it is available.
    pub fn map<U, F>(self, f: F) -> AggregateHandle<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let runtime = self.runtime.clone();
        AggregateHandle::spawn(&runtime, async move { self.await.map(f) })
    }
}

impl<T> Future for AggregateHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => {
                warn!("Aggregate reducer did not finish: {}", e);
                Poll::Ready(Err(AggregateError::ReducerLost))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
