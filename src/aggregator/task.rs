//! Tasks, batches, and the shared launch/settle machinery.
//!
//! Every strategy goes through the same two steps: [`launch`] spawns all
//! tasks of a [`Batch`] onto the runtime, then the strategy reduces the
//! outcomes. Launching never waits on anything.

use crate::error::{AggregateError, Result, ServiceError};
use crate::service::SharedService;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// The settled result of one task.
pub type Outcome = std::result::Result<String, ServiceError>;

/// One service paired with one message.
///
/// A task is identified by its index in the batch, not by its service.
#[derive(Clone)]
pub struct Task {
    pub index: usize,
    pub service: SharedService,
    pub message: String,
}

impl Task {
    /// Call the service, turning a panic into a failed outcome.
    ///
    /// `retrieve` runs inside the guarded future, so a service that panics
    /// before handing back its future is caught too.
    async fn invoke(self) -> Outcome {
        let Task {
            service, message, ..
        } = self;
        let call = AssertUnwindSafe(async move { service.retrieve(&message).await });

        match call.catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(ServiceError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("index", &self.index)
            .field("service", &self.service.id())
            .field("message", &self.message)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The ordered set of tasks submitted to one aggregate call.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    tasks: Vec<Task>,
}

impl Batch {
    /// Pair services with messages by index.
    ///
    /// Fails with [`AggregateError::LengthMismatch`] when the two slices
    /// differ in length.
    pub fn paired<S: AsRef<str>>(services: &[SharedService], messages: &[S]) -> Result<Self> {
        if services.len() != messages.len() {
            return Err(AggregateError::LengthMismatch {
                services: services.len(),
                messages: messages.len(),
            });
        }

        let tasks = services
            .iter()
            .zip(messages)
            .enumerate()
            .map(|(index, (service, message))| Task {
                index,
                service: service.clone(),
                message: message.as_ref().to_string(),
            })
            .collect();

        Ok(Self { tasks })
    }

    /// Send the same message to every service.
    pub fn broadcast(services: &[SharedService], message: &str) -> Self {
        let tasks = services
            .iter()
            .enumerate()
            .map(|(index, service)| Task {
                index,
                service: service.clone(),
                message: message.to_string(),
            })
            .collect();

        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Service ids in submission order.
    pub fn service_ids(&self) -> Vec<String> {
        self.tasks
            .iter()
            .map(|t| t.service.id().to_string())
            .collect()
    }
}

/// A launched task whose outcome has not been observed yet.
pub(crate) struct Launched {
    index: usize,
    service: String,
    handle: JoinHandle<Outcome>,
}

/// A task outcome tagged with where it came from.
#[derive(Debug, Clone)]
pub(crate) struct Settled {
    pub index: usize,
    pub service: String,
    pub outcome: Outcome,
}

impl Settled {
    /// Lift a failed outcome into an aggregate failure.
    pub fn into_result(self) -> Result<String> {
        self.outcome.map_err(|source| AggregateError::Service {
            index: self.index,
            service: self.service,
            source,
        })
    }
}

/// The runtime tasks are spawned on.
pub(crate) fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|_| AggregateError::NoRuntime)
}

/// Spawn every task in the batch.
///
/// `on_settle` runs inside each task once its service call has settled and
/// may replace the outcome. All tasks are spawned before this returns.
pub(crate) fn launch<F>(runtime: &Handle, batch: Batch, on_settle: F) -> Vec<Launched>
where
    F: Fn(usize, &str, Outcome) -> Outcome + Clone + Send + Sync + 'static,
{
    batch
        .tasks
        .into_iter()
        .map(|task| {
            let index = task.index;
            let service = task.service.id().to_string();
            let on_settle = on_settle.clone();
            let id = service.clone();

            debug!("Launching task {} on {}", index, service);
            let handle = runtime.spawn(async move {
                let outcome = task.invoke().await;
                on_settle(index, &id, outcome)
            });

            Launched {
                index,
                service,
                handle,
            }
        })
        .collect()
}

/// Wait for every launched task, returning outcomes in submission order.
pub(crate) async fn settle_all(launched: Vec<Launched>) -> Vec<Settled> {
    let (meta, handles): (Vec<_>, Vec<_>) = launched
        .into_iter()
        .map(|l| ((l.index, l.service), l.handle))
        .unzip();

    join_all(handles)
        .await
        .into_iter()
        .zip(meta)
        .map(|(joined, (index, service))| {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => Err(ServiceError::Panicked(panic_message(
                    e.into_panic().as_ref(),
                ))),
                Err(_) => Err(ServiceError::Aborted),
            };
            debug!("Task {} ({}) settled, ok = {}", index, service, outcome.is_ok());

            Settled {
                index,
                service,
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{EchoService, FailingService};
    use std::sync::Arc;

    fn services(ids: &[&str]) -> Vec<SharedService> {
        ids.iter()
            .map(|id| Arc::new(EchoService::new(*id)) as SharedService)
            .collect()
    }

    fn keep(_: usize, _: &str, outcome: Outcome) -> Outcome {
        outcome
    }

    #[test]
    fn test_paired_keeps_index_order() {
        let batch = Batch::paired(&services(&["A", "B", "C"]), &["x", "y", "z"]).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.service_ids(), vec!["A", "B", "C"]);
        let messages: Vec<_> = batch.tasks().iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["x", "y", "z"]);
        let indexes: Vec<_> = batch.tasks().iter().map(|t| t.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_paired_rejects_length_mismatch() {
        let err = Batch::paired(&services(&["A", "B"]), &["only one"]).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::LengthMismatch {
                services: 2,
                messages: 1
            }
        ));
    }

    #[test]
    fn test_broadcast_shares_message() {
        let batch = Batch::broadcast(&services(&["A", "B"]), "ping");
        assert!(batch.tasks().iter().all(|t| t.message == "ping"));
        assert!(Batch::broadcast(&[], "ping").is_empty());
    }

    #[test]
    fn test_task_debug_shows_service_id() {
        let batch = Batch::broadcast(&services(&["Alpha"]), "hi");
        let debug = format!("{:?}", batch.tasks()[0]);
        assert!(debug.contains("Alpha"));
        assert!(debug.contains("hi"));
    }

    #[test]
    fn test_current_runtime_outside_tokio() {
        assert!(matches!(current_runtime(), Err(AggregateError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_settle_all_one_outcome_per_task() {
        let svcs: Vec<SharedService> = vec![
            Arc::new(EchoService::new("Good")),
            Arc::new(FailingService::new("Bad", "down")),
        ];
        let batch = Batch::paired(&svcs, &["a", "b"]).unwrap();

        let runtime = current_runtime().unwrap();
        let settled = settle_all(launch(&runtime, batch, keep)).await;

        assert_eq!(settled.len(), 2);
        assert_eq!(settled[0].outcome, Ok("Good:A".to_string()));
        assert_eq!(settled[1].outcome, Err(ServiceError::invocation("down")));
        assert_eq!(settled[1].service, "Bad");
    }

    #[tokio::test]
    async fn test_on_settle_replaces_outcome() {
        let svcs: Vec<SharedService> = vec![Arc::new(FailingService::new("Bad", "down"))];
        let batch = Batch::broadcast(&svcs, "a");

        let runtime = current_runtime().unwrap();
        let launched = launch(&runtime, batch, |index, service: &str, outcome: Outcome| {
            outcome.or_else(|_| Ok(format!("{}#{}", service, index)))
        });
        let settled = settle_all(launched).await;

        assert_eq!(settled[0].outcome, Ok("Bad#0".to_string()));
    }
}
