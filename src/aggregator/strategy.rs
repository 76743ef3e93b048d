//! The four failure-handling policies.
//!
//! Each entry point launches the whole batch before returning and hands
//! back an [`AggregateHandle`]; only the reduction step differs.
//!
//! | Policy             | Result           | A failing task...                  |
//! |--------------------|------------------|------------------------------------|
//! | `fail_fast`        | joined `String`  | fails the aggregate                |
//! | `fail_partial`     | `Vec<String>`    | is left out                        |
//! | `fail_soft`        | joined `String`  | is replaced by the fallback        |
//! | `completion_order` | `Vec<String>`    | fails the aggregate                |
//!
//! Joined and partial results follow submission order. Completion order
//! follows the order tasks finished in.

use super::handle::AggregateHandle;
use super::task::{current_runtime, launch, settle_all, Batch, Outcome, Settled};
use crate::error::{AggregateError, Result, ServiceError};
use crate::models::AggregateResult;
use crate::service::SharedService;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A policy ready to run, with whatever data it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    FailFast,
    FailPartial,
    FailSoft { fallback: String },
    CompletionOrder,
}

fn keep(_index: usize, _service: &str, outcome: Outcome) -> Outcome {
    outcome
}

/// All tasks must succeed.
///
/// Waits for every task to settle. On success the values are joined with a
/// single space in submission order. If any task failed the aggregate fails
/// with the lowest-index failure, and no partial join is produced.
pub fn fail_fast(batch: Batch) -> Result<AggregateHandle<String>> {
    let runtime = current_runtime()?;
    info!("Fail-fast: launching {} tasks", batch.len());
    let launched = launch(&runtime, batch, keep);

    Ok(AggregateHandle::spawn(&runtime, async move {
        let values = settle_all(launched)
            .await
            .into_iter()
            .map(Settled::into_result)
            .collect::<Result<Vec<_>>>()?;

        Ok(values.join(" "))
    }))
}

/// Keep only the successes.
///
/// Never fails: failed tasks are dropped from the list, which may end up
/// empty.
pub fn fail_partial(batch: Batch) -> Result<AggregateHandle<Vec<String>>> {
    let runtime = current_runtime()?;
    info!("Fail-partial: launching {} tasks", batch.len());
    let launched = launch(&runtime, batch, keep);

    Ok(AggregateHandle::spawn(&runtime, async move {
        let values: Vec<String> = settle_all(launched)
            .await
            .into_iter()
            .filter_map(|settled| match settled.outcome {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(
                        "Dropping task {} ({}): {}",
                        settled.index, settled.service, e
                    );
                    None
                }
            })
            .collect();

        Ok(values)
    }))
}

/// Replace every failure with `fallback`.
///
/// Never fails, and always yields exactly one token per task. Substitutions
/// are indistinguishable from real values in the result, so each one is
/// logged as a warning where it happens.
pub fn fail_soft(batch: Batch, fallback: impl Into<String>) -> Result<AggregateHandle<String>> {
    let runtime = current_runtime()?;
    let fallback = fallback.into();
    info!("Fail-soft: launching {} tasks", batch.len());

    let substitute = fallback.clone();
    let recover = move |index: usize, service: &str, outcome: Outcome| match outcome {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(
                "Task {} ({}) failed, using fallback {:?}: {}",
                index, service, substitute, e
            );
            Ok(substitute.clone())
        }
    };
    let launched = launch(&runtime, batch, recover);

    Ok(AggregateHandle::spawn(&runtime, async move {
        let values: Vec<String> = settle_all(launched)
            .await
            .into_iter()
            .map(|settled| settled.outcome.unwrap_or_else(|_| fallback.clone()))
            .collect();

        Ok(values.join(" "))
    }))
}

/// Successes in the order they completed.
///
/// Every task reports its outcome over a channel as soon as it settles; a
/// single consumer owns the list and appends in arrival order. Any failure
/// fails the aggregate, but only after every task has settled; the
/// failure reported is the first one to arrive.
pub fn completion_order(batch: Batch) -> Result<AggregateHandle<Vec<String>>> {
    let runtime = current_runtime()?;
    let service_ids = batch.service_ids();
    info!("Completion-order: launching {} tasks", batch.len());

    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Outcome)>();
    let report = move |index: usize, _service: &str, outcome: Outcome| {
        // The receiver only goes away if the caller's runtime is shutting down.
        let _ = tx.send((index, outcome.clone()));
        outcome
    };
    // Senders live inside the tasks, so the channel closes once all have settled.
    drop(launch(&runtime, batch, report));

    Ok(AggregateHandle::spawn(&runtime, async move {
        let mut order = Vec::with_capacity(service_ids.len());
        let mut settled = vec![false; service_ids.len()];
        let mut failure: Option<(usize, ServiceError)> = None;

        while let Some((index, outcome)) = rx.recv().await {
            settled[index] = true;
            match outcome {
                Ok(value) => {
                    debug!("Task {} completed at position {}", index, order.len());
                    order.push(value);
                }
                Err(e) => {
                    debug!("Task {} ({}) failed: {}", index, service_ids[index], e);
                    failure.get_or_insert((index, e));
                }
            }
        }

        if failure.is_none() {
            failure = settled
                .iter()
                .position(|done| !done)
                .map(|index| (index, ServiceError::Aborted));
        }

        match failure {
            Some((index, source)) => Err(AggregateError::Service {
                index,
                service: service_ids[index].clone(),
                source,
            }),
            None => Ok(order),
        }
    }))
}

/// Fan one message out to every service and join the answers.
///
/// Behaves like [`fail_fast`] over a broadcast batch.
pub fn process(services: &[SharedService], message: &str) -> Result<AggregateHandle<String>> {
    fail_fast(Batch::broadcast(services, message))
}

/// Run any strategy, producing a shape-tagged result.
pub fn run(strategy: Strategy, batch: Batch) -> Result<AggregateHandle<AggregateResult>> {
    let handle = match strategy {
        Strategy::FailFast => fail_fast(batch)?.map(AggregateResult::Joined),
        Strategy::FailPartial => fail_partial(batch)?.map(AggregateResult::List),
        Strategy::FailSoft { fallback } => fail_soft(batch, fallback)?.map(AggregateResult::Joined),
        Strategy::CompletionOrder => completion_order(batch)?.map(AggregateResult::List),
    };

    Ok(handle)
}
