//! Concurrent fan-out/fan-in over async service calls.
//!
//! A [`Batch`] pairs services with messages. Each policy entry point spawns
//! the whole batch immediately and returns an [`AggregateHandle`] the caller
//! awaits for the reduced result.

pub mod handle;
pub mod strategy;
pub mod task;

pub use handle::AggregateHandle;
pub use strategy::{completion_order, fail_fast, fail_partial, fail_soft, process, run, Strategy};
pub use task::{Batch, Outcome, Task};
