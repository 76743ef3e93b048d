//! Fanout - concurrent aggregation of async service calls.
//!
//! Invokes a set of independent services in parallel and combines their
//! outcomes under one of four policies: fail-fast, fail-partial, fail-soft,
//! or completion-order. See [`aggregator`] for the entry points.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod service;

pub use aggregator::{AggregateHandle, Batch, Strategy};
pub use error::{AggregateError, ServiceError};
pub use models::{AggregateResult, PolicyKind};
pub use service::{Microservice, SharedService};
