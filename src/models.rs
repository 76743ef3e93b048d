//! Data models shared by the aggregator, the config layer, and reports.

use crate::aggregator::Strategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure-handling policy, as selected on the command line or in config.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Any failure fails the whole aggregate
    #[default]
    FailFast,
    /// Failures are dropped, successes kept in order
    FailPartial,
    /// Failures are replaced by a fallback value
    FailSoft,
    /// Successes in the order they completed
    CompletionOrder,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::FailFast => write!(f, "fail-fast"),
            PolicyKind::FailPartial => write!(f, "fail-partial"),
            PolicyKind::FailSoft => write!(f, "fail-soft"),
            PolicyKind::CompletionOrder => write!(f, "completion-order"),
        }
    }
}

impl PolicyKind {
    /// Build the runnable strategy. `fallback` is only used by fail-soft.
    pub fn into_strategy(self, fallback: &str) -> Strategy {
        match self {
            PolicyKind::FailFast => Strategy::FailFast,
            PolicyKind::FailPartial => Strategy::FailPartial,
            PolicyKind::FailSoft => Strategy::FailSoft {
                fallback: fallback.to_string(),
            },
            PolicyKind::CompletionOrder => Strategy::CompletionOrder,
        }
    }
}

/// The reduced value of one aggregate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "shape", content = "value")]
pub enum AggregateResult {
    /// Values joined by a single space (fail-fast, fail-soft).
    Joined(String),
    /// Individual values (fail-partial, completion-order).
    List(Vec<String>),
}

impl AggregateResult {
    /// The individual values making up the result.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            AggregateResult::Joined(s) => s.split_whitespace().collect(),
            AggregateResult::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateResult::Joined(s) => write!(f, "{}", s),
            AggregateResult::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

/// Metadata about one aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Policy the run used.
    pub policy: PolicyKind,
    /// When the tasks were launched.
    pub started_at: DateTime<Utc>,
    /// Wall-clock time until the aggregate settled, in milliseconds.
    pub duration_ms: u64,
    /// Service ids in submission order.
    pub services: Vec<String>,
    /// Messages in submission order (one entry when broadcast).
    pub messages: Vec<String>,
    /// Fallback value, reported only for fail-soft runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// How the aggregate settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum RunOutcome {
    /// The aggregate produced a value.
    Succeeded { result: AggregateResult },
    /// The aggregate failed or timed out.
    Failed { error: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }
}

/// The complete report for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub outcome: RunOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_display_matches_serde() {
        for policy in [
            PolicyKind::FailFast,
            PolicyKind::FailPartial,
            PolicyKind::FailSoft,
            PolicyKind::CompletionOrder,
        ] {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{}\"", policy));
        }
    }

    #[test]
    fn test_into_strategy_carries_fallback() {
        assert_eq!(
            PolicyKind::FailSoft.into_strategy("N/A"),
            Strategy::FailSoft {
                fallback: "N/A".to_string()
            }
        );
        assert_eq!(PolicyKind::FailFast.into_strategy("N/A"), Strategy::FailFast);
    }

    #[test]
    fn test_result_tokens() {
        let joined = AggregateResult::Joined("Alpha:HELLO Beta:WORLD".to_string());
        assert_eq!(joined.tokens(), vec!["Alpha:HELLO", "Beta:WORLD"]);

        let empty = AggregateResult::Joined(String::new());
        assert!(empty.tokens().is_empty());

        let list = AggregateResult::List(vec!["Good1:X".to_string(), "Good2:Z".to_string()]);
        assert_eq!(list.tokens(), vec!["Good1:X", "Good2:Z"]);
        assert_eq!(list.to_string(), "[Good1:X, Good2:Z]");
    }

    #[test]
    fn test_run_outcome_status_tag() {
        let failed = RunOutcome::Failed {
            error: "boom".to_string(),
        };
        assert!(!failed.is_success());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn test_result_json_shape() {
        let list = AggregateResult::List(vec!["a".to_string()]);
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"{"shape":"list","value":["a"]}"#);
    }
}
