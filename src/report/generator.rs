//! Markdown and JSON report generation.
//!
//! This module renders a [`RunReport`] for the terminal or a file.

use crate::models::{AggregateResult, PolicyKind, RunMetadata, RunOutcome, RunReport};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# Fanout Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_tasks_section(&report.metadata));
    output.push_str(&generate_outcome_section(
        report.metadata.policy,
        &report.outcome,
    ));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Policy:** `{}`\n", metadata.policy));
    section.push_str(&format!(
        "- **Started:** {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Services:** {}\n", metadata.services.len()));
    if let Some(ref fallback) = metadata.fallback {
        section.push_str(&format!("- **Fallback:** `{}`\n", fallback));
    }
    section.push_str(&format!("- **Duration:** {}ms\n", metadata.duration_ms));
    section.push('\n');

    section
}

/// Generate the table of submitted tasks.
fn generate_tasks_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Tasks\n\n");
    section.push_str("| # | Service | Message |\n");
    section.push_str("|:---:|:---|:---|\n");

    for (index, service) in metadata.services.iter().enumerate() {
        // A single message was broadcast to every service
        let message = metadata
            .messages
            .get(index)
            .or_else(|| metadata.messages.first())
            .map(String::as_str)
            .unwrap_or("");
        section.push_str(&format!("| {} | {} | `{}` |\n", index, service, message));
    }
    section.push('\n');

    section
}

/// Generate the outcome section.
fn generate_outcome_section(policy: PolicyKind, outcome: &RunOutcome) -> String {
    let mut section = String::new();

    section.push_str("## Outcome\n\n");

    match outcome {
        RunOutcome::Succeeded { result } => {
            section.push_str("**Status:** ✅ succeeded\n\n");
            section.push_str(&generate_result_block(policy, result));
        }
        RunOutcome::Failed { error } => {
            section.push_str("**Status:** ❌ failed\n\n");
            section.push_str(&format!("> {}\n\n", error));
        }
    }

    section
}

/// Render the aggregate value.
fn generate_result_block(policy: PolicyKind, result: &AggregateResult) -> String {
    let mut block = String::new();

    match result {
        AggregateResult::Joined(joined) => {
            block.push_str(&format!("```\n{}\n```\n\n", joined));
        }
        AggregateResult::List(values) if values.is_empty() => {
            block.push_str("*No successful results.*\n\n");
        }
        AggregateResult::List(values) => {
            for (position, value) in values.iter().enumerate() {
                block.push_str(&format!("{}. `{}`\n", position + 1, value));
            }
            block.push('\n');
        }
    }

    if policy == PolicyKind::CompletionOrder {
        block.push_str("*Listed in completion order.*\n\n");
    }

    block
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
