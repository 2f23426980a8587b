//! Outcome of a change script execution attempt.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::messages::{join_messages, LogMessage};

/// Terminal state of one change script execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOutcome {
    /// The script id already has history rows
    Skipped,

    /// A statement failed or the engine reported an error
    Failed,

    /// Every statement ran without error
    Success,
}

impl FromStr for ExecutionOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skipped" => Ok(ExecutionOutcome::Skipped),
            "failed" => Ok(ExecutionOutcome::Failed),
            "success" => Ok(ExecutionOutcome::Success),
            _ => Err(format!("Invalid execution outcome: {s}")),
        }
    }
}

impl ExecutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionOutcome::Skipped => "skipped",
            ExecutionOutcome::Failed => "failed",
            ExecutionOutcome::Success => "success",
        }
    }
}

/// Result of `execute_change_script`, with a human-readable explanation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionResult {
    pub outcome: ExecutionOutcome,

    /// Explanation including any captured engine output
    pub message: String,

    /// Number of statements that were run and recorded
    pub statements_executed: u32,

    /// Engine output captured while the script ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<LogMessage>,
}

impl ExecutionResult {
    pub(crate) fn skipped(script_name: &str) -> Self {
        Self {
            outcome: ExecutionOutcome::Skipped,
            message: format!("The script \"{script_name}\" was already executed."),
            statements_executed: 0,
            messages: Vec::new(),
        }
    }

    pub(crate) fn succeeded(
        script_name: &str,
        statements_executed: u32,
        messages: Vec<LogMessage>,
    ) -> Self {
        let message = format!("The script \"{script_name}\" executed successfully.")
            + &labelled_output(" SQL Output: ", &messages);
        Self {
            outcome: ExecutionOutcome::Success,
            message,
            statements_executed,
            messages,
        }
    }

    /// A statement raised an error; its row was recorded as failed.
    pub(crate) fn statement_failed(
        script_name: &str,
        error: &str,
        statements_executed: u32,
        messages: Vec<LogMessage>,
    ) -> Self {
        let message = format!(
            "The script \"{script_name}\" execution encountered a fatal error. Error details: {error}"
        ) + &labelled_output(" Additional SQL Output: ", &messages);
        Self {
            outcome: ExecutionOutcome::Failed,
            message,
            statements_executed,
            messages,
        }
    }

    /// The engine reported an error-level message while a statement ran.
    pub(crate) fn server_error(
        script_name: &str,
        statements_executed: u32,
        messages: Vec<LogMessage>,
    ) -> Self {
        let message = format!("The script \"{script_name}\" execution failed.")
            + &labelled_output(" SQL Error: ", &messages);
        Self {
            outcome: ExecutionOutcome::Failed,
            message,
            statements_executed,
            messages,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ExecutionOutcome::Success
    }
}

fn labelled_output(label: &str, messages: &[LogMessage]) -> String {
    if messages.is_empty() {
        String::new()
    } else {
        format!("{label}{}", join_messages(messages))
    }
}
