//! Markdown Display implementations for the domain models.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::{
    messages::LogLevel,
    models::{ChangeScript, ExecutionOutcome, ExecutionResult, SchemaChangeRecord},
};

fn success_icon(success: bool) -> &'static str {
    if success {
        "✓"
    } else {
        "✗"
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for ChangeScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "- {} **{}** (script {}, release {}) executed {}",
            success_icon(self.success),
            self.batch_name,
            self.script_id,
            self.release_number,
            LocalDateTime(&self.executed_date)
        )
    }
}

impl fmt::Display for SchemaChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "- {} statement {} at {}",
            success_icon(self.success),
            self.statement_sequence,
            LocalDateTime(&self.executed_date)
        )
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = match self.outcome {
            ExecutionOutcome::Success => "✓ Success",
            ExecutionOutcome::Skipped => "➖ Skipped",
            ExecutionOutcome::Failed => "✗ Failed",
        };
        writeln!(f, "# {heading}")?;
        writeln!(f)?;
        writeln!(f, "- Statements executed: {}", self.statements_executed)?;
        writeln!(f)?;
        writeln!(f, "{}", self.message)?;

        if !self.messages.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Output")?;
            writeln!(f)?;
            for message in &self.messages {
                writeln!(f, "- {message}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::messages::LogMessage;

    #[test]
    fn test_change_script_line() {
        let script = ChangeScript {
            release_number: 4,
            script_id: 12,
            batch_name: "012-indexes".to_string(),
            executed_date: Timestamp::now(),
            success: false,
        };
        let line = script.to_string();
        assert!(line.starts_with("- ✗ **012-indexes** (script 12, release 4)"));
    }

    #[test]
    fn test_execution_result_lists_output() {
        let result = ExecutionResult {
            outcome: ExecutionOutcome::Failed,
            message: "The script \"x\" execution failed.".to_string(),
            statements_executed: 1,
            messages: vec![LogMessage::error("boom")],
        };
        let text = result.to_string();
        assert!(text.starts_with("# ✗ Failed"));
        assert!(text.contains("## Output"));
        assert!(text.contains("- [error] boom"));
    }
}
