//! Collection wrappers with markdown Display and empty-collection handling.

use std::{fmt, ops::Deref};

use crate::{
    messages::LogMessage,
    models::{ChangeScript, SchemaChangeRecord},
};

/// Change history of a database, one line per script.
///
/// ```rust
/// use sluice_core::display::ChangeHistory;
///
/// let history = ChangeHistory(vec![]);
/// assert_eq!(history.to_string(), "No change scripts have been executed.\n");
/// ```
pub struct ChangeHistory(pub Vec<ChangeScript>);

impl Deref for ChangeHistory {
    type Target = [ChangeScript];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ChangeHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No change scripts have been executed.");
        }

        let failed = self.0.iter().filter(|s| !s.success).count();
        writeln!(f, "# Change History")?;
        writeln!(f)?;
        for script in &self.0 {
            write!(f, "{script}")?;
        }
        writeln!(f)?;
        writeln!(f, "{} script(s), {failed} failed.", self.0.len())
    }
}

/// Statement rows of one change script.
pub struct StatementRecords(pub Vec<SchemaChangeRecord>);

impl Deref for StatementRecords {
    type Target = [SchemaChangeRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for StatementRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.0.first() else {
            return writeln!(f, "No statements recorded for this script.");
        };

        writeln!(
            f,
            "# {} (script {}, release {})",
            first.batch_name, first.script_id, first.release_number
        )?;
        writeln!(f)?;
        for record in &self.0 {
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

/// Engine output returned by administrative and ad-hoc operations.
pub struct LogMessages(pub Vec<LogMessage>);

impl Deref for LogMessages {
    type Target = [LogMessage];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for LogMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No output.");
        }
        for message in &self.0 {
            writeln!(f, "- {message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;

    fn script(id: i32, success: bool) -> ChangeScript {
        ChangeScript {
            release_number: 1,
            script_id: id,
            batch_name: format!("{id:03}-change"),
            executed_date: Timestamp::now(),
            success,
        }
    }

    #[test]
    fn test_history_summary_line() {
        let history = ChangeHistory(vec![script(1, true), script(2, false)]);
        let text = history.to_string();
        assert!(text.starts_with("# Change History"));
        assert!(text.contains("001-change"));
        assert!(text.ends_with("2 script(s), 1 failed.\n"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(
            StatementRecords(vec![]).to_string(),
            "No statements recorded for this script.\n"
        );
        assert_eq!(LogMessages(vec![]).to_string(), "No output.\n");
    }

    #[test]
    fn test_log_messages() {
        let messages = LogMessages(vec![
            LogMessage::information("copied 12 pages"),
            LogMessage::error("disk full"),
        ]);
        assert_eq!(
            messages.to_string(),
            "- [information] copied 12 pages\n- [error] disk full\n"
        );
    }
}
