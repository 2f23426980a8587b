//! Change-script and ad-hoc batch execution.
//!
//! Two execution policies exist on purpose. Change scripts run
//! [`ExecutionPolicy::FailFast`]: the first failing statement ends the
//! script. `execute_queries` runs [`ExecutionPolicy::BestEffort`]: a failing
//! statement is logged and the remaining, unrelated statements still run.

use log::{debug, info, warn};
use rusqlite::{fallible_iterator::FallibleIterator, Batch, Connection};

use super::Engine;
use crate::{
    connection::probe_privileges,
    error::{Result, SluiceError},
    history::HistoryStore,
    messages::{join_messages, LogMessage},
    models::ExecutionResult,
    splitter::split_sql_script,
};

/// What to do when a statement of an ad-hoc batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Stop and return the error.
    FailFast,
    /// Log the error and continue with the next statement.
    BestEffort,
}

impl Engine {
    /// Runs a change script unless its id already has history.
    ///
    /// The script is split into batches; blank batches are ignored. Each
    /// batch runs in order and is recorded in the history table as soon as
    /// its outcome is known, so partial progress stays visible when a later
    /// batch fails. Statement failures become a `Failed` result, never an
    /// error.
    ///
    /// The applied check and the inserts are not one transaction: two
    /// processes racing on the same new script id may both run it.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::NotInitialized` before initialization, and
    /// database errors if history rows cannot be read or written.
    pub fn execute_change_script(
        &self,
        release_number: i64,
        script_id: i32,
        script_name: &str,
        script_text: &str,
    ) -> Result<ExecutionResult> {
        let _usage = self.begin_usage()?;
        self.connection.with_connection(|conn| {
            probe_privileges(conn)?;
            let store = HistoryStore::new(conn);
            store.ensure_initialized()?;

            if store.is_script_applied(script_id)? {
                info!("script {script_id} \"{script_name}\" skipped: already executed");
                return Ok(ExecutionResult::skipped(script_name));
            }

            self.connection.messages().clear();
            let mut output: Vec<LogMessage> = Vec::new();
            let mut sequence: u32 = 0;

            let statements = split_sql_script(script_text, &self.batch_separator)
                .filter(|statement| !statement.trim().is_empty());

            for statement in statements {
                sequence += 1;
                debug!("script {script_id} statement {sequence}: executing");

                if let Err(e) = execute_statement(conn, statement) {
                    output.extend(self.connection.messages().drain_all());
                    store.record_statement(release_number, script_id, sequence, script_name, false)?;

                    warn!("script {script_id} \"{script_name}\" failed at statement {sequence}: {e}");
                    return Ok(ExecutionResult::statement_failed(
                        script_name,
                        &e.to_string(),
                        sequence,
                        output,
                    ));
                }

                store.record_statement(release_number, script_id, sequence, script_name, true)?;

                let captured = self.connection.messages().drain_all();
                let reported_error = captured.iter().any(LogMessage::is_error);
                output.extend(captured);

                if reported_error {
                    warn!(
                        "script {script_id} \"{script_name}\" failed at statement {sequence}: {}",
                        join_messages(&output)
                    );
                    return Ok(ExecutionResult::server_error(script_name, sequence, output));
                }
            }

            info!("script {script_id} \"{script_name}\" executed {sequence} statement(s)");
            Ok(ExecutionResult::succeeded(script_name, sequence, output))
        })
    }
}

/// Runs every statement of one batch, stepping each through all of its
/// rows so that message functions evaluated per row all fire.
pub(crate) fn execute_statement(conn: &Connection, sql: &str) -> rusqlite::Result<()> {
    let mut batch = Batch::new(conn, sql);
    while let Some(mut stmt) = batch.next()? {
        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
    }
    Ok(())
}

/// Splits `text` and runs each non-blank batch on `conn`.
///
/// Returns the number of batches that succeeded.
pub(crate) fn run_batches(
    conn: &Connection,
    text: &str,
    separator: &str,
    policy: ExecutionPolicy,
) -> Result<u32> {
    let mut succeeded = 0;
    let statements = split_sql_script(text, separator)
        .filter(|statement| !statement.trim().is_empty())
        .zip(1u32..);

    for (statement, sequence) in statements {
        match execute_statement(conn, statement) {
            Ok(()) => succeeded += 1,
            Err(e) => match policy {
                ExecutionPolicy::FailFast => {
                    return Err(SluiceError::StatementExecutionFailed {
                        sequence,
                        statement: statement.trim().to_string(),
                        message: e.to_string(),
                    })
                }
                ExecutionPolicy::BestEffort => {
                    warn!("statement {sequence} failed and was skipped: {e}");
                }
            },
        }
    }

    Ok(succeeded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = run_batches(
            &conn,
            "CREATE TABLE a(v)\nGO\nINSERT INTO missing VALUES (1)\nGO\nCREATE TABLE b(v)\n",
            "GO",
            ExecutionPolicy::FailFast,
        )
        .unwrap_err();

        assert!(matches!(err, SluiceError::StatementExecutionFailed { sequence: 2, .. }));
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE name = 'b'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_statement_runs_through_every_row() {
        let conn = Connection::open_in_memory().unwrap();
        let err = execute_statement(
            &conn,
            "SELECT json(CASE WHEN column1 = 2 THEN 'not json' ELSE '1' END) FROM (VALUES (1), (2))",
        )
        .unwrap_err();
        assert!(err.to_string().contains("JSON"), "unexpected error: {err}");

        execute_statement(&conn, "CREATE TABLE a(v); INSERT INTO a VALUES (1), (2); SELECT v FROM a;")
            .unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM a", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_best_effort_continues_past_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let succeeded = run_batches(
            &conn,
            "CREATE TABLE a(v)\nGO\nINSERT INTO missing VALUES (1)\nGO\n\nGO\nCREATE TABLE b(v)\n",
            "GO",
            ExecutionPolicy::BestEffort,
        )
        .unwrap();

        assert_eq!(succeeded, 2);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name IN ('a', 'b')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
