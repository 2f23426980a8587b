//! Pass-through administration and ad-hoc query operations.

use std::{fs, io, path::Path};

use log::info;
use rusqlite::backup::Progress;

use super::{
    script_ops::{run_batches, ExecutionPolicy},
    Engine,
};
use crate::{
    error::{DatabaseResultExt, Result, SluiceError},
    messages::LogMessage,
};

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(SluiceError::required(field))
    } else {
        Ok(())
    }
}

impl Engine {
    /// Writes a full copy of `database_name` to `destination`, creating
    /// missing parent directories. Returns the engine output.
    pub fn backup_database(&self, database_name: &str, destination: &Path) -> Result<Vec<LogMessage>> {
        let _usage = self.begin_usage()?;
        require("databaseName", database_name)?;
        require("destinationPath", &destination.to_string_lossy())?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SluiceError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        self.connection.with_connection(|conn| {
            conn.backup(database_name, destination, None)
                .db_context("Failed to back up database")
        })?;

        let summary = format!(
            "BACKUP DATABASE [{database_name}] to '{}' completed.",
            destination.display()
        );
        info!("{summary}");
        self.connection.messages().append(LogMessage::information(summary));
        Ok(self.connection.messages().drain_all())
    }

    /// Replaces `database_name` with the contents of `source`.
    ///
    /// The connection takes an exclusive lock for the duration of the
    /// restore and returns to normal locking afterwards, whether or not the
    /// restore succeeded.
    pub fn restore_database(&self, database_name: &str, source: &Path) -> Result<Vec<LogMessage>> {
        let _usage = self.begin_usage()?;
        require("databaseName", database_name)?;
        require("sourcePath", &source.to_string_lossy())?;

        if !source.is_file() {
            return Err(SluiceError::FileSystem {
                path: source.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "backup file does not exist"),
            });
        }

        let schema = database_name.replace('"', "\"\"");
        self.connection.with_connection(|conn| {
            conn.query_row(
                &format!("PRAGMA \"{schema}\".locking_mode = EXCLUSIVE"),
                [],
                |row| row.get::<_, String>(0),
            )
            .db_context("Failed to enter exclusive mode")?;

            let restored = conn
                .restore(database_name, source, None::<fn(Progress)>)
                .db_context("Failed to restore database");

            let released = conn
                .query_row(
                    &format!("PRAGMA \"{schema}\".locking_mode = NORMAL"),
                    [],
                    |row| row.get::<_, String>(0),
                )
                .db_context("Failed to leave exclusive mode");

            restored.and(released).map(|_| ())
        })?;

        let summary = format!(
            "RESTORE DATABASE [{database_name}] from '{}' completed.",
            source.display()
        );
        info!("{summary}");
        self.connection.messages().append(LogMessage::information(summary));
        Ok(self.connection.messages().drain_all())
    }

    /// Runs every batch of `query`, stopping at the first failure.
    ///
    /// Output left over from an earlier call is discarded first.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::StatementExecutionFailed` for the failing batch.
    pub fn execute_query(&self, query: &str) -> Result<Vec<LogMessage>> {
        let _usage = self.begin_usage()?;
        self.connection.messages().clear();
        if !query.trim().is_empty() {
            self.connection.with_connection(|conn| {
                run_batches(conn, query, &self.batch_separator, ExecutionPolicy::FailFast)
            })?;
        }
        Ok(self.connection.messages().drain_all())
    }

    /// Runs every batch of every query, skipping batches that fail.
    pub fn execute_queries<S: AsRef<str>>(&self, queries: &[S]) -> Result<Vec<LogMessage>> {
        let _usage = self.begin_usage()?;
        self.connection.messages().clear();
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        self.connection.with_connection(|conn| {
            let mut succeeded = 0;
            for query in queries {
                succeeded += run_batches(
                    conn,
                    query.as_ref(),
                    &self.batch_separator,
                    ExecutionPolicy::BestEffort,
                )?;
            }
            log::debug!("{succeeded} ad-hoc statement(s) succeeded");
            Ok(())
        })?;

        Ok(self.connection.messages().drain_all())
    }
}
