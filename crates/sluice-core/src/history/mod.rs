//! Migration state stored inside the target database.
//!
//! The history table is an append-only log with one row per executed
//! statement. This module creates it and answers questions about it; the
//! engine decides what to record.

use rusqlite::Connection;

use crate::error::{DatabaseResultExt, Result, SluiceError};

mod queries;

/// Well-known name of the history table.
pub const HISTORY_TABLE: &str = "__Sluice_DbSchemaChanges";

/// Borrowed view of the history table on an open connection.
pub struct HistoryStore<'c> {
    connection: &'c Connection,
}

impl<'c> HistoryStore<'c> {
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }

    /// Whether the history table exists.
    pub fn is_initialized(&self) -> Result<bool> {
        self.connection
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [HISTORY_TABLE],
                |row| row.get(0),
            )
            .db_context("Failed to check for the history table")
    }

    /// Fails with `NotInitialized` unless the history table exists.
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized()? {
            Ok(())
        } else {
            Err(SluiceError::NotInitialized)
        }
    }

    /// Creates the history table and its guards in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::AlreadyInitialized` if the table exists.
    pub fn initialize(&self) -> Result<()> {
        if self.is_initialized()? {
            return Err(SluiceError::AlreadyInitialized);
        }

        let tx = self
            .connection
            .unchecked_transaction()
            .db_context("Failed to begin transaction")?;
        tx.execute_batch(include_str!("../../assets/schema.sql"))
            .db_context("Failed to create the history table")?;
        tx.commit().db_context("Failed to commit transaction")?;

        log::info!("history table {HISTORY_TABLE} created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        Connection::open_in_memory().expect("in-memory database")
    }

    #[test]
    fn test_initialize_once() {
        let conn = memory();
        let store = HistoryStore::new(&conn);

        assert!(!store.is_initialized().unwrap());
        assert!(matches!(store.ensure_initialized(), Err(SluiceError::NotInitialized)));

        store.initialize().unwrap();
        assert!(store.is_initialized().unwrap());
        assert!(matches!(store.initialize(), Err(SluiceError::AlreadyInitialized)));
    }
}
