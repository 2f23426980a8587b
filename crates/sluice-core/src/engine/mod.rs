//! Change-script execution engine.
//!
//! An [`Engine`] owns one [`ConnectionManager`] and exposes every operation
//! of the migration surface. Each public operation holds a usage guard for
//! its whole body, so the instance is never evicted while work is running
//! and the idle timer re-arms on every exit path.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │     Engine      │    │   Connection    │    │  HistoryStore   │
//! │ (script_ops,    │───▶│    Manager      │───▶│ (history table) │
//! │  admin_ops)     │    │ (usage, timer)  │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use sluice_core::{EngineBuilder, ExecutionOutcome};
//!
//! # fn example() -> Result<(), sluice_core::SluiceError> {
//! let engine = EngineBuilder::new("Data Source=app.db").build()?;
//! if !engine.is_database_initialized()? {
//!     engine.initialize_database()?;
//! }
//!
//! let result = engine.execute_change_script(
//!     1,
//!     100,
//!     "100-create-users",
//!     "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)\nGO\n",
//! )?;
//! assert_eq!(result.outcome, ExecutionOutcome::Success);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use rusqlite::Connection;

use crate::{
    config::ConnectionSettings,
    connection::{probe_privileges, ConnectionManager},
    error::Result,
    history::HistoryStore,
    lifecycle::{UsageGuard, UsageTracker},
    models::{ChangeScript, SchemaChangeRecord},
};

pub mod admin_ops;
pub mod builder;
pub mod script_ops;


pub use builder::EngineBuilder;

/// One migration engine bound to one target database.
#[derive(Debug)]
pub struct Engine {
    pub(crate) connection: ConnectionManager,
    pub(crate) batch_separator: String,
}

impl Engine {
    pub fn settings(&self) -> &ConnectionSettings {
        self.connection.settings()
    }

    pub fn batch_separator(&self) -> &str {
        &self.batch_separator
    }

    /// Usage counter and idle timer of this instance.
    pub fn usage(&self) -> &Arc<UsageTracker> {
        self.connection.usage()
    }

    /// Starts a scoped usage, keeping the instance alive across several
    /// calls.
    pub fn begin_usage(&self) -> Result<UsageGuard> {
        self.connection.begin_usage()
    }

    /// Creates the history table.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::AlreadyInitialized` if it already exists and
    /// `SluiceError::InsufficientPrivilege` if the connection cannot write.
    pub fn initialize_database(&self) -> Result<()> {
        let _usage = self.begin_usage()?;
        let result = self.connection.with_connection(|conn| {
            probe_privileges(conn)?;
            HistoryStore::new(conn).initialize()
        });
        self.connection.messages().clear();
        result
    }

    /// Whether the history table exists. Validates privileges first.
    pub fn is_database_initialized(&self) -> Result<bool> {
        let _usage = self.begin_usage()?;
        self.connection.with_connection(|conn| {
            probe_privileges(conn)?;
            HistoryStore::new(conn).is_initialized()
        })
    }

    /// Highest recorded release number, or zero.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::NotInitialized` before initialization.
    pub fn schema_version(&self) -> Result<i64> {
        let _usage = self.begin_usage()?;
        self.with_initialized_store(|store| store.current_schema_version())
    }

    /// Every recorded change script, aggregated per script.
    pub fn change_history(&self) -> Result<Vec<ChangeScript>> {
        let _usage = self.begin_usage()?;
        self.with_initialized_store(|store| store.change_history())
    }

    /// Per-statement rows of one script, in execution order.
    pub fn statement_records(&self, script_id: i32) -> Result<Vec<SchemaChangeRecord>> {
        let _usage = self.begin_usage()?;
        self.with_initialized_store(|store| store.statement_records(script_id))
    }

    /// Switches to a persistent shared connection.
    pub fn open_connection(&self) -> Result<()> {
        let _usage = self.begin_usage()?;
        self.connection.open_connection()
    }

    /// Returns to one connection per unit of work.
    pub fn close_connection(&self) -> Result<()> {
        let _usage = self.begin_usage()?;
        self.connection.close_connection()
    }

    /// Fails with `InsufficientPrivilege` unless the credentials allow
    /// schema changes.
    pub fn validate_connection(&self) -> Result<()> {
        let _usage = self.begin_usage()?;
        self.connection.with_connection(|conn| probe_privileges(conn))
    }

    /// Releases every resource. Further operations fail with `Disposed`.
    pub fn dispose(&self) {
        self.connection.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.usage().is_disposed()
    }

    fn with_initialized_store<T>(&self, f: impl FnOnce(&HistoryStore<'_>) -> Result<T>) -> Result<T> {
        self.connection.with_connection(|conn: &mut Connection| {
            probe_privileges(conn)?;
            let store = HistoryStore::new(conn);
            store.ensure_initialized()?;
            f(&store)
        })
    }
}
