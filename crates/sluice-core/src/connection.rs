//! Physical connection handling for one engine instance.
//!
//! By default every unit of work opens its own connection and closes it on
//! the way out. [`ConnectionManager::open_connection`] switches to a
//! persistent mode in which one connection (and its prepared-statement
//! cache) is shared by every call until
//! [`ConnectionManager::close_connection`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use rusqlite::{functions::FunctionFlags, types::Null, Connection, OpenFlags};

use crate::{
    config::{AccessMode, ConnectionSettings},
    error::{DatabaseResultExt, Result, SluiceError},
    lifecycle::{UsageGuard, UsageTracker},
    messages::{LogLevel, LogMessage, MessageBuffer},
};

/// Owns the connection settings, the usage tracker, the captured message
/// buffer and, in persistent mode, the shared connection.
#[derive(Debug)]
pub struct ConnectionManager {
    settings: ConnectionSettings,
    usage: Arc<UsageTracker>,
    messages: Arc<MessageBuffer>,
    shared: Mutex<Option<Connection>>,
}

impl ConnectionManager {
    pub fn new(settings: ConnectionSettings, usage: Arc<UsageTracker>) -> Self {
        Self {
            settings,
            usage,
            messages: Arc::new(MessageBuffer::new()),
            shared: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    pub fn messages(&self) -> &MessageBuffer {
        &self.messages
    }

    /// Starts a scoped usage of this instance.
    pub fn begin_usage(&self) -> Result<UsageGuard> {
        self.usage.begin_usage()
    }

    fn lock_shared(&self) -> MutexGuard<'_, Option<Connection>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a persistent connection is currently held.
    pub fn is_persistent(&self) -> bool {
        self.lock_shared().is_some()
    }

    /// Opens a new physical connection with the message functions installed.
    fn connect(&self) -> Result<Connection> {
        let flags = match self.settings.mode {
            AccessMode::ReadWrite => {
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
            }
            AccessMode::ReadOnly => {
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
            }
        };

        debug!("opening connection to {}", self.settings);
        let connection = Connection::open_with_flags(&self.settings.data_source, flags)
            .db_context("Failed to open database connection")?;

        if let Some(timeout) = self.settings.busy_timeout {
            connection
                .busy_timeout(timeout)
                .db_context("Failed to set busy timeout")?;
        }

        install_message_functions(&connection, &self.messages)?;
        Ok(connection)
    }

    /// Runs `f` against the shared connection when one is held, otherwise
    /// against a connection opened for this call and closed afterwards.
    ///
    /// The shared connection stays locked while `f` runs, so `f` must not
    /// call back into `with_connection`.
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut shared = self.lock_shared();
        if let Some(connection) = shared.as_mut() {
            return f(connection);
        }
        drop(shared);

        let mut connection = self.connect()?;
        let result = f(&mut connection);
        debug!("closing ad-hoc connection to {}", self.settings);
        let closed = close(connection);
        result.and_then(|value| closed.map(|()| value))
    }

    /// Switches to persistent mode. Does nothing when already persistent.
    pub fn open_connection(&self) -> Result<()> {
        let mut shared = self.lock_shared();
        if shared.is_none() {
            *shared = Some(self.connect()?);
            debug!("persistent connection opened");
        }
        Ok(())
    }

    /// Releases the persistent connection, if any.
    pub fn close_connection(&self) -> Result<()> {
        let connection = self.lock_shared().take();
        if let Some(connection) = connection {
            close(connection)?;
            debug!("persistent connection closed");
        }
        Ok(())
    }

    /// Tears the manager down: cancels the idle timer, resets the usage
    /// count and drops any persistent connection. Idempotent.
    pub fn dispose(&self) {
        self.usage.dispose();
        if let Some(connection) = self.lock_shared().take() {
            if let Err((_, e)) = connection.close() {
                log::warn!("Failed to close connection during disposal: {e}");
            }
        }
    }
}

fn close(connection: Connection) -> Result<()> {
    connection
        .close()
        .map_err(|(_, e)| SluiceError::database("Failed to close connection").with_source(e))
}

/// Registers `raise_message(severity, text)` and `print(text)`, which route
/// engine-side output into `messages` instead of failing the statement.
fn install_message_functions(connection: &Connection, messages: &Arc<MessageBuffer>) -> Result<()> {
    let sink = Arc::clone(messages);
    connection
        .create_scalar_function("raise_message", 2, FunctionFlags::SQLITE_UTF8, move |ctx| {
            let severity: i64 = ctx.get(0)?;
            let text: String = ctx.get(1)?;
            sink.append(LogMessage::new(LogLevel::from_severity(severity), text));
            Ok(Null)
        })
        .db_context("Failed to register raise_message function")?;

    let sink = Arc::clone(messages);
    connection
        .create_scalar_function("print", 1, FunctionFlags::SQLITE_UTF8, move |ctx| {
            let text: String = ctx.get(0)?;
            sink.append(LogMessage::information(text));
            Ok(Null)
        })
        .db_context("Failed to register print function")?;

    Ok(())
}

/// Fails with `InsufficientPrivilege` unless the connection may modify the
/// main database.
pub(crate) fn probe_privileges(connection: &Connection) -> Result<()> {
    let read_only = connection
        .is_readonly(rusqlite::MAIN_DB)
        .db_context("Failed to probe database access")?;
    let query_only: bool = connection
        .query_row("PRAGMA query_only", [], |row| row.get(0))
        .db_context("Failed to probe database access")?;

    if read_only || query_only {
        return Err(SluiceError::InsufficientPrivilege {
            requirement: "write access to the main database".to_string(),
        });
    }
    Ok(())
}
