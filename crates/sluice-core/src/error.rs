//! Error types for the change-script engine.

use std::path::PathBuf;

use thiserror::Error;

/// Comprehensive error type for all engine operations.
#[derive(Error, Debug)]
pub enum SluiceError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// The history table already exists
    #[error("The database has already been initialized.")]
    AlreadyInitialized,
    /// The history table does not exist yet
    #[error("The database has not been initialized.")]
    NotInitialized,
    /// The connection credentials lack the administrative access the engine
    /// needs
    #[error("The connection must have {requirement}.")]
    InsufficientPrivilege { requirement: String },
    /// A statement failed while executing a script or query
    #[error("Statement {sequence} failed: {message}")]
    StatementExecutionFailed {
        sequence: u32,
        statement: String,
        message: String,
    },
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
    /// No live instance is registered under the handle
    #[error("No engine instance with handle {handle}")]
    InstanceNotFound { handle: String },
    /// The engine instance was torn down and must not be reused
    #[error("The engine instance has been disposed")]
    Disposed,
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> SluiceError {
        SluiceError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> SluiceError {
        SluiceError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl SluiceError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Shorthand for rejecting a required parameter that was left empty.
    pub(crate) fn required(field: impl Into<String>) -> Self {
        Self::invalid_input(field).with_reason("a value is required")
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| SluiceError::database(message).with_source(e))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SluiceError>;
