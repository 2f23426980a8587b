//! Core library for the Sluice schema migration engine.
//!
//! Sluice applies ordered change scripts to a database exactly once, records
//! every executed statement in an append-only history table, and exposes a
//! handful of administrative pass-through operations (backup, restore,
//! ad-hoc queries). Engines are addressed through an [`InstanceRegistry`]
//! that reclaims instances left idle.
//!
//! # Quick Start
//!
//! ```rust
//! use sluice_core::{ExecutionOutcome, InstanceRegistry};
//!
//! # fn example() -> Result<(), sluice_core::SluiceError> {
//! # let dir = tempfile::TempDir::new().unwrap();
//! # let path = dir.path().join("app.db");
//! let registry = InstanceRegistry::new();
//! let handle = registry.create_instance(&format!("Data Source={}", path.display()))?;
//!
//! registry.initialize_database(handle)?;
//! let result = registry.execute_change_script(
//!     handle,
//!     1,
//!     1,
//!     "001-create-users",
//!     "CREATE TABLE users (id INTEGER PRIMARY KEY)\nGO\n",
//! )?;
//! assert_eq!(result.outcome, ExecutionOutcome::Success);
//! assert_eq!(registry.schema_version(handle)?, 1);
//!
//! registry.dispose(handle);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Engine messages
//!
//! Every connection carries two SQL functions that report output without
//! failing the statement: `print(text)` and `raise_message(severity, text)`.
//! Severities above 10 are errors; a change script whose statement raises one
//! is marked failed.

pub mod config;
pub mod connection;
pub mod display;
pub mod engine;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod messages;
pub mod models;
pub mod registry;
pub mod splitter;

pub use config::{AccessMode, ConnectionSettings, EngineOptions};
pub use engine::{Engine, EngineBuilder};
pub use error::{Result, SluiceError};
pub use messages::{LogLevel, LogMessage};
pub use models::{ChangeScript, ExecutionOutcome, ExecutionResult, SchemaChangeRecord};
pub use registry::{InstanceHandle, InstanceRegistry};
pub use splitter::split_sql_script;
