//! Data models for change scripts and their execution history.
//!
//! - [`SchemaChangeRecord`]: one persisted row per executed statement
//! - [`ChangeScript`]: history rows of one script aggregated for display
//! - [`ExecutionResult`]: outcome of one attempt to run a change script

pub mod change_script;
pub mod record;
pub mod result;

pub use change_script::ChangeScript;
pub use record::SchemaChangeRecord;
pub use result::{ExecutionOutcome, ExecutionResult};
