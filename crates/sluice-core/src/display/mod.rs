//! Markdown formatting for engine output.
//!
//! Domain models implement [`std::fmt::Display`] directly (see
//! [`models`]); collections are wrapped in newtypes that add headings and
//! handle the empty case. Everything renders as markdown so the CLI can hand
//! it to a terminal renderer or print it as is.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │   Collection    │    │    Markdown     │
//! │ (ChangeScript,  │───▶│    Wrappers     │───▶│     Output      │
//! │  ExecResult)    │    │                 │    │   (terminal)    │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod status;

pub use collections::{ChangeHistory, LogMessages, StatementRecords};
pub use datetime::LocalDateTime;
pub use status::OperationStatus;
