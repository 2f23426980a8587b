//! Per-statement history row.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One executed statement of a change script. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaChangeRecord {
    pub release_number: i64,
    pub script_id: i32,
    /// 1-based position of the statement within its script
    pub statement_sequence: u32,
    pub batch_name: String,
    /// Database clock at insert time (UTC)
    pub executed_date: Timestamp,
    pub success: bool,
}
