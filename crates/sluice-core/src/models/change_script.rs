//! Change script summary derived from history rows.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One change script as recorded in the history table.
///
/// Aggregated from every statement row sharing the same script id, release
/// number and batch name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeScript {
    /// Release the script belongs to
    pub release_number: i64,

    /// Stable identity of the script
    pub script_id: i32,

    /// Display name of the script
    pub batch_name: String,

    /// Earliest execution time among the script's statements (UTC)
    pub executed_date: Timestamp,

    /// True only if every recorded statement succeeded
    pub success: bool,
}
