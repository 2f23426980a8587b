//! Reads and appends against the history table.

use jiff::Timestamp;
use rusqlite::{params, types::Type, Row};

use super::{HistoryStore, HISTORY_TABLE};
use crate::{
    error::{DatabaseResultExt, Result},
    models::{ChangeScript, SchemaChangeRecord},
};

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    row.get::<_, String>(idx)?
        .parse::<Timestamp>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_indicator(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    let indicator: String = row.get(idx)?;
    Ok(indicator == "Y")
}

impl HistoryStore<'_> {
    /// Highest release number recorded, successful or not; zero when empty.
    pub fn current_schema_version(&self) -> Result<i64> {
        self.ensure_initialized()?;
        self.connection
            .query_row(
                &format!("SELECT COALESCE(MAX(Numeric_Release_Number), 0) FROM {HISTORY_TABLE}"),
                [],
                |row| row.get(0),
            )
            .db_context("Failed to query schema version")
    }

    /// One entry per script, ordered by release, first execution, then name.
    pub fn change_history(&self) -> Result<Vec<ChangeScript>> {
        self.ensure_initialized()?;
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT Numeric_Release_Number,
                        Script_Id,
                        Batch_Name,
                        MIN(Executed_Date) AS Executed_Date,
                        MIN(Success_Indicator) AS Success_Indicator
                   FROM {HISTORY_TABLE}
               GROUP BY Script_Id, Numeric_Release_Number, Batch_Name
               ORDER BY Numeric_Release_Number, MIN(Executed_Date), Batch_Name"
            ))
            .db_context("Failed to prepare query")?;

        let scripts = stmt
            .query_map([], |row| {
                Ok(ChangeScript {
                    release_number: row.get(0)?,
                    script_id: row.get(1)?,
                    batch_name: row.get(2)?,
                    executed_date: parse_timestamp(row, 3)?,
                    success: parse_indicator(row, 4)?,
                })
            })
            .db_context("Failed to query change history")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch change history")?;

        Ok(scripts)
    }

    /// Statement rows of one script in sequence order.
    pub fn statement_records(&self, script_id: i32) -> Result<Vec<SchemaChangeRecord>> {
        self.ensure_initialized()?;
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT Numeric_Release_Number, Script_Id, Script_Sequence, Batch_Name,
                        Executed_Date, Success_Indicator
                   FROM {HISTORY_TABLE}
                  WHERE Script_Id = ?1
               ORDER BY Script_Sequence, Executed_Date"
            ))
            .db_context("Failed to prepare query")?;

        let records = stmt
            .query_map([script_id], |row| {
                Ok(SchemaChangeRecord {
                    release_number: row.get(0)?,
                    script_id: row.get(1)?,
                    statement_sequence: row.get(2)?,
                    batch_name: row.get(3)?,
                    executed_date: parse_timestamp(row, 4)?,
                    success: parse_indicator(row, 5)?,
                })
            })
            .db_context("Failed to query statement records")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch statement records")?;

        Ok(records)
    }

    /// Whether any row exists for `script_id`, whatever its outcome.
    pub fn is_script_applied(&self, script_id: i32) -> Result<bool> {
        self.connection
            .query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {HISTORY_TABLE} WHERE Script_Id = ?1)"),
                [script_id],
                |row| row.get(0),
            )
            .db_context("Failed to check script history")
    }

    /// Appends one statement row stamped with the database clock.
    pub fn record_statement(
        &self,
        release_number: i64,
        script_id: i32,
        statement_sequence: u32,
        batch_name: &str,
        success: bool,
    ) -> Result<()> {
        let mut stmt = self
            .connection
            .prepare_cached(&format!(
                "INSERT INTO {HISTORY_TABLE}
                    (Numeric_Release_Number, Script_Id, Script_Sequence, Batch_Name,
                     Executed_Date, Success_Indicator)
                 VALUES (?1, ?2, ?3, ?4, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), ?5)"
            ))
            .db_context("Failed to prepare history insert")?;

        stmt.execute(params![
            release_number,
            script_id,
            statement_sequence,
            batch_name,
            if success { "Y" } else { "N" },
        ])
        .db_context("Failed to record schema change")?;

        Ok(())
    }
}
