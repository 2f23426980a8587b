//! Subcommand arguments and their handlers.
//!
//! Each subcommand has a clap `Args` struct here and a matching method on
//! [`Cli`], which calls the registry and renders the outcome either as
//! markdown through the [`TerminalRenderer`] or as JSON.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use jiff::Timestamp;
use log::debug;
use serde::Serialize;
use sluice_core::{
    display::{ChangeHistory, LogMessages, OperationStatus, StatementRecords},
    ExecutionOutcome, InstanceHandle, InstanceRegistry, LogMessage,
};

use crate::{args::Commands, renderer::TerminalRenderer};

/// List executed change scripts
///
/// Without `--script`, shows one line per script with its aggregated
/// outcome. With `--script`, shows every recorded statement of that script,
/// which tells how far a failed script got.
#[derive(Args)]
pub struct HistoryArgs {
    #[arg(long, help = "Show the per-statement rows of one script")]
    pub script: Option<i32>,
}

/// Execute a change script
///
/// The file is split into batches on separator lines. The script is skipped
/// when its id already has history, even if the earlier attempt failed.
#[derive(Args)]
pub struct ApplyArgs {
    #[arg(help = "Path to the SQL change script")]
    pub file: PathBuf,
    #[arg(short, long, help = "Release number the script belongs to")]
    pub release: i64,
    #[arg(short = 'i', long, help = "Stable identifier of the script")]
    pub script_id: i32,
    #[arg(short, long, help = "Display name (defaults to the file name)")]
    pub name: Option<String>,
}

impl ApplyArgs {
    fn script_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.file.display().to_string())
        })
    }
}

/// Run ad-hoc SQL
///
/// A single argument stops at the first failing batch. With several
/// arguments every batch is attempted and failures are only logged.
#[derive(Args)]
pub struct QueryArgs {
    #[arg(required = true, help = "SQL text; may contain separator lines")]
    pub sql: Vec<String>,
}

/// Back up a database
#[derive(Args)]
pub struct BackupArgs {
    #[arg(help = "Schema name of the database to copy, usually 'main'")]
    pub database: String,
    #[arg(help = "Destination file. Defaults to $XDG_DATA_HOME/sluice/backups/")]
    pub path: Option<PathBuf>,
}

/// Restore a database
#[derive(Args)]
pub struct RestoreArgs {
    #[arg(help = "Schema name of the database to replace, usually 'main'")]
    pub database: String,
    #[arg(help = "Backup file to restore from")]
    pub path: PathBuf,
}

#[derive(Serialize)]
struct StatusReport {
    database: String,
    initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<i64>,
}

/// Dispatches subcommands against one registered engine instance.
pub struct Cli {
    registry: InstanceRegistry,
    handle: InstanceHandle,
    renderer: TerminalRenderer,
    json: bool,
}

impl Cli {
    pub fn new(
        registry: InstanceRegistry,
        handle: InstanceHandle,
        renderer: TerminalRenderer,
        json: bool,
    ) -> Self {
        Self {
            registry,
            handle,
            renderer,
            json,
        }
    }

    pub fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init => self.init(),
            Commands::Status => self.status(),
            Commands::History(args) => self.history(&args),
            Commands::Apply(args) => self.apply(&args),
            Commands::Query(args) => self.query(&args),
            Commands::Backup(args) => self.backup(&args),
            Commands::Restore(args) => self.restore(&args),
            Commands::Validate => self.validate(),
        }
    }

    fn output<T: Serialize + ?Sized>(&self, value: &T, markdown: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
            println!("{json}");
            Ok(())
        } else {
            self.renderer.render(&markdown())
        }
    }

    fn messages(&self, messages: Vec<LogMessage>) -> Result<()> {
        let messages = LogMessages(messages);
        self.output(&*messages, || messages.to_string())
    }

    fn init(&self) -> Result<()> {
        self.registry
            .initialize_database(self.handle)
            .context("Failed to initialize database")?;
        let status = OperationStatus::success("Database initialized.");
        self.output(&serde_json::json!({ "initialized": true }), || status.to_string())
    }

    fn status(&self) -> Result<()> {
        let initialized = self
            .registry
            .is_database_initialized(self.handle)
            .context("Failed to check database state")?;
        let schema_version = if initialized {
            Some(
                self.registry
                    .schema_version(self.handle)
                    .context("Failed to read schema version")?,
            )
        } else {
            None
        };

        let report = StatusReport {
            database: self.registry.get(self.handle)?.settings().to_string(),
            initialized,
            schema_version,
        };

        self.output(&report, || {
            let mut text = format!("# Status\n\n- Database: {}\n", report.database);
            match report.schema_version {
                Some(version) => text.push_str(&format!(
                    "- Initialized: yes\n- Schema version: {version}\n"
                )),
                None => text.push_str("- Initialized: no\n"),
            }
            text
        })
    }

    fn history(&self, args: &HistoryArgs) -> Result<()> {
        match args.script {
            Some(script_id) => {
                let records = StatementRecords(
                    self.registry
                        .statement_records(self.handle, script_id)
                        .context("Failed to read statement history")?,
                );
                self.output(&*records, || records.to_string())
            }
            None => {
                let history = ChangeHistory(
                    self.registry
                        .change_history(self.handle)
                        .context("Failed to read change history")?,
                );
                self.output(&*history, || history.to_string())
            }
        }
    }

    fn apply(&self, args: &ApplyArgs) -> Result<()> {
        let text = fs::read_to_string(&args.file)
            .with_context(|| format!("Failed to read script {}", args.file.display()))?;
        let name = args.script_name();
        debug!("applying {} as script {} \"{name}\"", args.file.display(), args.script_id);

        let result = self
            .registry
            .execute_change_script(self.handle, args.release, args.script_id, &name, &text)
            .with_context(|| format!("Failed to execute script \"{name}\""))?;
        self.output(&result, || result.to_string())?;

        if result.outcome == ExecutionOutcome::Failed {
            bail!("Change script \"{name}\" failed");
        }
        Ok(())
    }

    fn query(&self, args: &QueryArgs) -> Result<()> {
        let messages = match args.sql.as_slice() {
            [single] => self.registry.execute_query(self.handle, single),
            many => self.registry.execute_queries(self.handle, many),
        }
        .context("Query failed")?;
        self.messages(messages)
    }

    fn backup(&self, args: &BackupArgs) -> Result<()> {
        let destination = match &args.path {
            Some(path) => path.clone(),
            None => default_backup_path(&args.database)?,
        };
        let messages = self
            .registry
            .backup_database(self.handle, &args.database, &destination)
            .context("Backup failed")?;
        self.messages(messages)
    }

    fn restore(&self, args: &RestoreArgs) -> Result<()> {
        let messages = self
            .registry
            .restore_database(self.handle, &args.database, &args.path)
            .context("Restore failed")?;
        self.messages(messages)
    }

    fn validate(&self) -> Result<()> {
        if let Err(e) = self.registry.validate_connection(self.handle) {
            let status = OperationStatus::failure(e.to_string());
            self.output(
                &serde_json::json!({ "valid": false, "error": &status.message }),
                || status.to_string(),
            )?;
            return Err(e).context("Connection validation failed");
        }
        let status = OperationStatus::success("The connection may make schema changes.");
        self.output(&serde_json::json!({ "valid": true }), || status.to_string())
    }
}

/// `$XDG_DATA_HOME/sluice/backups/<database>-<UTC timestamp>.db`
fn default_backup_path(database: &str) -> Result<PathBuf> {
    let file_name = format!(
        "{database}-{}.db",
        Timestamp::now().strftime("%Y%m%dT%H%M%SZ")
    );
    xdg::BaseDirectories::with_prefix("sluice")
        .place_data_file(Path::new("backups").join(file_name))
        .context("Failed to resolve the default backup directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_name_defaults_to_file_stem() {
        let args = ApplyArgs {
            file: PathBuf::from("/srv/release-3/042-add-index.sql"),
            release: 3,
            script_id: 42,
            name: None,
        };
        assert_eq!(args.script_name(), "042-add-index");

        let named = ApplyArgs {
            name: Some("Add index".to_string()),
            ..args
        };
        assert_eq!(named.script_name(), "Add index");
    }
}
