use clap::{Parser, Subcommand};

use crate::cli::{ApplyArgs, BackupArgs, HistoryArgs, QueryArgs, RestoreArgs};

/// Apply versioned SQL change scripts to a database exactly once
///
/// Sluice records every executed statement in a history table inside the
/// target database. A script whose id already appears there is skipped, so
/// a release can be re-run safely after a partial failure has been dealt
/// with by hand.
#[derive(Parser)]
#[command(version, about, name = "sluice")]
pub struct Args {
    /// Connection string, e.g. "Data Source=app.db;Busy Timeout=5000" or a
    /// bare database path
    #[arg(short, long, global = true, env = "SLUICE_CONNECTION")]
    pub connection: Option<String>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print results as JSON instead of markdown
    #[arg(long, global = true)]
    pub json: bool,

    /// Token that separates batches in scripts (default: GO)
    #[arg(long, global = true)]
    pub separator: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the Sluice CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Create the history table
    Init,
    /// Show whether the database is initialized and its schema version
    #[command(alias = "s")]
    Status,
    /// List executed change scripts
    #[command(alias = "h")]
    History(HistoryArgs),
    /// Execute a change script unless it has already run
    #[command(alias = "a")]
    Apply(ApplyArgs),
    /// Run ad-hoc SQL outside the history table
    #[command(alias = "q")]
    Query(QueryArgs),
    /// Write a copy of a database to a file
    Backup(BackupArgs),
    /// Replace a database with the contents of a backup file
    Restore(RestoreArgs),
    /// Check that the connection may make schema changes
    Validate,
}
