//! Connection-string parsing and engine options.

use std::{fmt, str::FromStr, time::Duration};

use crate::{
    error::{Result, SluiceError},
    splitter::DEFAULT_BATCH_SEPARATOR,
};

/// How long an unused engine keeps its resources before eviction.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Access requested when opening the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

impl FromStr for AccessMode {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "readwrite" | "read_write" | "rw" => Ok(AccessMode::ReadWrite),
            "readonly" | "read_only" | "ro" => Ok(AccessMode::ReadOnly),
            _ => Err(SluiceError::Configuration {
                message: format!("Invalid access mode: {s}"),
            }),
        }
    }
}

/// Parsed form of a connection string.
///
/// Accepts either a bare database path or `;`-separated `key=value` pairs:
///
/// ```rust
/// use sluice_core::config::{AccessMode, ConnectionSettings};
///
/// let settings: ConnectionSettings = "Data Source=app.db;Mode=ReadOnly;Busy Timeout=250"
///     .parse()
///     .unwrap();
/// assert_eq!(settings.data_source, "app.db");
/// assert_eq!(settings.mode, AccessMode::ReadOnly);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Database file path or SQLite URI
    pub data_source: String,
    pub mode: AccessMode,
    /// How long to wait on a locked database; no wait when unset
    pub busy_timeout: Option<Duration>,
}

impl FromStr for ConnectionSettings {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SluiceError::required("connectionString"));
        }

        if !s.contains('=') {
            return Ok(Self {
                data_source: s.to_string(),
                mode: AccessMode::default(),
                busy_timeout: None,
            });
        }

        let mut data_source = None;
        let mut mode = AccessMode::default();
        let mut busy_timeout = None;

        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(SluiceError::Configuration {
                    message: format!("Malformed connection string segment: {pair}"),
                });
            };
            let value = value.trim();
            let key: String = key
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();

            match key.as_str() {
                "datasource" | "data_source" | "path" => data_source = Some(value.to_string()),
                "mode" => mode = value.parse()?,
                "busytimeout" => {
                    let millis: u64 = value.parse().map_err(|_| SluiceError::Configuration {
                        message: format!("Busy Timeout must be milliseconds, got: {value}"),
                    })?;
                    busy_timeout = Some(Duration::from_millis(millis));
                }
                _ => {
                    return Err(SluiceError::Configuration {
                        message: format!("Unknown connection string key: {key}"),
                    })
                }
            }
        }

        match data_source {
            Some(data_source) if !data_source.is_empty() => Ok(Self {
                data_source,
                mode,
                busy_timeout,
            }),
            _ => Err(SluiceError::required("Data Source")),
        }
    }
}

impl fmt::Display for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQLite database \"{}\"", self.data_source)?;
        if self.mode == AccessMode::ReadOnly {
            write!(f, " (read-only)")?;
        }
        Ok(())
    }
}

/// Tunables shared by every engine a registry creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub idle_timeout: Duration,
    pub batch_separator: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            batch_separator: DEFAULT_BATCH_SEPARATOR.to_string(),
        }
    }
}

impl EngineOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.batch_separator.is_empty()
            || self.batch_separator.chars().any(char::is_whitespace)
        {
            return Err(SluiceError::invalid_input("batchSeparator")
                .with_reason("must be a single non-empty token"));
        }
        Ok(())
    }
}
