//! Structured messages reported by the database engine.
//!
//! Output that the engine reports without failing a statement (print-style
//! output, warnings, error-level notices) is captured into a
//! [`MessageBuffer`] and handed back to the caller of the unit of work.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

/// Severity classes above this value are reported as errors.
pub const ERROR_SEVERITY_THRESHOLD: i64 = 10;

/// Severity of a captured message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Information,
    Error,
}

impl LogLevel {
    /// Classifies an engine severity class.
    pub fn from_severity(severity: i64) -> Self {
        if severity > ERROR_SEVERITY_THRESHOLD {
            LogLevel::Error
        } else {
            LogLevel::Information
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Information => "information",
            LogLevel::Error => "error",
        }
    }
}

/// One message captured from the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn information(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Information, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

/// Thread-safe queue of captured messages.
///
/// Appends may come from any thread (the engine calls back into the buffer
/// while a statement runs); [`drain_all`](Self::drain_all) empties the queue
/// atomically.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    messages: Mutex<Vec<LogMessage>>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a message and forwards it to the log.
    pub fn append(&self, message: LogMessage) {
        match message.level {
            LogLevel::Error => log::error!("engine: {}", message.message),
            LogLevel::Information => log::info!("engine: {}", message.message),
        }
        self.lock().push(message);
    }

    /// Removes and returns every queued message in arrival order.
    pub fn drain_all(&self) -> Vec<LogMessage> {
        std::mem::take(&mut *self.lock())
    }

    /// Discards every queued message.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Joins message texts one per line, the way operators read engine output.
pub fn join_messages(messages: &[LogMessage]) -> String {
    messages
        .iter()
        .map(|m| m.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
