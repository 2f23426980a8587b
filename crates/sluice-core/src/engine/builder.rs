//! Builder for creating and configuring Engine instances.

use std::time::Duration;

use super::Engine;
use crate::{
    config::{ConnectionSettings, EngineOptions},
    connection::ConnectionManager,
    error::Result,
    lifecycle::{IdleCallback, UsageTracker},
};

/// Builder for creating and configuring Engine instances.
pub struct EngineBuilder {
    connection_string: String,
    options: EngineOptions,
    on_idle: Option<IdleCallback>,
}

impl EngineBuilder {
    /// Creates a new builder for the given connection string with default
    /// options.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            options: EngineOptions::default(),
            on_idle: None,
        }
    }

    /// Replaces every option at once.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets how long the engine may sit unused before the idle callback
    /// fires. Defaults to 30 seconds.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.options.idle_timeout = idle_timeout;
        self
    }

    /// Sets the token that separates batches in scripts. Defaults to `GO`.
    pub fn with_batch_separator(mut self, separator: impl Into<String>) -> Self {
        self.options.batch_separator = separator.into();
        self
    }

    /// Registers the callback raised once when the idle timeout expires.
    pub fn on_idle<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_idle = Some(Box::new(callback));
        self
    }

    /// Builds the engine. No connection is opened until the first
    /// operation.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::InvalidInput` or `SluiceError::Configuration`
    /// if the connection string or options are invalid.
    pub fn build(self) -> Result<Engine> {
        let settings: ConnectionSettings = self.connection_string.parse()?;
        self.options.validate()?;

        let usage = UsageTracker::new(self.options.idle_timeout, self.on_idle);
        log::debug!("engine created for {settings}");

        Ok(Engine {
            connection: ConnectionManager::new(settings, usage),
            batch_separator: self.options.batch_separator,
        })
    }
}
