//! Sluice CLI Application
//!
//! Command-line interface for applying SQL change scripts with the sluice
//! engine. One engine instance is registered per invocation and disposed on
//! the way out.

mod args;
mod cli;
mod renderer;

use anyhow::{anyhow, Context, Result};
use args::Args;
use clap::Parser;
use cli::Cli;
use log::info;
use renderer::TerminalRenderer;
use sluice_core::{EngineOptions, InstanceRegistry};

fn main() -> Result<()> {
    env_logger::init();

    let Args {
        connection,
        no_color,
        json,
        separator,
        command,
    } = Args::parse();

    let connection =
        connection.ok_or_else(|| anyhow!("--connection or SLUICE_CONNECTION is required"))?;

    let mut options = EngineOptions::default();
    if let Some(separator) = separator {
        options.batch_separator = separator;
    }

    let registry = InstanceRegistry::with_options(options);
    let handle = registry
        .create_instance(&connection)
        .context("Failed to create engine instance")?;

    info!("Sluice started");

    let renderer = TerminalRenderer::new(!no_color);
    let result = Cli::new(registry.clone(), handle, renderer, json).run(command);
    registry.dispose(handle);
    result
}
