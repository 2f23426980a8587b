#![allow(dead_code)]

use std::{path::PathBuf, time::Duration};

use sluice_core::{EngineOptions, InstanceHandle, InstanceRegistry};
use tempfile::TempDir;

/// A registry with one registered instance on a fresh database file.
pub struct TestInstance {
    pub temp_dir: TempDir,
    pub registry: InstanceRegistry,
    pub handle: InstanceHandle,
}

impl TestInstance {
    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("test.db")
    }
}

/// Helper function to create a registered instance
pub fn create_test_instance() -> TestInstance {
    create_test_instance_with_timeout(Duration::from_secs(60))
}

pub fn create_test_instance_with_timeout(idle_timeout: Duration) -> TestInstance {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = InstanceRegistry::with_options(EngineOptions {
        idle_timeout,
        ..EngineOptions::default()
    });
    let handle = registry
        .create_instance(&format!(
            "Data Source={};Busy Timeout=5000",
            temp_dir.path().join("test.db").display()
        ))
        .expect("Failed to create instance");
    TestInstance {
        temp_dir,
        registry,
        handle,
    }
}

/// Same as [`create_test_instance`] with the history table already created
pub fn create_initialized_instance() -> TestInstance {
    let instance = create_test_instance();
    instance
        .registry
        .initialize_database(instance.handle)
        .expect("Failed to initialize database");
    instance
}
