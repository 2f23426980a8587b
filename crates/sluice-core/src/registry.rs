//! Handle-based table of live engine instances.
//!
//! Callers address engines through an opaque [`InstanceHandle`]. Each engine
//! is built with an idle callback that removes it from the registry and
//! disposes it, so an instance left unused for its idle timeout is reclaimed
//! and its handle stops resolving.

use std::{
    collections::HashMap,
    fmt,
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::EngineOptions,
    engine::{Engine, EngineBuilder},
    error::{Result, SluiceError},
    lifecycle::UsageGuard,
    messages::LogMessage,
    models::{ChangeScript, ExecutionResult, SchemaChangeRecord},
};

/// Opaque identifier of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceHandle(Uuid);

impl InstanceHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceHandle {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| SluiceError::invalid_input("handle").with_reason(e.to_string()))
    }
}

struct RegistryInner {
    instances: Mutex<HashMap<InstanceHandle, Arc<Engine>>>,
    options: EngineOptions,
}

impl RegistryInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<InstanceHandle, Arc<Engine>>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle callback target. An instance that picked up new usage after its
    /// timer fired is left alone; its next idle period re-arms the timer.
    fn evict(&self, handle: InstanceHandle) {
        let evicted = {
            let mut instances = self.lock();
            match instances.get(&handle) {
                Some(engine) if engine.usage().usage_count() == 0 => instances.remove(&handle),
                _ => None,
            }
        };

        if let Some(engine) = evicted {
            info!("instance {handle} evicted after idle timeout");
            engine.dispose();
        }
    }
}

/// Owns every live engine instance, keyed by handle.
///
/// Cloning a registry yields another reference to the same table.
#[derive(Clone)]
pub struct InstanceRegistry {
    inner: Arc<RegistryInner>,
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Creates a registry whose engines all use `options`.
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                instances: Mutex::new(HashMap::new()),
                options,
            }),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Builds an engine for `connection_string` and registers it.
    ///
    /// No connection is opened yet. The instance is evicted if it stays
    /// unused for the configured idle timeout.
    pub fn create_instance(&self, connection_string: &str) -> Result<InstanceHandle> {
        let handle = InstanceHandle::new();
        let registry: Weak<RegistryInner> = Arc::downgrade(&self.inner);

        // Insert before the timer can observe the instance.
        let mut instances = self.inner.lock();
        let engine = EngineBuilder::new(connection_string)
            .with_options(self.inner.options.clone())
            .on_idle(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.evict(handle);
                }
            })
            .build()?;
        debug!("instance {handle} created for {}", engine.settings());
        instances.insert(handle, Arc::new(engine));

        Ok(handle)
    }

    /// Resolves a handle to its engine.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::InstanceNotFound` if the handle was never issued,
    /// was disposed, or was evicted.
    pub fn get(&self, handle: InstanceHandle) -> Result<Arc<Engine>> {
        self.inner
            .lock()
            .get(&handle)
            .cloned()
            .ok_or_else(|| SluiceError::InstanceNotFound {
                handle: handle.to_string(),
            })
    }

    /// Resolves `handle` and starts a usage before releasing the table lock,
    /// so the instance cannot be evicted between lookup and use.
    fn acquire(&self, handle: InstanceHandle) -> Result<(Arc<Engine>, UsageGuard)> {
        let instances = self.inner.lock();
        let engine = instances
            .get(&handle)
            .cloned()
            .ok_or_else(|| SluiceError::InstanceNotFound {
                handle: handle.to_string(),
            })?;
        let usage = engine.begin_usage()?;
        Ok((engine, usage))
    }

    fn with_engine<T>(&self, handle: InstanceHandle, f: impl FnOnce(&Engine) -> Result<T>) -> Result<T> {
        let (engine, _usage) = self.acquire(handle)?;
        f(&engine)
    }

    /// Removes and disposes an instance. Unknown handles are ignored.
    pub fn dispose(&self, handle: InstanceHandle) {
        let removed = self.inner.lock().remove(&handle);
        if let Some(engine) = removed {
            debug!("instance {handle} disposed");
            engine.dispose();
        }
    }

    /// Disposes every registered instance.
    pub fn dispose_all(&self) {
        let drained: Vec<_> = self.inner.lock().drain().collect();
        for (handle, engine) in drained {
            debug!("instance {handle} disposed");
            engine.dispose();
        }
    }

    pub fn contains(&self, handle: InstanceHandle) -> bool {
        self.inner.lock().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn initialize_database(&self, handle: InstanceHandle) -> Result<()> {
        self.with_engine(handle, Engine::initialize_database)
    }

    pub fn is_database_initialized(&self, handle: InstanceHandle) -> Result<bool> {
        self.with_engine(handle, Engine::is_database_initialized)
    }

    pub fn schema_version(&self, handle: InstanceHandle) -> Result<i64> {
        self.with_engine(handle, Engine::schema_version)
    }

    pub fn change_history(&self, handle: InstanceHandle) -> Result<Vec<ChangeScript>> {
        self.with_engine(handle, Engine::change_history)
    }

    pub fn statement_records(
        &self,
        handle: InstanceHandle,
        script_id: i32,
    ) -> Result<Vec<SchemaChangeRecord>> {
        self.with_engine(handle, |engine| engine.statement_records(script_id))
    }

    pub fn execute_change_script(
        &self,
        handle: InstanceHandle,
        release_number: i64,
        script_id: i32,
        script_name: &str,
        script_text: &str,
    ) -> Result<ExecutionResult> {
        self.with_engine(handle, |engine| {
            engine.execute_change_script(release_number, script_id, script_name, script_text)
        })
    }

    pub fn backup_database(
        &self,
        handle: InstanceHandle,
        database_name: &str,
        destination: &Path,
    ) -> Result<Vec<LogMessage>> {
        self.with_engine(handle, |engine| engine.backup_database(database_name, destination))
    }

    pub fn restore_database(
        &self,
        handle: InstanceHandle,
        database_name: &str,
        source: &Path,
    ) -> Result<Vec<LogMessage>> {
        self.with_engine(handle, |engine| engine.restore_database(database_name, source))
    }

    pub fn execute_query(&self, handle: InstanceHandle, query: &str) -> Result<Vec<LogMessage>> {
        self.with_engine(handle, |engine| engine.execute_query(query))
    }

    pub fn execute_queries<S: AsRef<str>>(
        &self,
        handle: InstanceHandle,
        queries: &[S],
    ) -> Result<Vec<LogMessage>> {
        self.with_engine(handle, |engine| engine.execute_queries(queries))
    }

    pub fn open_connection(&self, handle: InstanceHandle) -> Result<()> {
        self.with_engine(handle, Engine::open_connection)
    }

    pub fn close_connection(&self, handle: InstanceHandle) -> Result<()> {
        self.with_engine(handle, Engine::close_connection)
    }

    pub fn validate_connection(&self, handle: InstanceHandle) -> Result<()> {
        self.with_engine(handle, Engine::validate_connection)
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use tempfile::TempDir;

    use super::*;

    fn short_lived_registry(idle_timeout: Duration) -> InstanceRegistry {
        InstanceRegistry::with_options(EngineOptions {
            idle_timeout,
            ..EngineOptions::default()
        })
    }

    #[test]
    fn test_handle_parses_from_display() {
        let handle = InstanceHandle::new();
        assert_eq!(handle.to_string().parse::<InstanceHandle>().unwrap(), handle);
        assert!("not-a-handle".parse::<InstanceHandle>().is_err());
    }

    #[test]
    fn test_create_and_dispose() {
        let dir = TempDir::new().unwrap();
        let registry = InstanceRegistry::new();
        let handle = registry
            .create_instance(&dir.path().join("r.db").display().to_string())
            .unwrap();

        assert!(registry.contains(handle));
        registry.initialize_database(handle).unwrap();
        assert_eq!(registry.schema_version(handle).unwrap(), 0);

        let engine = registry.get(handle).unwrap();
        registry.dispose(handle);
        registry.dispose(handle);

        assert!(registry.is_empty());
        assert!(engine.is_disposed());
        assert!(matches!(
            registry.schema_version(handle),
            Err(SluiceError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_connection_string_registers_nothing() {
        let registry = InstanceRegistry::new();
        assert!(registry.create_instance("Mode=ReadOnly").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_idle_instance_is_evicted() {
        let dir = TempDir::new().unwrap();
        let registry = short_lived_registry(Duration::from_millis(100));
        let handle = registry
            .create_instance(&dir.path().join("idle.db").display().to_string())
            .unwrap();
        registry.initialize_database(handle).unwrap();

        thread::sleep(Duration::from_millis(600));
        assert!(!registry.contains(handle));
        assert!(matches!(
            registry.get(handle),
            Err(SluiceError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_instance_in_use_is_not_evicted() {
        let dir = TempDir::new().unwrap();
        let registry = short_lived_registry(Duration::from_millis(100));
        let handle = registry
            .create_instance(&dir.path().join("busy.db").display().to_string())
            .unwrap();

        let engine = registry.get(handle).unwrap();
        let usage = engine.begin_usage().unwrap();
        thread::sleep(Duration::from_millis(400));
        assert!(registry.contains(handle));

        drop(usage);
        thread::sleep(Duration::from_millis(600));
        assert!(!registry.contains(handle));
        assert!(engine.is_disposed());
    }

    #[test]
    fn test_dispose_all() {
        let dir = TempDir::new().unwrap();
        let registry = InstanceRegistry::new();
        for name in ["a.db", "b.db"] {
            registry
                .create_instance(&dir.path().join(name).display().to_string())
                .unwrap();
        }
        assert_eq!(registry.len(), 2);

        registry.dispose_all();
        assert!(registry.is_empty());
    }
}
