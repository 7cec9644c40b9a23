//! Settings storage boundary.
//!
//! The engine never talks to the hosted backend directly; it goes through
//! [`SettingsBackend`] (the authenticated user/admin record tiers) and
//! [`LocalStore`] (the unauthenticated fallback tier). Production wires in
//! the real API client; tests wire in the in-memory fakes below.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("settings backend unavailable: {0}")]
    Unavailable(String),

    #[error("settings backend timed out")]
    Timeout,

    #[error("permission denied: {0}")]
    Denied(String),

    #[error("io error: {0}")]
    Io(String),
}

/// Key/value settings storage exposed by the hosted backend.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Fetch every settings row as a string map.
    async fn fetch_all_settings(&self) -> Result<HashMap<String, String>, BackendError>;

    /// Write one settings row.
    async fn write_setting(&self, key: &str, value: &str) -> Result<(), BackendError>;
}

/// Simple string store used when no authenticated backend record exists.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
}

/// In-memory [`SettingsBackend`] with failure and latency injection.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every subsequent call sleeps this long before responding.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn simulate_latency(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SettingsBackend for MemoryBackend {
    async fn fetch_all_settings(&self) -> Result<HashMap<String, String>, BackendError> {
        self.simulate_latency().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("injected read failure".into()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn write_setting(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.simulate_latency().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("injected write failure".into()));
        }
        self.insert(key, value);
        Ok(())
    }
}

/// In-memory [`LocalStore`].
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// [`LocalStore`] persisted as a JSON object in the platform config dir.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Platform default location.
    ///
    /// On macOS: `~/Library/Application Support/lumen/settings.json`
    /// On Linux: `~/.config/lumen/settings.json`
    pub fn default_path() -> Result<PathBuf, BackendError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| BackendError::Io("could not determine config directory".into()))?;
        Ok(config_dir.join("lumen").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> HashMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "local settings file {} is corrupt: {e}, starting empty",
                    self.path.display()
                );
                HashMap::new()
            }
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BackendError::Io(format!(
                    "failed to create settings directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| BackendError::Io(format!("failed to serialize settings: {e}")))?;
        std::fs::write(&self.path, content).map_err(|e| {
            BackendError::Io(format!("failed to write {}: {e}", self.path.display()))
        })?;
        info!("wrote local settings to {}", self.path.display());
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }
}
