//! Persisted user settings.
//!
//! A [`SettingsStore`] keeps an in-memory settings document, merged over the
//! defaults, and mirrors it into a [`Storage`] under
//! [`SETTINGS_KEY`](hirebot_common::settings::SETTINGS_KEY). Several stores
//! may share one storage; each sees the others' writes through [`SettingsStore::watch`].

pub mod merge;
pub mod storage;

pub use merge::deep_merge;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageChange};

use hirebot_common::settings::{SETTINGS_KEY, Settings};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage document at {0} is not a JSON object")]
    Corrupt(String),
}

#[derive(Clone)]
pub struct SettingsStore<S> {
    storage: S,
    defaults: Value,
    current: Arc<Mutex<Value>>,
    origin: u64,
}

impl<S: Storage + Clone + 'static> SettingsStore<S> {
    pub fn new(storage: S) -> Result<Self, StoreError> {
        Self::with_defaults(storage, &Settings::default())
    }

    pub fn with_defaults(storage: S, defaults: &Settings) -> Result<Self, StoreError> {
        let defaults = defaults.to_document()?;
        let origin = storage.register();
        Ok(Self {
            storage,
            current: Arc::new(Mutex::new(defaults.clone())),
            defaults,
            origin,
        })
    }

    /// Reads the persisted document and merges it over the defaults.
    pub async fn load(&self) -> Result<Settings, StoreError> {
        let stored = self
            .storage
            .get_item(SETTINGS_KEY)
            .await?
            .unwrap_or_else(|| Value::Object(Default::default()));
        let merged = deep_merge(&self.defaults, &stored);
        let rejected = Settings::rejected_keys(&merged);
        if !rejected.is_empty() {
            warn!("Ignoring malformed settings {:?}, using their defaults", rejected);
        }
        *self.current.lock().await = merged.clone();
        Ok(to_settings(&merged))
    }

    /// Settings as currently held in memory.
    pub async fn current(&self) -> Settings {
        to_settings(&*self.current.lock().await)
    }

    /// Merges `partial` into the in-memory document and persists the result.
    pub async fn save(&self, partial: Value) -> Result<Settings, StoreError> {
        let merged = {
            let mut current = self.current.lock().await;
            *current = deep_merge(&current, &partial);
            current.clone()
        };
        self.storage
            .set_item(self.origin, SETTINGS_KEY, merged.clone())
            .await?;
        debug!("Settings saved");
        Ok(to_settings(&merged))
    }

    /// Deletes top-level keys from the persisted document.
    ///
    /// Every other in-memory field is kept; removed fields read as their
    /// defaults afterwards.
    pub async fn remove(&self, keys: &[&str]) -> Result<Settings, StoreError> {
        let remaining = {
            let mut current = self.current.lock().await;
            if let Value::Object(map) = &mut *current {
                for key in keys {
                    map.remove(*key);
                }
            }
            current.clone()
        };

        let mut persisted = self
            .storage
            .get_item(SETTINGS_KEY)
            .await?
            .unwrap_or_else(|| remaining.clone());
        if let Value::Object(map) = &mut persisted {
            for key in keys {
                map.remove(*key);
            }
        }
        self.storage
            .set_item(self.origin, SETTINGS_KEY, persisted)
            .await?;
        Ok(to_settings(&remaining))
    }

    /// Drops the persisted document and resets to defaults.
    pub async fn clear(&self) -> Result<Settings, StoreError> {
        *self.current.lock().await = self.defaults.clone();
        self.storage.remove_item(self.origin, SETTINGS_KEY).await?;
        Ok(to_settings(&self.defaults))
    }

    /// Calls `callback(new, old)` whenever another store sharing this
    /// storage writes the settings key.
    ///
    /// The in-memory document is updated before the callback runs. Dropping
    /// the returned handle unsubscribes.
    pub fn watch<F>(&self, callback: F) -> WatchHandle
    where
        F: Fn(Settings, Option<Settings>) + Send + 'static,
    {
        let mut changes = self.storage.subscribe();
        let current = Arc::clone(&self.current);
        let defaults = self.defaults.clone();
        let origin = self.origin;

        let task = tokio::spawn(async move {
            loop {
                let change = match changes.recv().await {
                    Ok(change) => change,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Settings watcher lagged, skipped {} changes", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if change.key != SETTINGS_KEY || change.origin == origin {
                    continue;
                }

                let old = change
                    .old_value
                    .as_ref()
                    .map(|old| to_settings(&deep_merge(&defaults, old)));
                let new = {
                    let mut current = current.lock().await;
                    *current = match &change.new_value {
                        Some(new_value) => deep_merge(&current, new_value),
                        None => defaults.clone(),
                    };
                    to_settings(&current)
                };
                callback(new, old);
            }
        });

        WatchHandle { task: Some(task) }
    }
}

/// Subscription returned by [`SettingsStore::watch`].
pub struct WatchHandle {
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn to_settings(document: &Value) -> Settings {
    Settings::from_document(document).unwrap_or_else(|e| {
        warn!("Stored settings are malformed, using defaults: {}", e);
        Settings::default()
    })
}
