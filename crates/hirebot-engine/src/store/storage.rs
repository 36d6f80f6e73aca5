use super::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, broadcast};

/// A change to one storage key.
#[derive(Debug, Clone)]
pub struct StorageChange {
    pub key: String,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
    /// Writer that made the change, as handed out by [`Storage::register`].
    pub origin: u64,
}

/// Durable key-value storage shared by every settings surface.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Hands out a fresh writer id.
    fn register(&self) -> u64;

    async fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set_item(&self, origin: u64, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove_item(&self, origin: u64, key: &str) -> Result<(), StoreError>;

    /// Stream of every change made through any clone of this storage.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

const CHANGE_CAPACITY: usize = 64;

struct Shared {
    changes: broadcast::Sender<StorageChange>,
    next_origin: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            changes,
            next_origin: AtomicU64::new(1),
        }
    }

    fn publish(&self, origin: u64, key: &str, old_value: Option<Value>, new_value: Option<Value>) {
        // No subscribers is fine.
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            new_value,
            old_value,
            origin,
        });
    }
}

/// In-process storage. Clones share the same data and change stream.
#[derive(Clone)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, Value>>>,
    shared: Arc<Shared>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            shared: Arc::new(Shared::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn register(&self) -> u64 {
        self.shared.next_origin.fetch_add(1, Ordering::Relaxed)
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, origin: u64, key: &str, value: Value) -> Result<(), StoreError> {
        let old = self
            .items
            .lock()
            .await
            .insert(key.to_string(), value.clone());
        self.shared.publish(origin, key, old, Some(value));
        Ok(())
    }

    async fn remove_item(&self, origin: u64, key: &str) -> Result<(), StoreError> {
        let old = self.items.lock().await.remove(key);
        self.shared.publish(origin, key, old, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.shared.changes.subscribe()
    }
}

/// Storage backed by one JSON document on disk, keyed at the top level.
///
/// Change notifications reach every clone in this process. Writes from other
/// processes are picked up on the next read but are not broadcast.
#[derive(Clone)]
pub struct FileStorage {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    shared: Arc<Shared>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
            shared: Arc::new(Shared::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::Corrupt(self.path.display().to_string())),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let body = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn register(&self) -> u64 {
        self.shared.next_origin.fetch_add(1, Ordering::Relaxed)
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.remove(key))
    }

    async fn set_item(&self, origin: u64, key: &str, value: Value) -> Result<(), StoreError> {
        let old = {
            let _guard = self.lock.lock().await;
            let mut document = self.read_document().await?;
            let old = document.insert(key.to_string(), value.clone());
            self.write_document(&document).await?;
            old
        };
        self.shared.publish(origin, key, old, Some(value));
        Ok(())
    }

    async fn remove_item(&self, origin: u64, key: &str) -> Result<(), StoreError> {
        let old = {
            let _guard = self.lock.lock().await;
            let mut document = self.read_document().await?;
            let old = document.remove(key);
            if old.is_some() {
                self.write_document(&document).await?;
            }
            old
        };
        self.shared.publish(origin, key, old, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.shared.changes.subscribe()
    }
}
