//! Persistence backends.
//!
//! Two concerns live here:
//!
//! * [`KeyValueStore`]: best-effort JSON persistence of the record list and
//!   the category list. Reads fall back to a caller-supplied default and
//!   writes never fail loudly; problems are logged and swallowed.
//! * [`DocumentStore`]: the registry that owns generated PDF bytes and hands
//!   out [`DocumentHandle`]s. Releasing a handle frees the bytes and makes
//!   the handle unresolvable.

use crate::model::DocumentHandle;
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Key under which the record list is stored.
pub const RECIPES_KEY: &str = "recipes";
/// Key under which the category list is stored.
pub const CATEGORIES_KEY: &str = "categories";

// ── Key-value store ──────────────────────────────────────────────────────────

/// Best-effort key-value persistence of JSON values.
pub trait KeyValueStore: Send + Sync {
    /// Raw JSON text for `key`, or `None` if absent or unreadable.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Store raw JSON text. Failures are logged, never returned.
    fn set_raw(&self, key: &str, json: String);
}

/// Typed helpers on top of any [`KeyValueStore`].
pub trait KeyValueStoreExt: KeyValueStore {
    /// Decode the value at `key`, or return `fallback` when it is missing
    /// or does not parse.
    fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.get_raw(key) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable value for '{}': {}", key, e);
                fallback
            }),
            None => fallback,
        }
    }

    /// Encode and store `value` at `key`.
    fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.set_raw(key, json),
            Err(e) => warn!("Could not serialise value for '{}': {}", key, e),
        }
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Process-local store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set_raw(&self, key: &str, json: String) {
        if let Ok(mut map) = self.entries.lock() {
            map.insert(key.to_string(), json);
        }
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temp file first and are renamed into place so a crash
/// never leaves a half-written catalog.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set_raw(&self, key: &str, json: String) {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let result = std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(&tmp, json))
            .and_then(|_| std::fs::rename(&tmp, &path));
        if let Err(e) = result {
            warn!("Could not persist '{}' to {}: {}", key, path.display(), e);
        }
    }
}

// ── Document store ───────────────────────────────────────────────────────────

/// Owns the bytes of every generated document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Take ownership of `bytes` and return a fresh handle.
    async fn put(&self, bytes: Bytes) -> std::io::Result<DocumentHandle>;

    /// The bytes behind `handle`, or `None` once released.
    async fn fetch(&self, handle: DocumentHandle) -> Option<Bytes>;

    /// Free the bytes behind `handle`. Releasing twice is a no-op.
    async fn release(&self, handle: DocumentHandle);
}

/// Documents held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    blobs: Mutex<HashMap<DocumentHandle, Bytes>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, bytes: Bytes) -> std::io::Result<DocumentHandle> {
        let handle = DocumentHandle::new();
        self.blobs
            .lock()
            .map_err(|_| std::io::Error::other("document store lock poisoned"))?
            .insert(handle, bytes);
        Ok(handle)
    }

    async fn fetch(&self, handle: DocumentHandle) -> Option<Bytes> {
        self.blobs.lock().ok()?.get(&handle).cloned()
    }

    async fn release(&self, handle: DocumentHandle) {
        if let Ok(mut map) = self.blobs.lock() {
            map.remove(&handle);
        }
    }
}

/// Documents stored as `<dir>/<handle>.pdf`, surviving restarts.
#[derive(Debug, Clone)]
pub struct DirDocumentStore {
    dir: PathBuf,
}

impl DirDocumentStore {
    /// Open (creating if needed) the document directory.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, handle: DocumentHandle) -> PathBuf {
        self.dir.join(format!("{handle}.pdf"))
    }
}

#[async_trait]
impl DocumentStore for DirDocumentStore {
    async fn put(&self, bytes: Bytes) -> std::io::Result<DocumentHandle> {
        let handle = DocumentHandle::new();
        let path = self.path_for(handle);
        let tmp = path.with_extension("pdf.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Stored document {} ({} bytes)", handle, bytes.len());
        Ok(handle)
    }

    async fn fetch(&self, handle: DocumentHandle) -> Option<Bytes> {
        tokio::fs::read(self.path_for(handle)).await.ok().map(Bytes::from)
    }

    async fn release(&self, handle: DocumentHandle) {
        let path = self.path_for(handle);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Released document {}", handle),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}
