//! Client-side key/value storage.
//!
//! Stands in for the browser storage the guest profile and the sprite atlas cache persist to.
//! Stores hold opaque bytes; callers own the encoding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::foundation::error::{ForgeError, ForgeResult};

/// Persistent key/value storage boundary.
///
/// Keys are `/`-separated segments of `[A-Za-z0-9._-]`; see [`validate_key`].
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ForgeResult<Option<Vec<u8>>>;
    /// Insert or overwrite.
    fn put(&self, key: &str, value: &[u8]) -> ForgeResult<()>;
    /// Remove a key; removing a missing key is not an error.
    fn remove(&self, key: &str) -> ForgeResult<()>;
}

/// Validate a storage key and return its segments.
pub fn validate_key(key: &str) -> ForgeResult<Vec<&str>> {
    if key.is_empty() {
        return Err(ForgeError::storage("storage key must be non-empty"));
    }
    let mut out = Vec::new();
    for seg in key.split('/') {
        if seg.is_empty() || seg == "." || seg == ".." {
            return Err(ForgeError::storage(format!(
                "invalid storage key '{key}': empty or relative segment"
            )));
        }
        if !seg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(ForgeError::storage(format!(
                "invalid storage key '{key}': unsupported character"
            )));
        }
        out.push(seg);
    }
    Ok(out)
}

/// Process-local store, mainly for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ForgeResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> ForgeResult<()> {
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> ForgeResult<()> {
        validate_key(key)?;
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Directory-backed store: each key maps to a file below `root`.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> ForgeResult<PathBuf> {
        let mut p = self.root.clone();
        for seg in validate_key(key)? {
            p.push(seg);
        }
        Ok(p)
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> ForgeResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ForgeError::storage(format!(
                "failed to read '{}': {e}",
                path.display()
            ))),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> ForgeResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ForgeError::storage(format!("failed to create '{}': {e}", parent.display()))
            })?;
        }
        // Readers never observe a partially written entry.
        let tmp = tmp_path_for(&path);
        std::fs::write(&tmp, value).map_err(|e| {
            ForgeError::storage(format!("failed to write '{}': {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            ForgeError::storage(format!("failed to commit '{}': {e}", path.display()))
        })
    }

    fn remove(&self, key: &str) -> ForgeResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ForgeError::storage(format!(
                "failed to remove '{}': {e}",
                path.display()
            ))),
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp-{}-{n}", std::process::id()))
}

#[cfg(test)]
#[path = "../../tests/unit/storage/mod.rs"]
mod tests;
