use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::error::{ForgeError, ForgeResult};
use crate::registry::model::{Registry, RegistryDocument};

/// Where registry bytes come from.
pub trait RegistrySource: Send + Sync {
    /// Human-readable location for logs.
    fn describe(&self) -> String;
    /// Fetch the raw registry document.
    fn fetch(&self) -> ForgeResult<Vec<u8>>;
}

/// Registry file on the local filesystem.
#[derive(Clone, Debug)]
pub struct FileRegistrySource {
    path: PathBuf,
}

impl FileRegistrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegistrySource for FileRegistrySource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch(&self) -> ForgeResult<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            ForgeError::registry(format!("failed to read '{}': {e}", self.path.display()))
        })
    }
}

/// In-memory registry bytes (embedded documents, tests).
#[derive(Clone, Debug)]
pub struct StaticRegistrySource {
    bytes: Arc<Vec<u8>>,
}

impl StaticRegistrySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::new(bytes.into()),
        }
    }
}

impl RegistrySource for StaticRegistrySource {
    fn describe(&self) -> String {
        format!("static:{} bytes", self.bytes.len())
    }

    fn fetch(&self) -> ForgeResult<Vec<u8>> {
        Ok(self.bytes.as_ref().clone())
    }
}

/// A source that always fails; loading from it yields the built-in registry.
#[derive(Clone, Debug)]
pub struct UnavailableRegistrySource {
    reason: String,
}

impl UnavailableRegistrySource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RegistrySource for UnavailableRegistrySource {
    fn describe(&self) -> String {
        format!("unavailable:{}", self.reason)
    }

    fn fetch(&self) -> ForgeResult<Vec<u8>> {
        Err(ForgeError::registry(self.reason.clone()))
    }
}

/// Registry document served over HTTP(S). Non-2xx responses count as fetch failures.
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpRegistrySource {
    url: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpRegistrySource {
    pub fn new(url: impl Into<String>) -> ForgeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ForgeError::registry(format!("failed to build http client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[cfg(feature = "http")]
impl RegistrySource for HttpRegistrySource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> ForgeResult<Vec<u8>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| ForgeError::registry(format!("GET {} failed: {e}", self.url)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ForgeError::registry(format!(
                "GET {} returned {status}",
                self.url
            )));
        }
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ForgeError::registry(format!("reading {} failed: {e}", self.url)))
    }
}

/// Anything that can hand out the current registry snapshot.
pub trait RegistryProvider: Send + Sync {
    fn registry(&self) -> Arc<Registry>;
}

/// Parse and structurally validate registry bytes.
///
/// The document must be an object with `version`, `assets` and `fallbacks`. Per-slot fallback
/// problems are repaired rather than rejected; the repairs are returned alongside.
pub fn parse_registry(bytes: &[u8]) -> ForgeResult<(Registry, Vec<String>)> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ForgeError::registry(format!("registry is not valid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ForgeError::registry("registry document must be an object"))?;
    for field in ["version", "assets", "fallbacks"] {
        if !obj.contains_key(field) {
            return Err(ForgeError::registry(format!(
                "registry document is missing '{field}'"
            )));
        }
    }
    let doc: RegistryDocument = serde_json::from_value(value)
        .map_err(|e| ForgeError::registry(format!("registry document is malformed: {e}")))?;
    Registry::from_document(doc)
}

/// Memoizing, never-failing registry loader.
///
/// The cache lives in the loader object rather than in a global; construct one per process (or
/// per test) and share it. The first caller performs the fetch while holding the cache lock, so
/// concurrent callers wait for that single load and all receive the same `Arc`.
pub struct RegistryLoader {
    source: Arc<dyn RegistrySource>,
    cache: Mutex<Option<Arc<Registry>>>,
}

impl RegistryLoader {
    pub fn new(source: Arc<dyn RegistrySource>) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
        }
    }

    /// Loader that always resolves to [`Registry::builtin`].
    pub fn builtin() -> Self {
        Self::new(Arc::new(UnavailableRegistrySource::new(
            "no registry configured",
        )))
    }

    /// Return the memoized registry, loading it on first use. Never fails.
    pub fn load(&self) -> Arc<Registry> {
        let mut guard = self.cache.lock();
        if let Some(reg) = guard.as_ref() {
            return Arc::clone(reg);
        }
        let reg = Arc::new(load_uncached(self.source.as_ref()));
        *guard = Some(Arc::clone(&reg));
        reg
    }

    /// Drop the memoized registry; the next [`RegistryLoader::load`] fetches again.
    pub fn clear(&self) {
        *self.cache.lock() = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cache.lock().is_some()
    }
}

impl RegistryProvider for RegistryLoader {
    fn registry(&self) -> Arc<Registry> {
        self.load()
    }
}

#[tracing::instrument(skip(source), fields(location = %source.describe()))]
fn load_uncached(source: &dyn RegistrySource) -> Registry {
    let parsed = source.fetch().and_then(|bytes| parse_registry(&bytes));
    match parsed {
        Ok((reg, repairs)) => {
            for r in &repairs {
                tracing::warn!(repair = %r, "registry fallback repaired");
            }
            tracing::debug!(
                version = reg.version(),
                assets = reg.len(),
                "registry loaded"
            );
            reg
        }
        Err(e) => {
            tracing::warn!(error = %e, "registry unavailable; using built-in registry");
            Registry::builtin()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/registry/loader.rs"]
mod tests;
