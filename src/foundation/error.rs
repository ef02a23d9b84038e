/// Result alias used across the crate.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Error type for operations that surface failures to the caller.
///
/// Registry and asset problems never reach this type on the assembly path: they are recovered by
/// the built-in registry and the procedural generator. What remains are configuration/validation
/// problems and the sprite pipeline, whose failures break dependent game surfaces.
#[derive(thiserror::Error, Debug)]
pub enum ForgeError {
    /// Invalid input (options, profile payloads, config).
    #[error("validation error: {0}")]
    Validation(String),

    /// Registry fetch, parse or build failure.
    #[error("registry error: {0}")]
    Registry(String),

    /// Part asset could not be read, verified or decoded.
    #[error("asset error: {0}")]
    Asset(String),

    /// Rasterization or presentation failure.
    #[error("render error: {0}")]
    Render(String),

    /// Sprite atlas generation failed.
    #[error("sprite generation failed: {0}")]
    SpriteGeneration(String),

    /// Background worker channel closed or the worker died.
    #[error("worker channel failure: {0}")]
    WorkerChannel(String),

    /// Client storage read/write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ForgeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn sprite(msg: impl Into<String>) -> Self {
        Self::SpriteGeneration(msg.into())
    }

    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerChannel(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
