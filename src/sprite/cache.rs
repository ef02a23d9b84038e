use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use image::ImageEncoder as _;
use parking_lot::RwLock;

use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::fingerprint::ContentKey;
use crate::sprite::atlas::{FrameRecord, SpriteAtlas};
use crate::storage::KeyValueStore;

/// Storage key prefix for atlas records.
pub const ATLAS_KEY_PREFIX: &str = "sprite-atlas";

const RECORD_VERSION: u32 = 1;

/// Serialized atlas as persisted in client storage.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasRecord {
    pub version: u32,
    pub key: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<FrameRecord>,
    /// Base64 (standard alphabet) PNG of the sheet.
    pub image: String,
}

impl AtlasRecord {
    pub fn from_atlas(atlas: &SpriteAtlas) -> ForgeResult<Self> {
        let png = encode_png(atlas.image())?;
        Ok(Self {
            version: RECORD_VERSION,
            key: atlas.key().to_hex(),
            frame_width: atlas.frame_width(),
            frame_height: atlas.frame_height(),
            width: atlas.width(),
            height: atlas.height(),
            frames: atlas.frames().to_vec(),
            image: base64::engine::general_purpose::STANDARD.encode(png),
        })
    }

    pub fn into_atlas(self) -> ForgeResult<SpriteAtlas> {
        if self.version != RECORD_VERSION {
            return Err(ForgeError::serde(format!(
                "unsupported atlas record version {}",
                self.version
            )));
        }
        let key = ContentKey::from_hex(&self.key)
            .ok_or_else(|| ForgeError::serde(format!("invalid atlas key '{}'", self.key)))?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(self.image.as_bytes())
            .map_err(|e| ForgeError::serde(format!("atlas image is not base64: {e}")))?;
        let image = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
            .map_err(|e| ForgeError::serde(format!("atlas image is not a PNG: {e}")))?
            .to_rgba8();
        if image.dimensions() != (self.width, self.height) {
            return Err(ForgeError::serde("atlas image size does not match its record"));
        }
        SpriteAtlas::from_parts(
            key,
            image,
            self.frame_width,
            self.frame_height,
            self.frames,
        )
    }
}

fn encode_png(img: &image::RgbaImage) -> ForgeResult<Vec<u8>> {
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| ForgeError::serde(format!("png encode failed: {e}")))?;
    Ok(out)
}

/// Content-addressed atlas cache over a [`KeyValueStore`].
///
/// Entries are never expired; a write to an existing key overwrites it (last writer wins). Decoded
/// atlases are memoized in-process so repeat hits hand out the same `Arc`.
pub struct AtlasCache {
    store: Arc<dyn KeyValueStore>,
    memo: RwLock<HashMap<ContentKey, Arc<SpriteAtlas>>>,
}

impl AtlasCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            memo: RwLock::new(HashMap::new()),
        }
    }

    pub fn storage_key(key: ContentKey) -> String {
        format!("{ATLAS_KEY_PREFIX}/{}", key.to_hex())
    }

    /// Look up an atlas. Unreadable or corrupt records count as misses.
    pub fn get(&self, key: ContentKey) -> Option<Arc<SpriteAtlas>> {
        if let Some(hit) = self.memo.read().get(&key) {
            return Some(Arc::clone(hit));
        }
        let bytes = match self.store.get(&Self::storage_key(key)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "atlas cache read failed");
                return None;
            }
        };
        let decoded = serde_json::from_slice::<AtlasRecord>(&bytes)
            .map_err(ForgeError::from)
            .and_then(AtlasRecord::into_atlas);
        match decoded {
            Ok(atlas) if atlas.key() == key => {
                let atlas = Arc::new(atlas);
                self.memo.write().insert(key, Arc::clone(&atlas));
                Some(atlas)
            }
            Ok(_) => {
                tracing::warn!(key = %key, "atlas record key mismatch; ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "corrupt atlas record; ignoring");
                None
            }
        }
    }

    pub fn put(&self, atlas: Arc<SpriteAtlas>) -> ForgeResult<()> {
        let record = AtlasRecord::from_atlas(&atlas)?;
        let bytes = serde_json::to_vec(&record)?;
        self.store.put(&Self::storage_key(atlas.key()), &bytes)?;
        self.memo.write().insert(atlas.key(), atlas);
        Ok(())
    }

    /// Remove an entry from storage and the in-process memo.
    pub fn invalidate(&self, key: ContentKey) -> ForgeResult<()> {
        self.memo.write().remove(&key);
        self.store.remove(&Self::storage_key(key))
    }

    /// Forget decoded atlases; stored records are kept.
    pub fn clear_memory(&self) {
        self.memo.write().clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sprite/cache.rs"]
mod tests;
