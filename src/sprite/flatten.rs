use std::sync::Arc;

use rayon::prelude::*;

use crate::assemble::pipeline::{AssembleOptions, Assembler};
use crate::assemble::procedural;
use crate::config::flags::FeatureFlags;
use crate::foundation::core::{Quat, Transform3};
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::fingerprint::{ContentKey, StableHasher};
use crate::profile::model::AvatarProfile;
use crate::registry::loader::RegistryProvider;
use crate::render::camera::OrthoCamera;
use crate::render::cpu::{RasterSettings, render_scene};
use crate::representation::{RepresentationMode, apply_transform, transform_for};
use crate::scene::graph::SceneNode;
use crate::sprite::atlas::{CapturedFrame, MAX_ATLAS_EDGE, SpriteAtlas, grid_for};
use crate::sprite::cache::AtlasCache;
use crate::sprite::pose::{AnimationState, Direction, FormulaPoses, PoseStrategy};
use crate::sprite::runner::{AtlasGenerator, FlattenJob, FlattenProgress, TaskRunner};

pub const MAX_RESOLUTION: u32 = 1024;
pub const MAX_FRAME_COUNT: u32 = 120;

const KEY_SALT: &str = "avatar-forge/sprite-atlas/v1";

/// Sprite flattening request parameters.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlattenOptions {
    /// Square frame size in pixels.
    pub resolution: u32,
    /// Frames per `(state, direction)` pair.
    pub frame_count: u32,
    pub animation_states: Vec<AnimationState>,
    pub directions: Vec<Direction>,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            resolution: 128,
            frame_count: 8,
            animation_states: vec![AnimationState::Idle, AnimationState::Walk],
            directions: vec![Direction::Left, Direction::Right],
        }
    }
}

impl FlattenOptions {
    /// Validate and drop duplicate states/directions, keeping first occurrences.
    pub fn normalized(&self) -> ForgeResult<FlattenOptions> {
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(ForgeError::validation(format!(
                "resolution must be in 1..={MAX_RESOLUTION}, got {}",
                self.resolution
            )));
        }
        if self.frame_count == 0 || self.frame_count > MAX_FRAME_COUNT {
            return Err(ForgeError::validation(format!(
                "frameCount must be in 1..={MAX_FRAME_COUNT}, got {}",
                self.frame_count
            )));
        }
        let animation_states = dedup_keep_first(&self.animation_states);
        let directions = dedup_keep_first(&self.directions);
        if animation_states.is_empty() {
            return Err(ForgeError::validation("at least one animation state is required"));
        }
        if directions.is_empty() {
            return Err(ForgeError::validation("at least one direction is required"));
        }
        let out = FlattenOptions {
            resolution: self.resolution,
            frame_count: self.frame_count,
            animation_states,
            directions,
        };
        let (cols, rows) = grid_for(out.total_frames());
        let edge = u64::from(cols.max(rows)) * u64::from(out.resolution);
        if edge > u64::from(MAX_ATLAS_EDGE) {
            return Err(ForgeError::validation(format!(
                "{} frames at {}px need a {edge}px atlas; the limit is {MAX_ATLAS_EDGE}px",
                out.total_frames(),
                out.resolution
            )));
        }
        Ok(out)
    }

    /// Number of frames the atlas will hold.
    pub fn total_frames(&self) -> usize {
        self.animation_states.len() * self.directions.len() * self.frame_count as usize
    }
}

fn dedup_keep_first<T: Copy + PartialEq>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for &item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Content key of a `(profile, options)` pair: xxh3-128 over their canonical JSON.
pub fn content_key(profile: &AvatarProfile, options: &FlattenOptions) -> ForgeResult<ContentKey> {
    let profile_json = serde_json::to_string(profile)?;
    hash_key("profile", &profile_json, options)
}

fn placeholder_key(options: &FlattenOptions) -> ForgeResult<ContentKey> {
    hash_key("placeholder", "", options)
}

fn hash_key(kind: &str, subject: &str, options: &FlattenOptions) -> ForgeResult<ContentKey> {
    let options_json = serde_json::to_string(options)?;
    let mut h = StableHasher::new();
    h.write_str(KEY_SALT);
    h.write_str(kind);
    h.write_str(subject);
    h.write_str(&options_json);
    Ok(h.finish())
}

/// Renders every `(state, direction, frame)` offscreen and packs the sheet.
///
/// Frames of one pair are captured in parallel; progress is reported after each pair.
pub struct OffscreenAtlasGenerator {
    poses: Arc<dyn PoseStrategy>,
    settings: RasterSettings,
}

impl Default for OffscreenAtlasGenerator {
    fn default() -> Self {
        Self::new(Arc::new(FormulaPoses))
    }
}

impl OffscreenAtlasGenerator {
    pub fn new(poses: Arc<dyn PoseStrategy>) -> Self {
        Self {
            poses,
            settings: RasterSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RasterSettings) -> Self {
        self.settings = settings;
        self
    }

    fn capture(
        &self,
        scene: &SceneNode,
        camera: &OrthoCamera,
        state: AnimationState,
        direction: Direction,
        index: u32,
        frame_count: u32,
    ) -> ForgeResult<CapturedFrame> {
        let t = index as f32 / frame_count as f32;
        let posed = SceneNode::group("yaw")
            .with_transform(Transform3 {
                rotation: Quat::from_rotation_y(direction.yaw()),
                ..Transform3::IDENTITY
            })
            .with_child(
                SceneNode::group("pose")
                    .with_transform(self.poses.pose_at(state, t))
                    .with_child(scene.clone()),
            );
        let image = render_scene(&posed, camera, None, &self.settings)
            .and_then(|frame| frame.to_rgba_image())
            .map_err(|e| {
                ForgeError::sprite(format!("capture {state}/{direction}/{index} failed: {e}"))
            })?;
        Ok(CapturedFrame {
            state,
            direction,
            frame_index: index,
            image,
        })
    }
}

impl AtlasGenerator for OffscreenAtlasGenerator {
    #[tracing::instrument(skip_all, fields(key = %job.key, frames = job.options.total_frames()))]
    fn generate(
        &self,
        job: &FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas> {
        let opts = &job.options;
        let res = opts.resolution;
        let camera =
            OrthoCamera::for_transform(&transform_for(RepresentationMode::SideScroller), res, res);
        let total = opts.animation_states.len() * opts.directions.len();
        let mut captures = Vec::with_capacity(opts.total_frames());
        let mut completed = 0;

        for &state in &opts.animation_states {
            for &direction in &opts.directions {
                if job.is_cancelled() {
                    return Err(ForgeError::sprite("flatten job cancelled"));
                }
                let frames = (0..opts.frame_count)
                    .into_par_iter()
                    .map(|i| {
                        self.capture(&job.scene, &camera, state, direction, i, opts.frame_count)
                    })
                    .collect::<ForgeResult<Vec<_>>>()?;
                captures.extend(frames);
                completed += 1;
                progress(FlattenProgress {
                    completed,
                    total,
                    state,
                    direction,
                });
            }
        }

        let atlas = SpriteAtlas::pack(job.key, res, res, &captures)?;
        tracing::debug!(
            width = atlas.width(),
            height = atlas.height(),
            "sprite atlas packed"
        );
        Ok(atlas)
    }
}

/// Front door of sprite flattening: cache lookup, assembly and generation.
pub struct SpriteFlattener {
    registry: Arc<dyn RegistryProvider>,
    assembler: Arc<Assembler>,
    flags: Arc<FeatureFlags>,
    cache: Arc<AtlasCache>,
    generator: Arc<dyn AtlasGenerator>,
}

impl SpriteFlattener {
    pub fn new(
        registry: Arc<dyn RegistryProvider>,
        assembler: Arc<Assembler>,
        flags: Arc<FeatureFlags>,
        cache: Arc<AtlasCache>,
    ) -> Self {
        Self {
            registry,
            assembler,
            flags,
            cache,
            generator: Arc::new(OffscreenAtlasGenerator::default()),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn AtlasGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn cache(&self) -> &Arc<AtlasCache> {
        &self.cache
    }

    /// Key under which `flatten` would cache this request.
    ///
    /// Gated content is part of the key: with NSFW disabled the overlay layers are ignored, and with
    /// avatars disabled every profile maps to the placeholder.
    pub fn key_for(
        &self,
        profile: &AvatarProfile,
        options: &FlattenOptions,
    ) -> ForgeResult<ContentKey> {
        let options = options.normalized()?;
        self.gate(profile).key(&options)
    }

    /// Read the flags once; the key and the generated figure both derive from the result.
    fn gate(&self, profile: &AvatarProfile) -> GatedRequest {
        if !self.flags.avatars_enabled() {
            return GatedRequest::Placeholder;
        }
        if self.flags.nsfw_enabled() || profile.nsfw_layers.is_empty() {
            GatedRequest::Avatar(profile.clone())
        } else {
            GatedRequest::Avatar(profile.with_nsfw_layers(Vec::<String>::new()))
        }
    }

    /// Return the cached atlas for `(profile, options)` or generate, cache and return it.
    ///
    /// Generation failures (including worker failures) are returned; nothing is cached then.
    #[tracing::instrument(skip_all, fields(profile = %profile.id))]
    pub fn flatten(
        &self,
        profile: &AvatarProfile,
        options: &FlattenOptions,
        runner: &dyn TaskRunner,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<Arc<SpriteAtlas>> {
        let options = options.normalized()?;
        let request = self.gate(profile);
        let key = request.key(&options)?;
        if let Some(hit) = self.cache.get(key) {
            tracing::debug!(key = %key, "sprite atlas cache hit");
            return Ok(hit);
        }

        let figure = match &request {
            GatedRequest::Placeholder => procedural::placeholder(),
            GatedRequest::Avatar(gated) => {
                let registry = self.registry.registry();
                self.assembler
                    .assemble(gated, &registry, AssembleOptions::default())
                    .root
            }
        };
        let scene = apply_transform(&figure, &transform_for(RepresentationMode::SideScroller));

        let job = FlattenJob::new(key, scene, options);
        let atlas = Arc::new(runner.run(Arc::clone(&self.generator), job, progress)?);
        if let Err(e) = self.cache.put(Arc::clone(&atlas)) {
            tracing::warn!(key = %key, error = %e, "failed to persist sprite atlas");
        }
        Ok(atlas)
    }
}

/// One flatten request after the feature gates were applied.
enum GatedRequest {
    Placeholder,
    /// Profile with overlay layers already removed when NSFW was off.
    Avatar(AvatarProfile),
}

impl GatedRequest {
    fn key(&self, options: &FlattenOptions) -> ForgeResult<ContentKey> {
        match self {
            GatedRequest::Placeholder => placeholder_key(options),
            GatedRequest::Avatar(profile) => content_key(profile, options),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sprite/flatten.rs"]
mod tests;
