use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::assemble::pipeline::{AssembleOptions, Assembler};
use crate::assemble::procedural;
use crate::config::flags::FeatureFlags;
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::profile::model::AvatarProfile;
use crate::registry::loader::RegistryProvider;
use crate::render::camera::OrthoCamera;
use crate::render::cpu::{RasterSettings, render_scene};
use crate::render::frame::FrameRGBA;
use crate::representation::{RepresentationMode, apply_transform, transform_for};
use crate::scene::graph::SceneNode;

/// Presentation surface a mounted renderer draws into.
pub trait CanvasContext: Send {
    /// Drawable size in pixels.
    fn size(&self) -> (u32, u32);
    fn present(&mut self, frame: &FrameRGBA) -> ForgeResult<()>;
    /// Release the surface; called exactly once when the renderer stops.
    fn release(&mut self);
}

/// Host frame pacing. Returning `false` ends the render loop.
pub trait FrameClock: Send {
    fn next_frame(&mut self) -> bool;
}

/// Ticks a fixed number of frames, sleeping `interval` between them.
#[derive(Clone, Copy, Debug)]
pub struct FixedFrames {
    remaining: u64,
    interval: Duration,
}

impl FixedFrames {
    pub fn new(count: u64, interval: Duration) -> Self {
        Self {
            remaining: count,
            interval,
        }
    }
}

impl FrameClock for FixedFrames {
    fn next_frame(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.remaining -= 1;
        true
    }
}

/// Scene ready for rasterization in one mode.
#[derive(Clone, Debug)]
pub struct PreparedScene {
    pub root: SceneNode,
    pub mode: RepresentationMode,
    pub placeholder: bool,
}

/// Binds profiles, representation modes and canvases into displayed frames.
pub struct Renderer {
    registry: Arc<dyn RegistryProvider>,
    assembler: Arc<Assembler>,
    flags: Arc<FeatureFlags>,
    settings: RasterSettings,
}

impl Renderer {
    pub fn new(
        registry: Arc<dyn RegistryProvider>,
        assembler: Arc<Assembler>,
        flags: Arc<FeatureFlags>,
    ) -> Self {
        Self {
            registry,
            assembler,
            flags,
            settings: RasterSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RasterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolve, assemble and apply the mode transform.
    ///
    /// With avatars disabled this returns the placeholder without consulting the registry or
    /// loading any asset.
    #[tracing::instrument(skip(self, profile), fields(profile = %profile.id))]
    pub fn prepare(&self, profile: &AvatarProfile, mode: RepresentationMode) -> PreparedScene {
        let t = transform_for(mode);
        if !self.flags.avatars_enabled() {
            tracing::debug!("avatars disabled; rendering placeholder");
            return PreparedScene {
                root: apply_transform(&procedural::placeholder(), &t),
                mode,
                placeholder: true,
            };
        }
        let registry = self.registry.registry();
        let avatar = self
            .assembler
            .assemble(profile, &registry, AssembleOptions::default());
        PreparedScene {
            root: apply_transform(&avatar.root, &t),
            mode,
            placeholder: false,
        }
    }

    /// Render one frame of `scene` at the given size.
    pub fn render_prepared(
        &self,
        scene: &PreparedScene,
        width: u32,
        height: u32,
    ) -> ForgeResult<FrameRGBA> {
        let t = transform_for(scene.mode);
        let camera = OrthoCamera::for_transform(&t, width, height);
        render_scene(&scene.root, &camera, t.crop.as_ref(), &self.settings)
    }

    /// One-off still for tools and tests.
    pub fn render_still(
        &self,
        profile: &AvatarProfile,
        mode: RepresentationMode,
        width: u32,
        height: u32,
    ) -> ForgeResult<FrameRGBA> {
        let scene = self.prepare(profile, mode);
        self.render_prepared(&scene, width, height)
    }

    /// Start the render loop on a dedicated thread.
    ///
    /// The scene is prepared on the calling thread. The loop renders and presents one frame per
    /// clock tick until the clock ends, presentation fails, or the renderer is unmounted.
    pub fn mount(
        &self,
        profile: &AvatarProfile,
        mode: RepresentationMode,
        surface: Box<dyn CanvasContext>,
        clock: Box<dyn FrameClock>,
    ) -> ForgeResult<MountedRenderer> {
        let scene = self.prepare(profile, mode);
        let placeholder = scene.placeholder;
        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));

        let worker = RenderLoop {
            scene,
            settings: self.settings,
            surface: SurfaceGuard(surface),
            clock,
            stop: Arc::clone(&stop),
            frames: Arc::clone(&frames),
        };
        let handle = std::thread::Builder::new()
            .name("avatar-render".to_string())
            .spawn(move || worker.run())
            .map_err(|e| ForgeError::render(format!("failed to spawn render thread: {e}")))?;

        Ok(MountedRenderer {
            stop,
            frames,
            placeholder,
            thread: Some(handle),
        })
    }
}

/// Releases the wrapped surface when dropped, so release happens even if the loop panics.
struct SurfaceGuard(Box<dyn CanvasContext>);

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

struct RenderLoop {
    scene: PreparedScene,
    settings: RasterSettings,
    surface: SurfaceGuard,
    clock: Box<dyn FrameClock>,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl RenderLoop {
    fn run(mut self) {
        let t = transform_for(self.scene.mode);
        let mut last: Option<((u32, u32), FrameRGBA)> = None;
        while !self.stop.load(Ordering::Acquire) && self.clock.next_frame() {
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            let size = self.surface.0.size();
            let frame = match last.take() {
                // The placeholder is static: reuse the last frame while the size holds.
                Some((s, frame)) if self.scene.placeholder && s == size => frame,
                _ => {
                    let camera = OrthoCamera::for_transform(&t, size.0, size.1);
                    match render_scene(&self.scene.root, &camera, t.crop.as_ref(), &self.settings)
                    {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(error = %e, "render loop stopped: frame failed");
                            break;
                        }
                    }
                }
            };
            if let Err(e) = self.surface.0.present(&frame) {
                tracing::warn!(error = %e, "render loop stopped: present failed");
                break;
            }
            self.frames.fetch_add(1, Ordering::AcqRel);
            last = Some((size, frame));
        }
        tracing::debug!(
            frames = self.frames.load(Ordering::Acquire),
            "render loop finished"
        );
    }
}

/// Handle to a running render loop. Unmounting (or dropping) stops the loop, joins the thread and
/// releases the surface.
pub struct MountedRenderer {
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    placeholder: bool,
    thread: Option<JoinHandle<()>>,
}

impl MountedRenderer {
    pub fn frames_presented(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop and wait for it. Returns the number of frames presented.
    pub fn unmount(mut self) -> ForgeResult<u64> {
        self.shutdown()?;
        Ok(self.frames_presented())
    }

    /// Wait for the clock to end the loop on its own.
    pub fn join(mut self) -> ForgeResult<u64> {
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| ForgeError::render("render thread panicked"))?;
        }
        Ok(self.frames_presented())
    }

    fn shutdown(&mut self) -> ForgeResult<()> {
        self.stop.store(true, Ordering::Release);
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ForgeError::render("render thread panicked")),
            None => Ok(()),
        }
    }
}

impl Drop for MountedRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "render loop ended abnormally");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
