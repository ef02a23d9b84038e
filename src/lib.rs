#![forbid(unsafe_code)]

pub mod assemble;
pub mod config;
pub mod consumer;
pub mod foundation;
pub mod material;
pub mod profile;
pub mod registry;
pub mod render;
pub mod representation;
pub mod scene;
pub mod sprite;
pub mod storage;

pub use assemble::parts::{FsPartLoader, PartAsset, PartLoader, StaticPartLoader};
pub use assemble::pipeline::{AssembleOptions, AssembledAvatar, Assembler, PartSource};
pub use config::{FeatureFlags, FlagConfig, ForgeConfig, RegistryLocation};
pub use consumer::{GameCatalog, GameSurface, SurfaceKind, SurfaceRouter};
pub use foundation::core::{Color, Transform3};
pub use foundation::error::{ForgeError, ForgeResult};
pub use foundation::fingerprint::ContentKey;
pub use material::Material;
pub use profile::model::{AvatarProfile, ColorPalette};
pub use registry::loader::{RegistryLoader, RegistryProvider, RegistrySource};
pub use registry::model::{AssetMeta, Registry, Slot};
pub use render::frame::FrameRGBA;
pub use render::renderer::{CanvasContext, FrameClock, MountedRenderer, Renderer};
pub use representation::{RepresentationMode, RepresentationTransform, transform_for};
pub use scene::graph::SceneNode;
pub use sprite::atlas::{FrameRecord, SpriteAtlas};
pub use sprite::cache::AtlasCache;
pub use sprite::flatten::{FlattenOptions, SpriteFlattener};
pub use sprite::pose::{AnimationState, Direction, PoseStrategy};
pub use sprite::runner::{SyncTaskRunner, TaskRunner, TaskRunnerKind, WorkerTaskRunner};
pub use storage::{DirStore, KeyValueStore, MemoryStore};
