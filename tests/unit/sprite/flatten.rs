use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::assemble::parts::StaticPartLoader;
use crate::assemble::pipeline::NSFW_OVERLAY_NODE;
use crate::registry::model::Registry;
use crate::sprite::runner::{SyncTaskRunner, WorkerTaskRunner};
use crate::storage::MemoryStore;

struct CountingGenerator {
    inner: OffscreenAtlasGenerator,
    calls: AtomicUsize,
}

impl AtlasGenerator for CountingGenerator {
    fn generate(
        &self,
        job: &FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate(job, progress)
    }
}

struct SpyRegistry {
    calls: AtomicUsize,
}

impl RegistryProvider for SpyRegistry {
    fn registry(&self) -> Arc<Registry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Arc::new(Registry::builtin())
    }
}

struct Fixture {
    flattener: SpriteFlattener,
    generator: Arc<CountingGenerator>,
    registry: Arc<SpyRegistry>,
    flags: Arc<FeatureFlags>,
}

fn fixture() -> Fixture {
    let flags = Arc::new(FeatureFlags::new(true, false));
    let registry = Arc::new(SpyRegistry {
        calls: AtomicUsize::new(0),
    });
    let assembler = Arc::new(Assembler::new(
        Arc::new(StaticPartLoader::new()),
        Arc::clone(&flags),
    ));
    let cache = Arc::new(AtlasCache::new(Arc::new(MemoryStore::new())));
    let generator = Arc::new(CountingGenerator {
        inner: OffscreenAtlasGenerator::default(),
        calls: AtomicUsize::new(0),
    });
    let flattener = SpriteFlattener::new(registry.clone(), assembler, Arc::clone(&flags), cache)
        .with_generator(generator.clone());
    Fixture {
        flattener,
        generator,
        registry,
        flags,
    }
}

fn small(frame_count: u32) -> FlattenOptions {
    FlattenOptions {
        resolution: 24,
        frame_count,
        ..FlattenOptions::default()
    }
}

#[test]
fn defaults_match_side_scroller_needs() {
    let o = FlattenOptions::default();
    assert_eq!(o.resolution, 128);
    assert_eq!(o.frame_count, 8);
    assert_eq!(o.animation_states, vec![AnimationState::Idle, AnimationState::Walk]);
    assert_eq!(o.directions, vec![Direction::Left, Direction::Right]);
    assert_eq!(o.total_frames(), 32);
}

#[test]
fn normalization_validates_and_dedupes() {
    let o = FlattenOptions {
        animation_states: vec![AnimationState::Walk, AnimationState::Idle, AnimationState::Walk],
        directions: vec![Direction::Right, Direction::Right],
        ..FlattenOptions::default()
    }
    .normalized()
    .unwrap();
    assert_eq!(o.animation_states, vec![AnimationState::Walk, AnimationState::Idle]);
    assert_eq!(o.directions, vec![Direction::Right]);

    for bad in [
        FlattenOptions { resolution: 0, ..FlattenOptions::default() },
        FlattenOptions { frame_count: 0, ..FlattenOptions::default() },
        FlattenOptions { animation_states: vec![], ..FlattenOptions::default() },
        FlattenOptions { directions: vec![], ..FlattenOptions::default() },
    ] {
        assert!(matches!(bad.normalized(), Err(ForgeError::Validation(_))));
    }
}

#[test]
fn atlas_edge_bounds_total_frames() {
    let huge = FlattenOptions {
        resolution: MAX_RESOLUTION,
        frame_count: MAX_FRAME_COUNT,
        animation_states: AnimationState::ALL.to_vec(),
        directions: Direction::ALL.to_vec(),
    };
    assert_eq!(huge.total_frames(), 3360);
    assert!(matches!(huge.normalized(), Err(ForgeError::Validation(_))));

    // 3360 frames pack into a 58x58 grid.
    let fits = FlattenOptions { resolution: 282, ..huge.clone() };
    assert!(fits.normalized().is_ok());
    let over = FlattenOptions { resolution: 283, ..huge };
    assert!(matches!(over.normalized(), Err(ForgeError::Validation(_))));
}

#[test]
fn options_deserialize_with_defaults() {
    let o: FlattenOptions =
        serde_json::from_str(r#"{"frameCount":4,"animationStates":["jump"]}"#).unwrap();
    assert_eq!(o.frame_count, 4);
    assert_eq!(o.resolution, 128);
    assert_eq!(o.animation_states, vec![AnimationState::Jump]);
}

#[test]
fn content_key_tracks_profile_and_options() {
    let p = AvatarProfile::default();
    let o = FlattenOptions::default();
    assert_eq!(content_key(&p, &o).unwrap(), content_key(&p, &o).unwrap());
    assert_ne!(
        content_key(&p, &o).unwrap(),
        content_key(&p.with_id("other"), &o).unwrap()
    );
    assert_ne!(
        content_key(&p, &o).unwrap(),
        content_key(&p, &small(8)).unwrap()
    );
}

#[test]
fn flatten_covers_every_triple_once() {
    let f = fixture();
    let mut reports = Vec::new();
    let atlas = f
        .flattener
        .flatten(&AvatarProfile::default(), &small(8), &SyncTaskRunner, &mut |p| {
            reports.push(p)
        })
        .unwrap();

    assert_eq!(atlas.frames().len(), 32);
    let keys: BTreeSet<_> = atlas
        .frames()
        .iter()
        .map(|r| (r.state, r.direction, r.frame_index))
        .collect();
    assert_eq!(keys.len(), 32);
    assert_eq!((atlas.width(), atlas.height()), (6 * 24, 6 * 24));

    assert_eq!(reports.len(), 4);
    assert_eq!(reports.last().map(|p| (p.completed, p.total)), Some((4, 4)));

    let frame = atlas
        .frame_image(AnimationState::Idle, Direction::Left, 0)
        .unwrap();
    assert!(frame.pixels().any(|p| p.0[3] > 0));
}

#[test]
fn repeat_requests_hit_the_cache() {
    let f = fixture();
    let profile = AvatarProfile::default();
    let a = f
        .flattener
        .flatten(&profile, &small(2), &SyncTaskRunner, &mut |_| {})
        .unwrap();
    let b = f
        .flattener
        .flatten(&profile, &small(2), &SyncTaskRunner, &mut |_| {})
        .unwrap();
    assert_eq!(f.generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.key(), b.key());
    assert_eq!(a.frames(), b.frames());
    assert!(f.flattener.cache().get(a.key()).is_some());
}

#[test]
fn worker_and_sync_runners_agree() {
    let f = fixture();
    let profile = AvatarProfile::default().with_id("worker");
    let opts = small(3);
    let key = f.flattener.key_for(&profile, &opts).unwrap();
    let via_worker = f
        .flattener
        .flatten(&profile, &opts, &WorkerTaskRunner, &mut |_| {})
        .unwrap();
    assert_eq!(via_worker.key(), key);

    f.flattener.cache().invalidate(key).unwrap();
    let via_sync = f
        .flattener
        .flatten(&profile, &opts, &SyncTaskRunner, &mut |_| {})
        .unwrap();
    assert_eq!(via_worker.frames(), via_sync.frames());
    assert_eq!(via_worker.image(), via_sync.image());
    assert_eq!(f.generator.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn disabled_avatars_flatten_placeholder_without_registry() {
    let f = fixture();
    f.flags.set_avatars_enabled(false);
    let atlas = f
        .flattener
        .flatten(&AvatarProfile::default(), &small(1), &SyncTaskRunner, &mut |_| {})
        .unwrap();
    assert_eq!(atlas.frames().len(), 4);
    assert_eq!(f.registry.calls.load(Ordering::SeqCst), 0);

    f.flags.set_avatars_enabled(true);
    let enabled_key = f
        .flattener
        .key_for(&AvatarProfile::default(), &small(1))
        .unwrap();
    assert_ne!(enabled_key, atlas.key());
}

#[test]
fn nsfw_layers_only_affect_the_key_when_enabled() {
    let f = fixture();
    let plain = AvatarProfile::default();
    let layered = plain.with_nsfw_layers(["overlay_a"]);
    let o = small(1);
    assert_eq!(
        f.flattener.key_for(&plain, &o).unwrap(),
        f.flattener.key_for(&layered, &o).unwrap()
    );
    f.flags.set_nsfw_enabled(true);
    assert_ne!(
        f.flattener.key_for(&plain, &o).unwrap(),
        f.flattener.key_for(&layered, &o).unwrap()
    );
}

#[test]
fn invalid_options_fail_before_any_work() {
    let f = fixture();
    let err = f
        .flattener
        .flatten(
            &AvatarProfile::default(),
            &FlattenOptions { resolution: 0, ..FlattenOptions::default() },
            &SyncTaskRunner,
            &mut |_| {},
        )
        .unwrap_err();
    assert!(matches!(err, ForgeError::Validation(_)));
    assert_eq!(f.generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.registry.calls.load(Ordering::SeqCst), 0);
}

struct FlipsNsfwOnLoad {
    flags: Arc<FeatureFlags>,
    registry: Arc<Registry>,
}

impl RegistryProvider for FlipsNsfwOnLoad {
    fn registry(&self) -> Arc<Registry> {
        self.flags.set_nsfw_enabled(true);
        Arc::clone(&self.registry)
    }
}

struct OverlayWitness {
    inner: OffscreenAtlasGenerator,
    saw_overlay: std::sync::atomic::AtomicBool,
}

impl AtlasGenerator for OverlayWitness {
    fn generate(
        &self,
        job: &FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas> {
        if job.scene.find(NSFW_OVERLAY_NODE).is_some() {
            self.saw_overlay.store(true, Ordering::SeqCst);
        }
        self.inner.generate(job, progress)
    }
}

#[test]
fn nsfw_flip_mid_request_keeps_overlay_out_of_safe_atlas() {
    use crate::assemble::parts::{PartAsset, PartMesh};
    use crate::registry::model::{AssetHost, AssetMeta, Coverage, Slot};
    use crate::scene::geometry::Geometry;
    use crate::scene::graph::Surface;

    let meta = AssetMeta {
        id: "layer_a".to_string(),
        slot: Slot::Torso,
        nsfw: true,
        url: "layer_a.json".to_string(),
        host: AssetHost::Local,
        hash: String::new(),
        coverage: Coverage::Standard,
    };
    let registry = Arc::new(
        Registry::from_parts(
            1,
            [(meta.id.clone(), meta)].into_iter().collect(),
            Default::default(),
        )
        .0,
    );
    let loader = StaticPartLoader::new().with_part(
        "layer_a",
        PartAsset {
            meshes: vec![PartMesh {
                name: "lace".to_string(),
                surface: Surface::Skin,
                color: None,
                geometry: Geometry::sphere(0.1),
                transform: Transform3::IDENTITY,
            }],
        },
    );

    let flags = Arc::new(FeatureFlags::new(true, false));
    let assembler = Arc::new(Assembler::new(Arc::new(loader), Arc::clone(&flags)));
    let witness = Arc::new(OverlayWitness {
        inner: OffscreenAtlasGenerator::default(),
        saw_overlay: std::sync::atomic::AtomicBool::new(false),
    });
    let flattener = SpriteFlattener::new(
        Arc::new(FlipsNsfwOnLoad {
            flags: Arc::clone(&flags),
            registry,
        }),
        assembler,
        Arc::clone(&flags),
        Arc::new(AtlasCache::new(Arc::new(MemoryStore::new()))),
    )
    .with_generator(witness.clone());

    let plain = AvatarProfile::default();
    let layered = plain.with_nsfw_layers(["layer_a"]);
    let safe_key = flattener.key_for(&plain, &small(1)).unwrap();

    let atlas = flattener
        .flatten(&layered, &small(1), &SyncTaskRunner, &mut |_| {})
        .unwrap();
    assert!(flags.nsfw_enabled());
    assert_eq!(atlas.key(), safe_key);
    assert!(!witness.saw_overlay.load(Ordering::SeqCst));

    // With the flag now on from the start, the layered request gets its own key and overlay.
    let gated = flattener
        .flatten(&layered, &small(1), &SyncTaskRunner, &mut |_| {})
        .unwrap();
    assert_ne!(gated.key(), safe_key);
    assert!(witness.saw_overlay.load(Ordering::SeqCst));
}
