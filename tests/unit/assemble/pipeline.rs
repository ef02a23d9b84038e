use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::assemble::parts::{PartMesh, StaticPartLoader};
use crate::foundation::core::{Color, Transform3};
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::profile::model::ColorPalette;
use crate::registry::model::{AssetHost, Coverage};
use crate::scene::geometry::Geometry;

fn asset(id: &str, slot: Slot, nsfw: bool) -> AssetMeta {
    AssetMeta {
        id: id.to_string(),
        slot,
        nsfw,
        url: format!("{id}.json"),
        host: AssetHost::Local,
        hash: String::new(),
        coverage: Coverage::Standard,
    }
}

fn part(surface: Surface) -> PartAsset {
    PartAsset {
        meshes: vec![PartMesh {
            name: "mesh".to_string(),
            surface,
            color: None,
            geometry: Geometry::sphere(0.1),
            transform: Transform3::IDENTITY,
        }],
    }
}

fn registry() -> Registry {
    let assets = [
        asset("head_default", Slot::Head, false),
        asset("torso_default", Slot::Torso, false),
        asset("legs_default", Slot::Legs, false),
        asset("hat", Slot::Accessory, false),
        asset("torso_lewd", Slot::Torso, true),
        asset("overlay_a", Slot::Torso, true),
        asset("overlay_b", Slot::Legs, true),
    ]
    .into_iter()
    .map(|m| (m.id.clone(), m))
    .collect();
    Registry::from_parts(3, assets, BTreeMap::new()).0
}

struct CountingLoader {
    inner: StaticPartLoader,
    calls: AtomicUsize,
}

impl PartLoader for CountingLoader {
    fn load(&self, meta: &AssetMeta) -> ForgeResult<PartAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load(meta)
    }
}

fn counting_loader() -> Arc<CountingLoader> {
    Arc::new(CountingLoader {
        inner: StaticPartLoader::new()
            .with_part("head_default", part(Surface::Skin))
            .with_part("torso_default", part(Surface::Outfit))
            .with_part("legs_default", part(Surface::Outfit))
            .with_part("hat", part(Surface::Accent))
            .with_part("torso_lewd", part(Surface::Skin))
            .with_part("overlay_a", part(Surface::Skin)),
        calls: AtomicUsize::new(0),
    })
}

fn assembler(loader: Arc<CountingLoader>, nsfw: bool) -> Assembler {
    Assembler::new(loader, Arc::new(FeatureFlags::new(true, nsfw)))
}

fn full_profile() -> AvatarProfile {
    AvatarProfile::default()
        .with_part(Slot::Head, "head_default")
        .with_part(Slot::Torso, "torso_default")
        .with_part(Slot::Legs, "legs_default")
        .with_part(Slot::Accessory, "hat")
}

#[test]
fn resolved_profile_uses_assets_and_recolors() {
    let a = assembler(counting_loader(), false);
    let out = a.assemble(&full_profile(), &registry(), AssembleOptions::default());
    assert_eq!(out.parts[&Slot::Head], PartSource::Asset("head_default".into()));
    assert_eq!(out.parts[&Slot::Accessory], PartSource::Asset("hat".into()));
    assert!(out.recolored);
    assert!(!out.is_procedural());
    assert_eq!(
        out.material("head_default/mesh").unwrap().base_color(),
        ColorPalette::default().skin
    );
    assert!(out.body().is_some());
    assert!(out.nsfw_overlay().is_none());
}

#[test]
fn missing_required_slot_makes_whole_body_procedural() {
    let loader = counting_loader();
    let a = assembler(loader, false);
    let skin = Color::rgb(0xff, 0xdb, 0xac);
    let profile = full_profile()
        .with_part(Slot::Head, "missing_id")
        .with_palette(ColorPalette {
            skin,
            ..ColorPalette::default()
        });
    let out = a.assemble(&profile, &registry(), AssembleOptions::default());
    assert!(out.is_procedural());
    assert_eq!(out.parts[&Slot::Torso], PartSource::Procedural);
    assert_eq!(out.parts[&Slot::Accessory], PartSource::Omitted);
    assert_eq!(out.material("head").unwrap().base_color(), skin);
    assert!(!out.recolored);
    assert!(out.root.find("torso_default/mesh").is_none());
}

#[test]
fn nsfw_or_wrong_slot_body_parts_do_not_resolve() {
    let a = assembler(counting_loader(), true);
    let lewd = full_profile().with_part(Slot::Torso, "torso_lewd");
    assert!(a.assemble(&lewd, &registry(), AssembleOptions::default()).is_procedural());
    let wrong = full_profile().with_part(Slot::Legs, "head_default");
    assert!(a.assemble(&wrong, &registry(), AssembleOptions::default()).is_procedural());
}

#[test]
fn load_assets_false_skips_loader() {
    let loader = counting_loader();
    let a = assembler(Arc::clone(&loader), true);
    let profile = full_profile().with_nsfw_layers(["overlay_a"]);
    let out = a.assemble(&profile, &registry(), AssembleOptions { load_assets: false });
    assert!(out.is_procedural());
    assert!(out.nsfw_overlay().is_none());
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_accessory_is_omitted_not_fatal() {
    let a = assembler(counting_loader(), false);
    let profile = full_profile().with_part(Slot::Accessory, "nope");
    let out = a.assemble(&profile, &registry(), AssembleOptions::default());
    assert!(!out.is_procedural());
    assert_eq!(out.parts[&Slot::Accessory], PartSource::Omitted);
}

#[test]
fn overlay_requires_flag_layers_and_resolution() {
    let reg = registry();
    let with_layers = full_profile().with_nsfw_layers(["overlay_a", "overlay_b", "hat", "ghost"]);

    let on = assembler(counting_loader(), true).assemble(&with_layers, &reg, AssembleOptions::default());
    let overlay = on.nsfw_overlay().unwrap();
    // overlay_b has no loadable part, hat is not NSFW, ghost is unknown.
    assert_eq!(on.overlay_layers, vec!["overlay_a".to_string()]);
    let mut orders = Vec::new();
    overlay.visit_meshes(Mat4::IDENTITY, &mut |_, m, _| orders.push(m.render_order));
    assert!(!orders.is_empty());
    assert!(orders.iter().all(|o| *o == OVERLAY_RENDER_ORDER));

    let no_layers = assembler(counting_loader(), true).assemble(&full_profile(), &reg, AssembleOptions::default());
    assert!(no_layers.nsfw_overlay().is_none());

    let unresolvable = full_profile().with_nsfw_layers(["ghost", "hat"]);
    let out = assembler(counting_loader(), true).assemble(&unresolvable, &reg, AssembleOptions::default());
    assert!(out.nsfw_overlay().is_none());
}

#[test]
fn flag_off_never_touches_overlay_assets() {
    let loader = counting_loader();
    let a = assembler(Arc::clone(&loader), false);
    let profile = AvatarProfile::default().with_nsfw_layers(["overlay_a"]);
    let out = a.assemble(&profile, &registry(), AssembleOptions::default());
    assert!(out.nsfw_overlay().is_none());
    assert!(out.overlay_layers.is_empty());
    // Procedural body and a disabled overlay: no loads at all.
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    assert!(out.root.find(NSFW_OVERLAY_NODE).is_none());
}

#[test]
fn overlay_attaches_to_procedural_body_too() {
    let a = assembler(counting_loader(), true);
    let profile = AvatarProfile::default().with_nsfw_layers(["overlay_a"]);
    let out = a.assemble(&profile, &registry(), AssembleOptions::default());
    assert!(out.is_procedural());
    assert!(out.nsfw_overlay().is_some());
}

#[test]
fn failing_loader_still_yields_a_figure() {
    struct Broken;
    impl PartLoader for Broken {
        fn load(&self, _: &AssetMeta) -> ForgeResult<PartAsset> {
            Err(ForgeError::asset("disk on fire"))
        }
    }
    let a = Assembler::new(Arc::new(Broken), Arc::new(FeatureFlags::new(true, true)));
    let out = a.assemble(
        &full_profile().with_nsfw_layers(["overlay_a"]),
        &registry(),
        AssembleOptions::default(),
    );
    assert!(out.root.mesh_count() > 0);
    assert!(out.is_procedural());
    assert!(out.nsfw_overlay().is_none());
}
