use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use avatar_forge::profile::source::profile_from_creator_payload;
use avatar_forge::registry::builder::{build_registry, scan_content_tree};
use avatar_forge::{
    AnimationState, Assembler, AtlasCache, AvatarProfile, Direction, FlattenOptions, ForgeConfig,
    FsPartLoader, RegistryLoader, RepresentationMode, Renderer, SpriteFlattener, TaskRunnerKind,
    transform_for,
};

#[derive(Parser, Debug)]
#[command(name = "avatar-forge", version)]
struct Cli {
    /// Config file; defaults to $AVATAR_FORGE_CONFIG, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a content tree and write a registry document.
    BuildRegistry(BuildRegistryArgs),
    /// Render a single still as a PNG.
    Render(RenderArgs),
    /// Flatten a profile into a sprite atlas PNG plus frame metadata.
    Flatten(FlattenArgs),
    /// Print the representation mode table as JSON.
    Modes,
}

#[derive(Parser, Debug)]
struct BuildRegistryArgs {
    /// Content tree root.
    #[arg(long)]
    root: PathBuf,

    /// Output registry JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Registry version to stamp.
    #[arg(long, default_value_t = 1)]
    version: u32,

    /// Prefix for asset URLs (CDN hosting); relative paths otherwise.
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Profile JSON (creator payload); the default profile when omitted.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Representation mode (fullBody, bust, portrait, chibi, sideScroller).
    #[arg(long, default_value = "fullBody")]
    mode: RepresentationMode,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FlattenArgs {
    /// Profile JSON (creator payload); the default profile when omitted.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Output atlas PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Frame metadata JSON path; next to the PNG when omitted.
    #[arg(long)]
    meta: Option<PathBuf>,

    #[arg(long)]
    resolution: Option<u32>,

    #[arg(long)]
    frames: Option<u32>,

    /// Comma-separated animation states.
    #[arg(long, value_delimiter = ',')]
    states: Vec<AnimationState>,

    /// Comma-separated directions.
    #[arg(long, value_delimiter = ',')]
    directions: Vec<Direction>,

    /// Runner override (auto, worker, sync).
    #[arg(long)]
    runner: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::BuildRegistry(args) => cmd_build_registry(args),
        Command::Render(args) => cmd_render(&cfg, args),
        Command::Flatten(args) => cmd_flatten(&cfg, args),
        Command::Modes => cmd_modes(),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ForgeConfig> {
    match path {
        Some(p) => Ok(ForgeConfig::load(p)
            .with_context(|| format!("load config '{}'", p.display()))?
            .with_env_overrides()),
        None => Ok(ForgeConfig::from_env().context("load config from environment")?),
    }
}

fn read_profile(path: Option<&Path>) -> anyhow::Result<AvatarProfile> {
    let Some(path) = path else {
        return Ok(AvatarProfile::default());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("read profile '{}'", path.display()))?;
    Ok(profile_from_creator_payload(&bytes)
        .with_context(|| format!("parse profile '{}'", path.display()))?)
}

struct Services {
    registry: Arc<RegistryLoader>,
    assembler: Arc<Assembler>,
    flags: Arc<avatar_forge::FeatureFlags>,
}

fn services(cfg: &ForgeConfig) -> Services {
    let flags = Arc::new(cfg.feature_flags());
    let registry = Arc::new(RegistryLoader::new(cfg.registry_source()));
    let loader = Arc::new(FsPartLoader::new(cfg.assets_root.clone()));
    let assembler = Arc::new(Assembler::new(loader, Arc::clone(&flags)));
    Services {
        registry,
        assembler,
        flags,
    }
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn write_png(path: &Path, img: &image::RgbaImage) -> anyhow::Result<()> {
    create_parent_dir(path)?;
    image::save_buffer_with_format(
        path,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}

fn cmd_build_registry(args: BuildRegistryArgs) -> anyhow::Result<()> {
    let scanned = scan_content_tree(&args.root, args.base_url.as_deref())
        .with_context(|| format!("scan content tree '{}'", args.root.display()))?;
    let built = build_registry(args.version, &scanned);
    for w in &built.warnings {
        eprintln!("warning: {w}");
    }
    let json = serde_json::to_vec_pretty(&built.registry.to_document())
        .context("serialize registry")?;
    create_parent_dir(&args.out)?;
    std::fs::write(&args.out, json)
        .with_context(|| format!("write registry '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({} assets)",
        args.out.display(),
        built.registry.len()
    );
    Ok(())
}

fn cmd_render(cfg: &ForgeConfig, args: RenderArgs) -> anyhow::Result<()> {
    let profile = read_profile(args.profile.as_deref())?;
    let s = services(cfg);
    let renderer = Renderer::new(s.registry, s.assembler, s.flags);
    let frame = renderer
        .render_still(&profile, args.mode, args.width, args.height)
        .with_context(|| format!("render {} still", args.mode))?;
    let img = frame.to_rgba_image()?;
    write_png(&args.out, &img)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_flatten(cfg: &ForgeConfig, args: FlattenArgs) -> anyhow::Result<()> {
    let profile = read_profile(args.profile.as_deref())?;
    let mut options = cfg.sprites.defaults.clone();
    if let Some(r) = args.resolution {
        options.resolution = r;
    }
    if let Some(n) = args.frames {
        options.frame_count = n;
    }
    if !args.states.is_empty() {
        options.animation_states = args.states;
    }
    if !args.directions.is_empty() {
        options.directions = args.directions;
    }
    let runner_kind = match args.runner.as_deref() {
        Some(raw) => serde_json::from_value::<TaskRunnerKind>(serde_json::Value::String(
            raw.to_ascii_lowercase(),
        ))
        .with_context(|| format!("unknown runner '{raw}'"))?,
        None => cfg.sprites.runner,
    };

    let s = services(cfg);
    let cache = Arc::new(AtlasCache::new(cfg.atlas_store()));
    let flattener = SpriteFlattener::new(s.registry, s.assembler, s.flags, cache);
    let runner = runner_kind.runner();
    let atlas = flattener
        .flatten(&profile, &options, runner.as_ref(), &mut |p| {
            eprintln!(
                "[{}/{}] {} {}",
                p.completed, p.total, p.state, p.direction
            );
        })
        .context("flatten sprite atlas")?;

    write_png(&args.out, atlas.image())?;
    let meta_path = args
        .meta
        .unwrap_or_else(|| args.out.with_extension("json"));
    let meta = serde_json::json!({
        "key": atlas.key().to_hex(),
        "frameWidth": atlas.frame_width(),
        "frameHeight": atlas.frame_height(),
        "width": atlas.width(),
        "height": atlas.height(),
        "frames": atlas.frames(),
    });
    create_parent_dir(&meta_path)?;
    std::fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)
        .with_context(|| format!("write metadata '{}'", meta_path.display()))?;
    eprintln!(
        "wrote {} and {} ({} frames)",
        args.out.display(),
        meta_path.display(),
        atlas.frames().len()
    );
    Ok(())
}

fn cmd_modes() -> anyhow::Result<()> {
    let table: serde_json::Map<String, serde_json::Value> = RepresentationMode::ALL
        .into_iter()
        .map(|m| Ok((m.to_string(), serde_json::to_value(transform_for(m))?)))
        .collect::<Result<_, serde_json::Error>>()?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
