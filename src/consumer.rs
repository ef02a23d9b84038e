//! Routing of game-surface requests to rendered figures or sprite atlases.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::foundation::error::ForgeResult;
use crate::profile::model::AvatarProfile;
use crate::render::renderer::{PreparedScene, Renderer};
use crate::representation::RepresentationMode;
use crate::sprite::atlas::SpriteAtlas;
use crate::sprite::flatten::{FlattenOptions, SpriteFlattener};
use crate::sprite::runner::{FlattenProgress, TaskRunnerKind};

/// How a game displays avatars.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceKind {
    /// Live 3D figure in one representation mode.
    Rendered(RepresentationMode),
    /// Flattened sprite sheet addressed by `(state, direction, frame)`.
    Sprites(FlattenOptions),
}

impl Default for SurfaceKind {
    fn default() -> Self {
        SurfaceKind::Rendered(RepresentationMode::FullBody)
    }
}

/// `gameId` to surface table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameCatalog {
    games: BTreeMap<String, SurfaceKind>,
}

impl GameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(games: BTreeMap<String, SurfaceKind>) -> Self {
        Self { games }
    }

    pub fn with_game(mut self, game_id: impl Into<String>, kind: SurfaceKind) -> Self {
        self.games.insert(game_id.into(), kind);
        self
    }

    /// Surface for `game_id`; unknown games get a full-body render.
    pub fn surface_for(&self, game_id: &str) -> SurfaceKind {
        self.games.get(game_id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

/// What a game surface receives.
#[derive(Clone, Debug)]
pub enum GameSurface {
    Rendered(PreparedScene),
    Sprites(Arc<SpriteAtlas>),
}

/// Serves `(gameId, profile)` requests.
pub struct SurfaceRouter {
    catalog: GameCatalog,
    renderer: Arc<Renderer>,
    flattener: Arc<SpriteFlattener>,
    runner: TaskRunnerKind,
}

impl SurfaceRouter {
    pub fn new(
        catalog: GameCatalog,
        renderer: Arc<Renderer>,
        flattener: Arc<SpriteFlattener>,
        runner: TaskRunnerKind,
    ) -> Self {
        Self {
            catalog,
            renderer,
            flattener,
            runner,
        }
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    /// Prepare the figure or flatten the atlas a game asked for.
    ///
    /// Sprite requests may block for the whole generation; call off interactive loops.
    #[tracing::instrument(skip(self, profile, progress), fields(profile = %profile.id))]
    pub fn request(
        &self,
        game_id: &str,
        profile: &AvatarProfile,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<GameSurface> {
        match self.catalog.surface_for(game_id) {
            SurfaceKind::Rendered(mode) => {
                Ok(GameSurface::Rendered(self.renderer.prepare(profile, mode)))
            }
            SurfaceKind::Sprites(options) => {
                let runner = self.runner.runner();
                self.flattener
                    .flatten(profile, &options, runner.as_ref(), progress)
                    .map(GameSurface::Sprites)
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/consumer.rs"]
mod tests;
