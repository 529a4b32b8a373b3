//! Bevy integration
//!
//! `MergeCorePlugin` puts the composition root in a resource and drives it
//! from the frame clock:
//! - `GameCommandEvent` in, `GameSignalEvent` and `GameCueEvent` out
//! - placed buildings mirrored as rapier sensor colliders, sharing the
//!   shapes the scene queries
//! - optional hot-reload of the level catalog file

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, Sensor};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::GameConfig;
use crate::game::{Game, VisualCue};
use crate::hotreload::CatalogWatcher;
use crate::layout::PlacementId;
use crate::level::{BuildingType, LevelCatalog};
use crate::scene::ColliderScene;
use crate::signals::{GameSignal, Subscription};

pub struct MergeCorePlugin {
    pub config: GameConfig,
    pub catalog: LevelCatalog,
    /// Catalog file to watch for changes
    pub catalog_path: Option<PathBuf>,
}

impl Default for MergeCorePlugin {
    fn default() -> Self {
        Self {
            config: GameConfig::default(),
            catalog: LevelCatalog::sample(),
            catalog_path: None,
        }
    }
}

impl Plugin for MergeCorePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<GameCommandEvent>()
            .add_event::<GameSignalEvent>()
            .add_event::<GameCueEvent>();

        let mut game = match Game::new(self.config.clone(), self.catalog.clone(), ColliderScene::new()) {
            Ok(game) => game,
            Err(e) => {
                error!("Merge core disabled: {}", e);
                return;
            }
        };
        let forwarder = SignalForwarder(Mutex::new(game.subscribe()));

        app.insert_resource(GameResource(game))
            .insert_resource(forwarder)
            .add_systems(Startup, start_game)
            .add_systems(Update, (drive_game, sync_building_colliders).chain());

        if let Some(path) = &self.catalog_path {
            match CatalogWatcher::watch(path) {
                Ok(watcher) => {
                    app.insert_resource(CatalogReloader(Mutex::new(watcher)))
                        .add_systems(Update, reload_catalog.before(drive_game));
                }
                Err(e) => warn!("Catalog hot-reload unavailable: {}", e),
            }
        }
    }
}

#[derive(Resource)]
pub struct GameResource(pub Game<ColliderScene>);

#[derive(Resource)]
struct SignalForwarder(Mutex<Subscription<GameSignal>>);

#[derive(Resource)]
struct CatalogReloader(Mutex<CatalogWatcher>);

/// Commands from the input layer
#[derive(Event, Debug, Clone, PartialEq)]
pub enum GameCommandEvent {
    /// World-space pick location
    Pick(Vec3),
    NextLevel,
    RestartLevel,
    LoadLevel(usize),
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSignalEvent(pub GameSignal);

#[derive(Event, Debug, Clone, PartialEq)]
pub struct GameCueEvent(pub VisualCue);

/// Mirrors one placed building
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedBuilding {
    pub id: PlacementId,
    pub building_type: BuildingType,
}

fn start_game(mut game: ResMut<GameResource>) {
    if let Err(e) = game.0.start() {
        error!("Failed to start first level: {}", e);
    }
}

fn drive_game(
    time: Res<Time>,
    mut requests: EventReader<GameCommandEvent>,
    mut game: ResMut<GameResource>,
    mut forwarder: ResMut<SignalForwarder>,
    mut signals: EventWriter<GameSignalEvent>,
    mut cues: EventWriter<GameCueEvent>,
) {
    let game = &mut game.0;
    for command in requests.read() {
        let result = match command {
            GameCommandEvent::Pick(point) => {
                let outcome = game.pick_collectable(*point);
                debug!("Pick at {:?}: {:?}", point, outcome);
                Ok(())
            }
            GameCommandEvent::NextLevel => game.next_level(),
            GameCommandEvent::RestartLevel => game.restart_level(),
            GameCommandEvent::LoadLevel(index) => game.load_level(*index),
        };
        if let Err(e) = result {
            debug!("Command {:?} failed: {}", command, e);
        }
    }

    game.tick(time.delta_secs());

    let subscription = match forwarder.0.get_mut() {
        Ok(s) => s,
        Err(poisoned) => poisoned.into_inner(),
    };
    for signal in subscription.drain() {
        signals.send(GameSignalEvent(signal));
    }
    for cue in game.drain_cues() {
        cues.send(GameCueEvent(cue));
    }
}

fn sync_building_colliders(
    mut commands: Commands,
    game: Res<GameResource>,
    mirrored: Query<(Entity, &PlacedBuilding)>,
) {
    let scene = game.0.host();
    let mut seen = HashSet::new();

    for (entity, building) in &mirrored {
        if scene.building(building.id).is_some() {
            seen.insert(building.id);
        } else {
            commands.entity(entity).despawn();
        }
    }

    for placement in scene.buildings().filter(|p| !seen.contains(&p.id)) {
        let Some((shape, transform)) = scene.building_shape(placement.id) else {
            continue;
        };
        commands.spawn((
            PlacedBuilding {
                id: placement.id,
                building_type: placement.building_type,
            },
            transform,
            Collider::from(shape),
            Sensor,
        ));
    }
}

fn reload_catalog(mut reloader: ResMut<CatalogReloader>, mut game: ResMut<GameResource>) {
    let watcher = match reloader.0.get_mut() {
        Ok(w) => w,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(Ok(catalog)) = watcher.poll() {
        if let Err(e) = game.0.replace_catalog(catalog) {
            error!("Reloaded catalog rejected: {}", e);
        }
    }
}
