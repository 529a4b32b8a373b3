//! Headless Merge Town session driven by a scripted player.
//!
//! Usage: merge-town-sim [levels-to-play]

use anyhow::{Context, Result};
use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use std::path::Path;
use std::time::Duration;

use merge_core::logging::init_tracing;
use merge_core::plugin::{GameCommandEvent, GameResource, GameSignalEvent};
use merge_core::{GameConfig, GameSignal, LevelCatalog, MergeCorePlugin};

const GAME_CONFIG_PATH: &str = "config/game.ron";
const LEVELS_PATH: &str = "config/levels.ron";

/// Scripted player state
#[derive(Resource)]
struct Bot {
    pick_timer: Timer,
    completed: u32,
    target_levels: u32,
}

fn main() -> Result<()> {
    let target_levels = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u32>()
            .with_context(|| format!("invalid level count: {arg}"))?,
        None => 3,
    };

    let config = if Path::new(GAME_CONFIG_PATH).exists() {
        GameConfig::load(GAME_CONFIG_PATH).context("loading game config")?
    } else {
        GameConfig::default()
    };
    init_tracing(&config.logging);

    let (catalog, catalog_path) = if Path::new(LEVELS_PATH).exists() {
        let catalog = LevelCatalog::load(LEVELS_PATH).context("loading level catalog")?;
        (catalog, Some(LEVELS_PATH.into()))
    } else {
        (LevelCatalog::sample(), None)
    };
    config.validate().context("validating game config")?;
    catalog.validate().context("validating level catalog")?;
    info!(
        "Starting session: {} levels in catalog, playing {}",
        catalog.level_count(),
        target_levels
    );

    let exit = App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
            Duration::from_secs_f64(1.0 / 60.0),
        )))
        .add_plugins(MergeCorePlugin {
            config,
            catalog,
            catalog_path,
        })
        .insert_resource(Bot {
            pick_timer: Timer::from_seconds(0.3, TimerMode::Repeating),
            completed: 0,
            target_levels,
        })
        .add_systems(Update, (react_to_signals, pick_needed_buildings))
        .run();

    info!("Session finished: {:?}", exit);
    Ok(())
}

fn react_to_signals(
    mut signals: EventReader<GameSignalEvent>,
    mut commands: EventWriter<GameCommandEvent>,
    mut exit: EventWriter<AppExit>,
    mut bot: ResMut<Bot>,
) {
    for GameSignalEvent(signal) in signals.read() {
        match signal {
            GameSignal::LevelCompleted => {
                bot.completed += 1;
                info!("Bot cleared {} of {} levels", bot.completed, bot.target_levels);
                if bot.completed >= bot.target_levels {
                    exit.send(AppExit::Success);
                } else {
                    commands.send(GameCommandEvent::NextLevel);
                }
            }
            GameSignal::GameOver => {
                warn!("Bot lost after clearing {} levels", bot.completed);
                exit.send(AppExit::error());
            }
            GameSignal::LevelLoaded | GameSignal::CollectableDestroyed => {}
        }
    }
}

/// Pick one building of the first unfinished goal type per timer tick,
/// as long as that type still fits in the bar
fn pick_needed_buildings(
    time: Res<Time>,
    game: Option<Res<GameResource>>,
    mut bot: ResMut<Bot>,
    mut commands: EventWriter<GameCommandEvent>,
) {
    if !bot.pick_timer.tick(time.delta()).just_finished() {
        return;
    }
    // the plugin logged why it is disabled
    let Some(game) = game else {
        return;
    };
    let game = &game.0;
    if !game.tracker().is_playing() || game.generator().is_running() {
        return;
    }

    let bar = game.bar();
    let Some(goal) = game
        .tracker()
        .goal_progress()
        .into_iter()
        .find(|g| g.remaining as usize > bar.count_of(g.building_type))
    else {
        return;
    };
    if bar.first_empty().is_none() {
        return;
    }

    if let Some(target) = game
        .host()
        .buildings()
        .find(|b| b.building_type == goal.building_type)
    {
        commands.send(GameCommandEvent::Pick(target.position));
    };
}
