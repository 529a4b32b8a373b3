//! Composition root
//!
//! [`Game`] owns every core component and wires them together explicitly:
//! - commands: pick, next level, restart, load level
//! - `tick(dt)`: due continuations, layout generator, level timer, then
//!   match-or-game-over and a compaction sweep while playing
//! - visual cues for the front-end, signals for external collaborators
//!
//! Component errors are logged here and degrade into no-ops.

mod cues;

pub use cues::VisualCue;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::GameConfig;
use crate::error::{CoreError, CoreResult};
use crate::footprint::FootprintTable;
use crate::gamebar::{Collectable, MatchResolution, SlotBar};
use crate::layout::{layout_seed, LayoutGenerator, LayoutPlan, LayoutSettings, PlacementId, SceneHost};
use crate::level::LevelCatalog;
use crate::probe::{probe_down, Classification, Probe};
use crate::progress::{LevelProgressTracker, ProgressState};
use crate::scheduler::Scheduler;
use crate::signals::{GameSignal, SignalBus, Subscription};

use cues::TimedAction;

/// Why a pick did not collect anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickRejection {
    NotPlaying,
    Cooldown,
    NothingHit,
    /// Building hit but the bar has no empty slot
    BarFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickOutcome {
    Collected { id: PlacementId, slot: usize },
    Rejected(PickRejection),
}

pub struct Game<H: SceneHost> {
    config: GameConfig,
    catalog: LevelCatalog,
    footprints: FootprintTable,
    host: H,
    generator: LayoutGenerator,
    bar: SlotBar,
    tracker: LevelProgressTracker,
    scheduler: Scheduler<TimedAction>,
    signals: SignalBus<GameSignal>,
    cues: Vec<VisualCue>,
    raised: usize,
    elapsed: f64,
    last_pick: Option<f64>,
}

impl<H: SceneHost> Game<H> {
    pub fn new(config: GameConfig, catalog: LevelCatalog, host: H) -> CoreResult<Self> {
        config.validate()?;
        catalog.validate()?;
        let footprints = FootprintTable::build(&catalog);
        Ok(Self {
            generator: LayoutGenerator::new(LayoutSettings::from_config(&config)),
            bar: SlotBar::new(config.slot_count).with_merge_lift(config.timings.destroy_up_diff),
            tracker: LevelProgressTracker::new(config.wrap_policy),
            scheduler: Scheduler::new(),
            signals: SignalBus::new(),
            cues: Vec::new(),
            raised: 0,
            elapsed: 0.0,
            last_pick: None,
            config,
            catalog,
            footprints,
            host,
        })
    }

    // =====================================================
    // Accessors
    // =====================================================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn bar(&self) -> &SlotBar {
        &self.bar
    }

    pub fn tracker(&self) -> &LevelProgressTracker {
        &self.tracker
    }

    pub fn generator(&self) -> &LayoutGenerator {
        &self.generator
    }

    pub fn state(&self) -> ProgressState {
        self.tracker.state()
    }

    /// Simulation time since creation (seconds)
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    pub fn subscribe(&mut self) -> Subscription<GameSignal> {
        self.signals.subscribe()
    }

    pub fn signals_mut(&mut self) -> &mut SignalBus<GameSignal> {
        &mut self.signals
    }

    /// Cues raised since the last drain, oldest first
    pub fn drain_cues(&mut self) -> Vec<VisualCue> {
        std::mem::take(&mut self.cues)
    }

    // =====================================================
    // Commands
    // =====================================================

    pub fn start(&mut self) -> CoreResult<()> {
        self.load_level(0)
    }

    /// Load a level. An invalid index is logged; nothing changes and no
    /// signal is emitted.
    pub fn load_level(&mut self, index: usize) -> CoreResult<()> {
        if self.catalog.level(index).is_none() {
            let err = CoreError::InvalidLevelIndex {
                index,
                count: self.catalog.level_count(),
            };
            error!("{}", err);
            return Err(err);
        }
        let plan = LayoutPlan::for_level(
            &self.catalog,
            &self.footprints,
            index,
            self.config.required_slack,
        )
        .inspect_err(|e| error!("Cannot plan level {}: {}", index, e))?;

        let dropped = self.scheduler.cancel_all();
        if dropped > 0 {
            debug!("Cancelled {} pending continuations", dropped);
        }
        self.bar.reset();
        self.cues.clear();
        self.last_pick = None;
        self.raised = 0;

        self.generator
            .begin(plan, layout_seed(self.config.seed, index));
        self.tracker.load_level(&self.catalog, index, &mut self.signals)
    }

    /// Load the level after the current one; after a completion the index
    /// has already advanced
    pub fn next_level(&mut self) -> CoreResult<()> {
        let index = match self.tracker.state() {
            ProgressState::LevelCompleted => self.tracker.level_index(),
            _ => self.tracker.next_index(),
        };
        self.load_level(index)
    }

    pub fn restart_level(&mut self) -> CoreResult<()> {
        self.load_level(self.tracker.level_index())
    }

    /// Pick whatever building stands under `point`
    pub fn pick_collectable(&mut self, point: Vec3) -> PickOutcome {
        if !self.tracker.is_playing() {
            return PickOutcome::Rejected(PickRejection::NotPlaying);
        }
        if let Some(last) = self.last_pick {
            if self.elapsed <= last + f64::from(self.config.click_cooldown_secs) {
                return PickOutcome::Rejected(PickRejection::Cooldown);
            }
        }

        let id = match probe_down(&self.host, point, self.config.ray_upper_diff) {
            Probe::Hit {
                classification: Classification::Building,
                placement: Some(id),
                ..
            } => id,
            _ => return PickOutcome::Rejected(PickRejection::NothingHit),
        };
        self.last_pick = Some(self.elapsed);

        let timings = self.config.timings;
        if self.bar.first_empty().is_none() {
            debug!("{}, rejecting pick of {:?}", CoreError::NoEmptySlot, id);
            self.cues.push(VisualCue::RejectFlash { id });
            self.scheduler
                .schedule(timings.reject_flash, TimedAction::RejectFlashEnd { id });
            return PickOutcome::Rejected(PickRejection::BarFull);
        }

        let Some(placement) = self.host.remove_building(id) else {
            return PickOutcome::Rejected(PickRejection::NothingHit);
        };
        let from = placement.position;
        let collectable = Collectable {
            id,
            building_type: placement.building_type,
            position: from,
        };
        let Some(slot) = self.bar.try_insert(collectable) else {
            return PickOutcome::Rejected(PickRejection::BarFull);
        };

        let to = self.bar.slot(slot).map(|s| s.anchor()).unwrap_or(from);
        self.cues.push(VisualCue::CollectableFlyToSlot {
            id,
            slot,
            from,
            to,
            duration: timings.fly_to_slot(),
        });
        self.scheduler
            .schedule(timings.fly_to_slot(), TimedAction::SlotSettled { slot });
        PickOutcome::Collected { id, slot }
    }

    /// Swap in a new catalog; takes effect on the next level load
    pub fn replace_catalog(&mut self, catalog: LevelCatalog) -> CoreResult<()> {
        catalog.validate()?;
        let footprints = FootprintTable::build(&catalog);
        info!(
            "Catalog replaced ({} levels, {} footprints)",
            catalog.level_count(),
            footprints.len()
        );
        self.catalog = catalog;
        self.footprints = footprints;
        Ok(())
    }

    // =====================================================
    // Simulation
    // =====================================================

    pub fn tick(&mut self, dt: f32) {
        self.elapsed += f64::from(dt);

        for action in self.scheduler.advance(dt) {
            self.apply(action);
        }

        if self.generator.is_running() {
            self.generator.update(dt, &mut self.host);
            self.raise_new_buildings();
        }

        self.tracker.tick_timer(dt, &mut self.signals);

        if self.tracker.is_playing() {
            match self.bar.detect_and_resolve_match() {
                Some(resolution) => self.start_merge(resolution),
                None => {
                    if self.bar.is_full() {
                        self.tracker.game_over(&mut self.signals);
                    }
                }
            }
            self.compact();
        }
    }

    /// Finish layout generation at once, ignoring settle delays
    pub fn finish_layout(&mut self) {
        self.generator.run_to_completion(&mut self.host);
        self.raise_new_buildings();
    }

    fn raise_new_buildings(&mut self) {
        let placements = &self.generator.report().placements;
        for placement in placements.iter().skip(self.raised) {
            self.cues.push(VisualCue::BuildingRaised {
                id: placement.id,
                position: placement.position,
            });
        }
        self.raised = placements.len();
    }

    fn start_merge(&mut self, resolution: MatchResolution) {
        let duration = self.config.timings.destroy;
        let MatchResolution {
            building_type,
            items,
            target,
            ..
        } = resolution;

        debug!("Merging three {:?}", building_type);
        self.cues.push(VisualCue::MergeStarted {
            building_type,
            ids: items.iter().map(|c| c.id).collect(),
            target,
            duration,
        });
        for piece in items {
            self.scheduler
                .schedule(duration, TimedAction::MergePieceArrived { piece });
        }
        self.scheduler
            .schedule(duration, TimedAction::DestroyFx { position: target });
    }

    fn compact(&mut self) {
        let duration = self.config.timings.jump;
        for hop in self.bar.compact_left() {
            let to = self.bar.slot(hop.to).map(|s| s.anchor()).unwrap_or(hop.item.position);
            self.cues.push(VisualCue::CollectableJump {
                id: hop.item.id,
                from_slot: hop.from,
                to_slot: hop.to,
                to,
                duration,
            });
            self.scheduler
                .schedule(duration, TimedAction::SlotSettled { slot: hop.to });
        }
    }

    fn apply(&mut self, action: TimedAction) {
        match action {
            TimedAction::SlotSettled { slot } => {
                self.bar.finish_animation(slot);
            }
            TimedAction::MergePieceArrived { piece } => {
                self.tracker.add_building(piece.building_type);
                self.signals.emit(GameSignal::CollectableDestroyed);
                self.tracker.check_completion(&mut self.signals);
            }
            TimedAction::DestroyFx { position } => {
                self.cues.push(VisualCue::DestroyFx { position });
            }
            TimedAction::RejectFlashEnd { id } => {
                self.cues.push(VisualCue::RejectFlashEnd { id });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::BuildingType;
    use crate::scene::ColliderScene;

    fn started(config: GameConfig, level: usize) -> Game<ColliderScene> {
        let mut game = Game::new(config, LevelCatalog::sample(), ColliderScene::new()).unwrap();
        game.load_level(level).unwrap();
        game.finish_layout();
        game
    }

    fn spots(game: &Game<ColliderScene>, building_type: BuildingType) -> Vec<Vec3> {
        game.host()
            .buildings()
            .filter(|b| b.building_type == building_type)
            .map(|b| b.position)
            .collect()
    }

    #[test]
    fn test_finish_layout_raises_every_building() {
        let mut game = started(GameConfig::default(), 0);
        let raised = game
            .drain_cues()
            .into_iter()
            .filter(|c| matches!(c, VisualCue::BuildingRaised { .. }))
            .count();
        assert!(raised > 0);
        assert_eq!(raised, game.host().building_count());
    }

    #[test]
    fn test_pick_moves_building_into_bar() {
        let mut game = started(GameConfig::default(), 0);
        let house = spots(&game, BuildingType::House)[0];
        let before = game.host().building_count();
        game.drain_cues();

        let outcome = game.pick_collectable(house);
        assert!(matches!(outcome, PickOutcome::Collected { slot: 0, .. }));
        assert_eq!(game.host().building_count(), before - 1);
        assert!(game.bar().slot(0).unwrap().is_animating());
        assert!(matches!(
            game.drain_cues().as_slice(),
            [VisualCue::CollectableFlyToSlot { slot: 0, .. }]
        ));

        // lift + move = 1.2 s
        game.tick(1.0);
        assert!(game.bar().slot(0).unwrap().is_animating());
        game.tick(0.25);
        assert!(!game.bar().slot(0).unwrap().is_animating());
    }

    #[test]
    fn test_pick_on_empty_ground_ignored() {
        let mut game = started(GameConfig::default(), 0);
        // the road strip along z = 0 never carries buildings
        let outcome = game.pick_collectable(Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(outcome, PickOutcome::Rejected(PickRejection::NothingHit));
        let outcome = game.pick_collectable(Vec3::new(500.0, 0.0, 0.0));
        assert_eq!(outcome, PickOutcome::Rejected(PickRejection::NothingHit));
    }

    #[test]
    fn test_click_cooldown() {
        let mut game = started(GameConfig::default(), 0);
        let houses = spots(&game, BuildingType::House);
        assert!(matches!(game.pick_collectable(houses[0]), PickOutcome::Collected { .. }));
        assert_eq!(
            game.pick_collectable(houses[1]),
            PickOutcome::Rejected(PickRejection::Cooldown)
        );
        game.tick(0.2);
        assert!(matches!(game.pick_collectable(houses[1]), PickOutcome::Collected { slot: 1, .. }));
    }

    #[test]
    fn test_full_bar_flashes_and_keeps_building() {
        let config = GameConfig {
            slot_count: 3,
            ..Default::default()
        };
        let mut game = started(config, 1);
        let houses = spots(&game, BuildingType::House);
        let cafes = spots(&game, BuildingType::Cafe);
        for point in [houses[0], cafes[0], houses[1]] {
            assert!(matches!(game.pick_collectable(point), PickOutcome::Collected { .. }));
            game.tick(0.2);
        }
        game.drain_cues();

        let before = game.host().building_count();
        assert_eq!(
            game.pick_collectable(cafes[1]),
            PickOutcome::Rejected(PickRejection::BarFull)
        );
        assert_eq!(game.host().building_count(), before);
        assert!(matches!(game.drain_cues().as_slice(), [VisualCue::RejectFlash { .. }]));

        game.tick(0.06);
        assert!(game
            .drain_cues()
            .iter()
            .any(|c| matches!(c, VisualCue::RejectFlashEnd { .. })));
    }

    #[test]
    fn test_not_playing_rejects_picks() {
        let mut game = Game::new(GameConfig::default(), LevelCatalog::sample(), ColliderScene::new()).unwrap();
        assert_eq!(
            game.pick_collectable(Vec3::ZERO),
            PickOutcome::Rejected(PickRejection::NotPlaying)
        );
    }

    #[test]
    fn test_invalid_load_changes_nothing() {
        let mut game = started(GameConfig::default(), 1);
        let sub = game.subscribe();
        let buildings = game.host().building_count();

        assert!(game.load_level(10).is_err());
        assert_eq!(game.tracker().level_index(), 1);
        assert_eq!(game.host().building_count(), buildings);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_reload_cancels_pending_continuations() {
        let mut game = started(GameConfig::default(), 0);
        let house = spots(&game, BuildingType::House)[0];
        game.pick_collectable(house);
        assert_eq!(game.pending_timers(), 1);

        game.restart_level().unwrap();
        assert_eq!(game.pending_timers(), 0);
        assert_eq!(game.bar().occupied_count(), 0);
        assert_eq!(game.state(), ProgressState::LevelPlaying);
    }

    #[test]
    fn test_layout_advances_over_ticks() {
        let mut game = Game::new(GameConfig::default(), LevelCatalog::sample(), ColliderScene::new()).unwrap();
        game.start().unwrap();
        assert!(game.generator().is_running());
        for _ in 0..10 {
            game.tick(0.05);
        }
        assert!(!game.generator().is_running());
        assert!(game.host().building_count() >= 5);
    }

    #[test]
    fn test_replace_catalog_applies_on_next_load() {
        let mut game = started(GameConfig::default(), 0);
        let mut catalog = LevelCatalog::sample();
        catalog.levels.truncate(1);
        game.replace_catalog(catalog).unwrap();
        assert_eq!(game.catalog().level_count(), 1);
        assert!(game.load_level(2).is_err());

        let mut broken = LevelCatalog::sample();
        broken.levels.clear();
        assert!(game.replace_catalog(broken).is_err());
        assert_eq!(game.catalog().level_count(), 1);
    }

    #[test]
    fn test_compaction_jumps_every_gap_in_one_tick() {
        let mut game = started(GameConfig::default(), 1);
        let houses = spots(&game, BuildingType::House);
        let cafes = spots(&game, BuildingType::Cafe);
        // H C H C H: the house triple leaves gaps at 0, 2 and 4
        for point in [houses[0], cafes[0], houses[1], cafes[1], houses[2]] {
            assert!(matches!(game.pick_collectable(point), PickOutcome::Collected { .. }));
            game.tick(0.2);
        }
        let mut merged = false;
        for _ in 0..40 {
            game.tick(0.05);
            if game
                .drain_cues()
                .iter()
                .any(|c| matches!(c, VisualCue::MergeStarted { .. }))
            {
                merged = true;
                break;
            }
        }
        assert!(merged);

        // the merge and the sweep ran in the same tick
        assert_eq!(game.bar().occupied_count(), 2);
        assert!(game.bar().slot(0).unwrap().is_occupied());
        assert!(game.bar().slot(1).unwrap().is_occupied());
        assert!(game.bar().slot(0).unwrap().is_animating());
        assert!(game.bar().slot(1).unwrap().is_animating());
        assert_eq!(game.bar().count_of(BuildingType::Cafe), 2);
    }
}
