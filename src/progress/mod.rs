//! Level Progress Tracker
//!
//! LevelLoading → LevelPlaying → {LevelCompleted | GameOver}
//!
//! Owns the required/current building counts of the active level, the
//! level index and the level timer. Counting and completion are separate
//! steps: `add_building` only counts, `check_completion` is driven by the
//! collectable-destroyed hop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::config::LevelWrapPolicy;
use crate::error::{CoreError, CoreResult};
use crate::level::{BuildingType, LevelCatalog};
use crate::signals::{GameSignal, SignalBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProgressState {
    #[default]
    LevelLoading,
    LevelPlaying,
    LevelCompleted,
    GameOver,
}

/// One row of the goal UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub building_type: BuildingType,
    pub current: u32,
    pub required: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Default)]
pub struct LevelProgressTracker {
    state: ProgressState,
    level_index: usize,
    level_count: usize,
    wrap_policy: LevelWrapPolicy,
    required: BTreeMap<BuildingType, u32>,
    current: BTreeMap<BuildingType, u32>,
    time_remaining: f32,
}

impl LevelProgressTracker {
    pub fn new(wrap_policy: LevelWrapPolicy) -> Self {
        Self {
            wrap_policy,
            ..Default::default()
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ProgressState::LevelPlaying
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn required(&self) -> &BTreeMap<BuildingType, u32> {
        &self.required
    }

    pub fn current(&self) -> &BTreeMap<BuildingType, u32> {
        &self.current
    }

    pub fn current_count(&self, building_type: BuildingType) -> u32 {
        self.current.get(&building_type).copied().unwrap_or(0)
    }

    pub fn remaining_time(&self) -> f32 {
        self.time_remaining
    }

    pub fn set_wrap_policy(&mut self, wrap_policy: LevelWrapPolicy) {
        self.wrap_policy = wrap_policy;
    }

    /// Reset counts from the level definition and start playing.
    /// An out-of-range index is logged and changes nothing.
    pub fn load_level(
        &mut self,
        catalog: &LevelCatalog,
        index: usize,
        signals: &mut SignalBus<GameSignal>,
    ) -> CoreResult<()> {
        let Some(level) = catalog.level(index) else {
            let err = CoreError::InvalidLevelIndex {
                index,
                count: catalog.level_count(),
            };
            error!("{}", err);
            return Err(err);
        };

        self.state = ProgressState::LevelLoading;
        self.level_index = index;
        self.level_count = catalog.level_count();
        self.required = level.required_counts();
        self.current = self.required.keys().map(|t| (*t, 0)).collect();
        self.time_remaining = level.time_limit_secs;

        for (building_type, count) in &self.required {
            info!(
                "Level {} requires {} {:?}",
                level.level_number, count, building_type
            );
        }
        info!("Loaded level {}", level.level_number);

        self.state = ProgressState::LevelPlaying;
        signals.emit(GameSignal::LevelLoaded);
        Ok(())
    }

    /// Count one building; untracked types are ignored. Returns whether it counted.
    pub fn add_building(&mut self, building_type: BuildingType) -> bool {
        match self.current.get_mut(&building_type) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// Every required type has reached its count
    pub fn is_complete(&self) -> bool {
        self.required
            .iter()
            .all(|(t, required)| self.current_count(*t) >= *required)
    }

    /// On completion: advance the index, emit level-completed, stop playing
    pub fn check_completion(&mut self, signals: &mut SignalBus<GameSignal>) -> bool {
        if !self.is_playing() || !self.is_complete() {
            return false;
        }

        info!("Level {} completed", self.level_index);
        self.level_index = self.next_index();
        self.state = ProgressState::LevelCompleted;
        signals.emit(GameSignal::LevelCompleted);
        true
    }

    /// Index after the current one under the wrap policy
    pub fn next_index(&self) -> usize {
        let next = self.level_index + 1;
        if next < self.level_count {
            return next;
        }
        match self.wrap_policy {
            LevelWrapPolicy::Wrap => {
                info!("All levels completed, wrapping to level 0");
                0
            }
            LevelWrapPolicy::Clamp => {
                warn!("All levels completed, staying on level {}", self.level_index);
                self.level_index
            }
        }
    }

    /// Emit game-over and stop playing; counts are kept until a reload
    pub fn game_over(&mut self, signals: &mut SignalBus<GameSignal>) -> bool {
        if !self.is_playing() {
            return false;
        }
        info!("Game over on level {}", self.level_index);
        self.state = ProgressState::GameOver;
        signals.emit(GameSignal::GameOver);
        true
    }

    /// Count the level timer down; running out ends the game
    pub fn tick_timer(&mut self, dt: f32, signals: &mut SignalBus<GameSignal>) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.time_remaining -= dt;
        if self.time_remaining <= 0.0 {
            self.time_remaining = 0.0;
            return self.game_over(signals);
        }
        false
    }

    pub fn goal_progress(&self) -> Vec<GoalProgress> {
        self.required
            .iter()
            .map(|(t, required)| {
                let current = self.current_count(*t);
                GoalProgress {
                    building_type: *t,
                    current,
                    required: *required,
                    remaining: required.saturating_sub(current),
                }
            })
            .collect()
    }
}
