use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::*;
use crate::error::{CoreError, CoreResult};
use crate::logging::TracingConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub slot_count: usize,
    pub ray_spacing: f32,
    pub margin: f32,
    pub ray_upper_diff: f32,
    pub required_slack: u32,
    pub settle_delay_secs: f32,
    pub click_cooldown_secs: f32,
    pub seed: u64,
    pub wrap_policy: LevelWrapPolicy,
    pub fill_bias: Option<FillBias>,
    pub timings: AnimationTimings,
    pub logging: TracingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            ray_spacing: DEFAULT_RAY_SPACING,
            margin: AREA_MARGIN,
            ray_upper_diff: RAY_UPPER_DIFF,
            required_slack: REQUIRED_SLACK,
            settle_delay_secs: SETTLE_DELAY_SECS,
            click_cooldown_secs: CLICK_COOLDOWN_SECS,
            seed: DEFAULT_LAYOUT_SEED,
            wrap_policy: LevelWrapPolicy::Wrap,
            fill_bias: None,
            timings: AnimationTimings::default(),
            logging: TracingConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_ron_str(content: &str) -> CoreResult<Self> {
        let config: GameConfig =
            ron::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let config: GameConfig =
            serde_json::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` or `.ron` file
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("ron") => Self::from_ron_str(&content),
            other => Err(CoreError::ConfigParse(format!(
                "unsupported config extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.slot_count < MATCH_SIZE {
            return Err(CoreError::InvalidConfig(format!(
                "slot_count {} cannot hold a match of {}",
                self.slot_count, MATCH_SIZE
            )));
        }
        if self.ray_spacing <= 0.0 {
            return Err(CoreError::InvalidConfig("ray_spacing must be positive".into()));
        }
        if self.margin < 0.0 || self.ray_upper_diff <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "margin must be >= 0 and ray_upper_diff > 0".into(),
            ));
        }
        if self.settle_delay_secs < 0.0 || self.click_cooldown_secs < 0.0 {
            return Err(CoreError::InvalidConfig("delays must not be negative".into()));
        }
        if let Some(bias) = &self.fill_bias {
            if !(0.0..=1.0).contains(&bias.probability) {
                return Err(CoreError::InvalidConfig(format!(
                    "fill bias probability {} outside 0..=1",
                    bias.probability
                )));
            }
        }
        self.timings.validate()
    }
}

/// What the level index does after the last level is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LevelWrapPolicy {
    /// Back to level 0
    #[default]
    Wrap,
    /// Stay on the last level
    Clamp,
}

/// Random-fill weighting toward one archetype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillBias {
    pub archetype: String,
    pub probability: f32,
}

/// Durations of the animations the core waits on (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTimings {
    pub lift: f32,
    pub move_to_slot: f32,
    pub jump: f32,
    pub destroy: f32,
    pub destroy_up_diff: f32,
    pub reject_flash: f32,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            lift: LIFT_ANIMATION_DURATION,
            move_to_slot: MOVE_ANIMATION_DURATION,
            jump: JUMP_ANIMATION_DURATION,
            destroy: DESTROY_ANIMATION_DURATION,
            destroy_up_diff: DESTROY_POSITION_UP_DIFF,
            reject_flash: REJECT_FLASH_DURATION,
        }
    }
}

impl AnimationTimings {
    /// Pick to landing in the slot
    pub fn fly_to_slot(&self) -> f32 {
        self.lift + self.move_to_slot
    }

    fn validate(&self) -> CoreResult<()> {
        let all = [
            self.lift,
            self.move_to_slot,
            self.jump,
            self.destroy,
            self.reject_flash,
        ];
        if all.iter().any(|d| *d < 0.0) {
            return Err(CoreError::InvalidConfig(
                "animation durations must not be negative".into(),
            ));
        }
        Ok(())
    }
}
