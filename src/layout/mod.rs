//! Level Layout Generator
//!
//! Populates a level map in four sequential phases:
//! Idle → AssetsCleared → MapPlaced → RequiredBuildingsPlaced → RandomFillComplete
//!
//! Required buildings are placed first (goal count plus slack), then the rest
//! of the buildable area is filled at random. Each phase runs on its own
//! `update` call, with a settle delay after clearing the old map and after
//! spawning the new one. Placement is irreversible: once a building stands on
//! a grid point, later probes see it through the Road/Building filter.

pub mod grid;

use bevy::math::Vec3;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::{FillBias, GameConfig};
use crate::error::{CoreError, CoreResult};
use crate::footprint::{is_placeable, Footprint, FootprintTable, Rotation};
use crate::level::{AreaBounds, BuildingType, LevelCatalog, MapDefinition};
use crate::logging::LayoutPassTimer;
use crate::probe::{probe_down, PhysicsWorld, Probe};

use grid::GridScan;

/// Identity of a placed building; stays unique across level reloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlacementId(pub u64);

/// A building the generator has put on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: PlacementId,
    pub archetype: String,
    pub building_type: BuildingType,
    pub position: Vec3,
    pub rotation: Rotation,
    pub footprint: Footprint,
}

/// Engine services the generator drives: destroy/instantiate map and buildings
pub trait SceneHost: PhysicsWorld {
    /// Destroy the previous map and everything on it
    fn clear_level(&mut self);

    /// Instantiate a map and return its buildable area bounds
    fn spawn_map(&mut self, map: &MapDefinition) -> AreaBounds;

    fn spawn_building(&mut self, placement: &Placement);

    fn remove_building(&mut self, id: PlacementId) -> Option<Placement>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayoutPhase {
    #[default]
    Idle,
    AssetsCleared,
    MapPlaced,
    RequiredBuildingsPlaced,
    RandomFillComplete,
    /// A required building found no valid point; random fill was skipped
    Exhausted,
}

impl LayoutPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::RandomFillComplete | Self::Exhausted)
    }
}

/// Archetype with its footprint already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArchetype {
    pub name: String,
    pub building_type: BuildingType,
    pub footprint: Footprint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequiredPlacement {
    pub archetype: ResolvedArchetype,
    /// Goal count plus slack
    pub attempts: u32,
}

/// Everything one generation pass needs, resolved from the catalog up front
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub level_index: usize,
    pub map: MapDefinition,
    pub required: Vec<RequiredPlacement>,
    /// Random-fill pool: the level's requirement archetypes, deduplicated
    pub fill: Vec<ResolvedArchetype>,
}

impl LayoutPlan {
    pub fn for_level(
        catalog: &LevelCatalog,
        footprints: &FootprintTable,
        level_index: usize,
        slack: u32,
    ) -> CoreResult<Self> {
        let level = catalog
            .level(level_index)
            .ok_or(CoreError::InvalidLevelIndex {
                index: level_index,
                count: catalog.level_count(),
            })?;
        let map = catalog
            .map(&level.map)
            .ok_or_else(|| CoreError::UnknownMap(level.map.clone()))?
            .clone();

        let mut required = Vec::new();
        let mut fill: Vec<ResolvedArchetype> = Vec::new();
        for req in &level.requirements {
            let archetype = ResolvedArchetype {
                name: req.archetype.clone(),
                building_type: req.building_type,
                footprint: footprints.resolve(&req.archetype),
            };
            if !fill.iter().any(|a| a.name == archetype.name) {
                fill.push(archetype.clone());
            }
            required.push(RequiredPlacement {
                archetype,
                attempts: req.required_count + slack,
            });
        }

        Ok(Self {
            level_index,
            map,
            required,
            fill,
        })
    }
}

/// Scan and timing parameters for the generator
#[derive(Debug, Clone)]
pub struct LayoutSettings {
    pub ray_spacing: f32,
    pub margin: f32,
    pub ray_upper_diff: f32,
    pub settle_delay_secs: f32,
    pub fill_bias: Option<FillBias>,
}

impl LayoutSettings {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            ray_spacing: config.ray_spacing,
            margin: config.margin,
            ray_upper_diff: config.ray_upper_diff,
            settle_delay_secs: config.settle_delay_secs,
            fill_bias: config.fill_bias.clone(),
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

/// What a generation pass produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutReport {
    pub level_index: usize,
    pub placements: Vec<Placement>,
    pub required_placed: BTreeMap<BuildingType, u32>,
    pub random_placed: u32,
    pub exhausted: Option<BuildingType>,
}

/// Reproducible per-level seed: sha3(seed ‖ level index)
pub fn layout_seed(seed: u64, level_index: usize) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update((level_index as u64).to_le_bytes());
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[0..8]);
    u64::from_le_bytes(bytes)
}

pub struct LayoutGenerator {
    settings: LayoutSettings,
    phase: LayoutPhase,
    plan: Option<LayoutPlan>,
    area: Option<AreaBounds>,
    rng: Xoshiro256PlusPlus,
    settle_remaining: f32,
    next_id: u64,
    report: LayoutReport,
}

impl LayoutGenerator {
    pub fn new(settings: LayoutSettings) -> Self {
        Self {
            settings,
            phase: LayoutPhase::Idle,
            plan: None,
            area: None,
            rng: Xoshiro256PlusPlus::seed_from_u64(0),
            settle_remaining: 0.0,
            next_id: 1,
            report: LayoutReport::default(),
        }
    }

    /// Start a new pass; any pass in progress is abandoned
    pub fn begin(&mut self, plan: LayoutPlan, seed: u64) {
        info!(
            "Layout: generating level {} on map {}",
            plan.level_index, plan.map.name
        );
        self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        self.report = LayoutReport {
            level_index: plan.level_index,
            ..Default::default()
        };
        self.plan = Some(plan);
        self.area = None;
        self.phase = LayoutPhase::Idle;
        self.settle_remaining = 0.0;
    }

    pub fn phase(&self) -> LayoutPhase {
        self.phase
    }

    /// True while a pass has been started and has not finished
    pub fn is_running(&self) -> bool {
        self.plan.is_some() && !self.phase.is_finished()
    }

    pub fn report(&self) -> &LayoutReport {
        &self.report
    }

    pub fn area(&self) -> Option<AreaBounds> {
        self.area
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: LayoutSettings) {
        self.settings = settings;
    }

    /// Advance by `dt` seconds; runs at most one phase once settled.
    /// Returns the phase entered, if any.
    pub fn update<H: SceneHost + ?Sized>(&mut self, dt: f32, host: &mut H) -> Option<LayoutPhase> {
        if !self.is_running() {
            return None;
        }
        self.settle_remaining -= dt;
        if self.settle_remaining > 0.0 {
            return None;
        }
        Some(self.step(host))
    }

    /// Run every remaining phase without waiting for settle delays
    pub fn run_to_completion<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> &LayoutReport {
        while self.is_running() {
            self.step(host);
        }
        &self.report
    }

    /// Perform exactly one phase transition
    pub fn step<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> LayoutPhase {
        let Some(plan) = self.plan.take() else {
            return self.phase;
        };

        self.phase = match self.phase {
            LayoutPhase::Idle => {
                host.clear_level();
                info!("Layout: old level assets removed");
                self.settle_remaining = self.settings.settle_delay_secs;
                LayoutPhase::AssetsCleared
            }
            LayoutPhase::AssetsCleared => {
                self.area = Some(host.spawn_map(&plan.map));
                info!("Layout: map {} placed", plan.map.name);
                self.settle_remaining = self.settings.settle_delay_secs;
                LayoutPhase::MapPlaced
            }
            LayoutPhase::MapPlaced => self.place_required(&plan, host),
            LayoutPhase::RequiredBuildingsPlaced => {
                self.random_fill(&plan, host);
                LayoutPhase::RandomFillComplete
            }
            finished => finished,
        };

        self.plan = Some(plan);
        self.phase
    }

    fn scan(&self) -> Option<GridScan> {
        self.area
            .map(|area| GridScan::new(area, self.settings.margin, self.settings.ray_spacing))
    }

    fn place_required<H: SceneHost + ?Sized>(&mut self, plan: &LayoutPlan, host: &mut H) -> LayoutPhase {
        let mut timer = LayoutPassTimer::start("required", plan.level_index);
        let Some(scan) = self.scan() else {
            return LayoutPhase::Exhausted;
        };

        for required in &plan.required {
            for _ in 0..required.attempts {
                if !self.place_first_fit(&scan, &required.archetype, host) {
                    warn!(
                        "Layout: {} ({} of {} placed), skipping random fill",
                        CoreError::PlacementExhausted(required.archetype.building_type),
                        self.report
                            .required_placed
                            .get(&required.archetype.building_type)
                            .copied()
                            .unwrap_or(0),
                        required.attempts
                    );
                    self.report.exhausted = Some(required.archetype.building_type);
                    timer.set_placed(self.report.required_placed.values().sum());
                    return LayoutPhase::Exhausted;
                }
                *self
                    .report
                    .required_placed
                    .entry(required.archetype.building_type)
                    .or_insert(0) += 1;
            }
        }

        timer.set_placed(self.report.required_placed.values().sum());
        info!("Layout: all required buildings placed");
        LayoutPhase::RequiredBuildingsPlaced
    }

    /// Scan from the first grid point; place at the first point that fits
    fn place_first_fit<H: SceneHost + ?Sized>(
        &mut self,
        scan: &GridScan,
        archetype: &ResolvedArchetype,
        host: &mut H,
    ) -> bool {
        for (x, z) in scan.points() {
            let Some(point) = self.candidate_point(scan, x, z, host) else {
                continue;
            };
            let rotation = Rotation::random(&mut self.rng);
            if is_placeable(host, point, archetype.footprint, rotation, self.settings.ray_upper_diff) {
                self.spawn(archetype, point, rotation, host);
                return true;
            }
        }
        false
    }

    fn random_fill<H: SceneHost + ?Sized>(&mut self, plan: &LayoutPlan, host: &mut H) {
        let mut timer = LayoutPassTimer::start("random_fill", plan.level_index);
        let Some(scan) = self.scan() else {
            return;
        };
        if plan.fill.is_empty() {
            return;
        }

        for (x, z) in scan.points() {
            let Some(point) = self.candidate_point(&scan, x, z, host) else {
                continue;
            };
            let archetype = self.pick_fill_archetype(&plan.fill);
            let rotation = Rotation::random(&mut self.rng);
            if is_placeable(host, point, archetype.footprint, rotation, self.settings.ray_upper_diff) {
                self.spawn(&archetype, point, rotation, host);
                self.report.random_placed += 1;
            }
        }
        timer.set_placed(self.report.random_placed);
        info!(
            "Layout: random fill placed {} buildings",
            self.report.random_placed
        );
    }

    /// Ground point under a grid point, unless it is empty, road or building
    fn candidate_point<H: SceneHost + ?Sized>(&self, scan: &GridScan, x: f32, z: f32, host: &H) -> Option<Vec3> {
        let origin = Vec3::new(x, scan.floor_y(), z);
        match probe_down(host, origin, self.settings.ray_upper_diff) {
            Probe::Hit {
                classification,
                point,
                ..
            } if !classification.is_occupied() => Some(point),
            _ => None,
        }
    }

    fn pick_fill_archetype(&mut self, pool: &[ResolvedArchetype]) -> ResolvedArchetype {
        if let Some(FillBias {
            archetype,
            probability,
        }) = &self.settings.fill_bias
        {
            if let Some(biased) = pool.iter().find(|a| &a.name == archetype) {
                if self.rng.gen::<f32>() < *probability {
                    return biased.clone();
                }
            }
        }
        pool[self.rng.gen_range(0..pool.len())].clone()
    }

    fn spawn<H: SceneHost + ?Sized>(
        &mut self,
        archetype: &ResolvedArchetype,
        position: Vec3,
        rotation: Rotation,
        host: &mut H,
    ) {
        let placement = Placement {
            id: PlacementId(self.next_id),
            archetype: archetype.name.clone(),
            building_type: archetype.building_type,
            position,
            rotation,
            footprint: archetype.footprint,
        };
        self.next_id += 1;
        debug!(
            "Layout: {} at ({:.2}, {:.2}) rotated {}",
            placement.archetype,
            position.x,
            position.z,
            rotation.degrees()
        );
        host.spawn_building(&placement);
        self.report.placements.push(placement);
    }
}
