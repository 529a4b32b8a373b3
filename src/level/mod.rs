//! Level data: building types, archetypes, maps and level definitions.
//!
//! Level definitions are authored offline (RON) and loaded read-only at
//! level start. A catalog bundles every archetype, map and level so that
//! references between them can be validated once at load time.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::{BUILDABLE_TAG, ROAD_TAG};
use crate::error::{CoreError, CoreResult};

/// Collectible/building category. Join key between collected items and goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingType {
    House,
    Shop,
    Cafe,
    Bakery,
    School,
    Hospital,
    Factory,
    Tower,
}

impl BuildingType {
    pub fn all() -> &'static [BuildingType] {
        &[
            BuildingType::House,
            BuildingType::Shop,
            BuildingType::Cafe,
            BuildingType::Bakery,
            BuildingType::School,
            BuildingType::Hospital,
            BuildingType::Factory,
            BuildingType::Tower,
        ]
    }
}

/// A building template: what it counts as and how big its collider is
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeDefinition {
    pub name: String,
    pub building_type: BuildingType,
    /// Collider bounds size (x = width, y = height, z = depth)
    #[serde(default)]
    pub collider_size: [f32; 3],
}

/// Axis-aligned bounds of a map's buildable area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl AreaBounds {
    pub fn min(&self) -> Vec3 {
        Vec3::from_array(self.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::from_array(self.max)
    }
}

/// One tagged collider of a map (road strip, buildable lot, water, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainPiece {
    pub tag: String,
    pub center: [f32; 3],
    pub size: [f32; 3],
    #[serde(default)]
    pub yaw_degrees: f32,
}

/// A level map: its buildable area and terrain colliders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDefinition {
    pub name: String,
    pub area: AreaBounds,
    pub terrain: Vec<TerrainPiece>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingRequirement {
    pub building_type: BuildingType,
    pub required_count: u32,
    pub archetype: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub level_number: u32,
    pub time_limit_secs: f32,
    pub map: String,
    pub requirements: Vec<BuildingRequirement>,
}

impl LevelDefinition {
    /// Required count per building type (duplicate entries add up)
    pub fn required_counts(&self) -> BTreeMap<BuildingType, u32> {
        let mut counts = BTreeMap::new();
        for req in &self.requirements {
            *counts.entry(req.building_type).or_insert(0) += req.required_count;
        }
        counts
    }
}

/// Every archetype, map and level of the game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelCatalog {
    pub archetypes: Vec<ArchetypeDefinition>,
    pub maps: Vec<MapDefinition>,
    pub levels: Vec<LevelDefinition>,
}

impl LevelCatalog {
    pub fn from_ron_str(content: &str) -> CoreResult<Self> {
        let catalog: LevelCatalog =
            ron::from_str(content).map_err(|e| CoreError::CatalogParse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&content)
    }

    pub fn to_ron_string(&self) -> CoreResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CoreError::CatalogParse(e.to_string()))
    }

    /// Check every cross reference between levels, maps and archetypes
    pub fn validate(&self) -> CoreResult<()> {
        if self.levels.is_empty() {
            return Err(CoreError::CatalogParse("catalog has no levels".into()));
        }
        for level in &self.levels {
            if self.map(&level.map).is_none() {
                return Err(CoreError::UnknownMap(level.map.clone()));
            }
            if level.time_limit_secs <= 0.0 {
                return Err(CoreError::CatalogParse(format!(
                    "level {} has a non-positive time limit",
                    level.level_number
                )));
            }
            for req in &level.requirements {
                let archetype = self
                    .archetype(&req.archetype)
                    .ok_or_else(|| CoreError::UnknownArchetype(req.archetype.clone()))?;
                if archetype.building_type != req.building_type {
                    return Err(CoreError::CatalogParse(format!(
                        "archetype {} is a {:?}, level {} expects {:?}",
                        archetype.name, archetype.building_type, level.level_number, req.building_type
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn level(&self, index: usize) -> Option<&LevelDefinition> {
        self.levels.get(index)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn map(&self, name: &str) -> Option<&MapDefinition> {
        self.maps.iter().find(|m| m.name == name)
    }

    pub fn archetype(&self, name: &str) -> Option<&ArchetypeDefinition> {
        self.archetypes.iter().find(|a| a.name == name)
    }

    /// Small three-level catalog used by the demo binary and tests
    pub fn sample() -> Self {
        let archetype = |name: &str, building_type, size: [f32; 3]| ArchetypeDefinition {
            name: name.to_string(),
            building_type,
            collider_size: size,
        };
        let requirement = |building_type, required_count, archetype: &str| BuildingRequirement {
            building_type,
            required_count,
            archetype: archetype.to_string(),
            icon: format!("icons/{}.png", archetype),
        };

        Self {
            archetypes: vec![
                archetype("house_small", BuildingType::House, [2.0, 2.0, 2.0]),
                archetype("shop_corner", BuildingType::Shop, [2.0, 1.5, 3.0]),
                archetype("cafe_round", BuildingType::Cafe, [1.5, 1.5, 1.5]),
                archetype("bakery_brick", BuildingType::Bakery, [2.0, 2.5, 2.0]),
            ],
            maps: vec![sample_map("riverside", 24.0), sample_map("old_town", 30.0)],
            levels: vec![
                LevelDefinition {
                    level_number: 0,
                    time_limit_secs: 120.0,
                    map: "riverside".into(),
                    requirements: vec![requirement(BuildingType::House, 3, "house_small")],
                },
                LevelDefinition {
                    level_number: 1,
                    time_limit_secs: 150.0,
                    map: "riverside".into(),
                    requirements: vec![
                        requirement(BuildingType::House, 3, "house_small"),
                        requirement(BuildingType::Cafe, 3, "cafe_round"),
                    ],
                },
                LevelDefinition {
                    level_number: 2,
                    time_limit_secs: 180.0,
                    map: "old_town".into(),
                    requirements: vec![
                        requirement(BuildingType::Shop, 3, "shop_corner"),
                        requirement(BuildingType::Bakery, 3, "bakery_brick"),
                        requirement(BuildingType::House, 6, "house_small"),
                    ],
                },
            ],
        }
    }
}

/// Square map of side `extent` with one ground lot split by a road along X
fn sample_map(name: &str, extent: f32) -> MapDefinition {
    let half = extent / 2.0;
    MapDefinition {
        name: name.to_string(),
        area: AreaBounds {
            min: [-half, 0.0, -half],
            max: [half, 0.0, half],
        },
        terrain: vec![
            TerrainPiece {
                tag: BUILDABLE_TAG.into(),
                center: [0.0, -0.5, 0.0],
                size: [extent, 1.0, extent],
                yaw_degrees: 0.0,
            },
            TerrainPiece {
                tag: ROAD_TAG.into(),
                center: [0.0, 0.05, 0.0],
                size: [extent, 0.1, 2.0],
                yaw_degrees: 0.0,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_catalog_is_valid() {
        let catalog = LevelCatalog::sample();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.level_count(), 3);
        assert!(catalog.map("old_town").is_some());
    }

    #[test]
    fn test_required_counts_merge_duplicates() {
        let mut level = LevelCatalog::sample().levels[1].clone();
        level.requirements.push(BuildingRequirement {
            building_type: BuildingType::House,
            required_count: 2,
            archetype: "house_small".into(),
            icon: String::new(),
        });
        let counts = level.required_counts();
        assert_eq!(counts[&BuildingType::House], 5);
        assert_eq!(counts[&BuildingType::Cafe], 3);
    }

    #[test]
    fn test_validate_unknown_map() {
        let mut catalog = LevelCatalog::sample();
        catalog.levels[0].map = "atlantis".into();
        assert!(matches!(catalog.validate(), Err(CoreError::UnknownMap(m)) if m == "atlantis"));
    }

    #[test]
    fn test_validate_archetype_type_mismatch() {
        let mut catalog = LevelCatalog::sample();
        catalog.levels[0].requirements[0].archetype = "cafe_round".into();
        assert!(matches!(catalog.validate(), Err(CoreError::CatalogParse(_))));
    }

    #[test]
    fn test_validate_empty_catalog() {
        let mut catalog = LevelCatalog::sample();
        catalog.levels.clear();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_ron_roundtrip() {
        let catalog = LevelCatalog::sample();
        let ron = catalog.to_ron_string().unwrap();
        let restored = LevelCatalog::from_ron_str(&ron).unwrap();
        assert_eq!(restored.levels.len(), catalog.levels.len());
        assert_eq!(restored.archetypes[1].collider_size, [2.0, 1.5, 3.0]);
    }

    #[test]
    fn test_shipped_levels_file_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/levels.ron");
        let catalog = LevelCatalog::load(path).unwrap();
        assert_eq!(catalog.level_count(), 3);
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let result = LevelCatalog::from_ron_str("(archetypes: [");
        assert!(matches!(result, Err(CoreError::CatalogParse(_))));
    }
}
