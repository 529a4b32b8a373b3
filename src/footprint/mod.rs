//! Building Footprint Resolver
//!
//! Footprints are read once per catalog into a [`FootprintTable`] instead of
//! being measured from a throwaway instance per query. [`is_placeable`]
//! validates a footprint + rotation at a point against terrain tags and
//! existing buildings.

use bevy::math::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;

use crate::error::{CoreError, CoreResult};
use crate::level::LevelCatalog;
use crate::probe::{probe_down, Classification, PhysicsWorld};

/// Placement envelope of a building (x = width, y = height, z = depth)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub size: Vec3,
}

impl Footprint {
    pub const ZERO: Footprint = Footprint { size: Vec3::ZERO };

    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            size: Vec3::new(width, height, depth),
        }
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    pub fn depth(&self) -> f32 {
        self.size.z
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size / 2.0
    }

    pub fn is_zero(&self) -> bool {
        self.size.cmple(Vec3::ZERO).any()
    }

    /// Ground corners of the footprint centred on `point`, rotated about Y
    pub fn corners(&self, point: Vec3, rotation: Rotation) -> [Vec3; 4] {
        let hx = self.width() / 2.0;
        let hz = self.depth() / 2.0;
        let rot = rotation.quat();
        [
            point + rot * Vec3::new(hx, 0.0, hz),
            point + rot * Vec3::new(-hx, 0.0, hz),
            point + rot * Vec3::new(hx, 0.0, -hz),
            point + rot * Vec3::new(-hx, 0.0, -hz),
        ]
    }
}

/// Cardinal yaw rotations a building may be placed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn all() -> &'static [Rotation] {
        &[
            Rotation::Deg0,
            Rotation::Deg90,
            Rotation::Deg180,
            Rotation::Deg270,
        ]
    }

    pub fn degrees(&self) -> f32 {
        match self {
            Rotation::Deg0 => 0.0,
            Rotation::Deg90 => 90.0,
            Rotation::Deg180 => 180.0,
            Rotation::Deg270 => 270.0,
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_rotation_y(self.degrees().to_radians())
    }

    /// Uniform pick among the four rotations
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::all()[rng.gen_range(0..4)]
    }
}

/// Transient: a point, a footprint and a rotation waiting for validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementCandidate {
    pub position: Vec3,
    pub footprint: Footprint,
    pub rotation: Rotation,
}

impl PlacementCandidate {
    pub fn is_placeable<W: PhysicsWorld + ?Sized>(&self, world: &W, ray_height: f32) -> bool {
        is_placeable(world, self.position, self.footprint, self.rotation, ray_height)
    }
}

/// Archetype name → footprint, built once per catalog
#[derive(Debug, Clone, Default)]
pub struct FootprintTable {
    footprints: HashMap<String, Footprint>,
}

impl FootprintTable {
    pub fn build(catalog: &LevelCatalog) -> Self {
        let mut footprints = HashMap::new();
        for archetype in &catalog.archetypes {
            let [w, h, d] = archetype.collider_size;
            let footprint = Footprint::new(w, h, d);
            if footprint.is_zero() {
                error!(
                    "Archetype {} has no collider size, it will never be placed",
                    archetype.name
                );
                continue;
            }
            footprints.insert(archetype.name.clone(), footprint);
        }
        Self { footprints }
    }

    pub fn try_resolve(&self, archetype: &str) -> CoreResult<Footprint> {
        self.footprints
            .get(archetype)
            .copied()
            .ok_or_else(|| CoreError::MissingFootprint(archetype.to_string()))
    }

    /// Footprint of an archetype; zero (and an error log) when it has none
    pub fn resolve(&self, archetype: &str) -> Footprint {
        match self.try_resolve(archetype) {
            Ok(footprint) => footprint,
            Err(e) => {
                error!("{}", e);
                Footprint::ZERO
            }
        }
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }
}

/// All four rotated corners must probe as Buildable, and the lifted
/// footprint box must not overlap any Building. First failure wins.
pub fn is_placeable<W: PhysicsWorld + ?Sized>(
    world: &W,
    point: Vec3,
    footprint: Footprint,
    rotation: Rotation,
    ray_height: f32,
) -> bool {
    if footprint.is_zero() {
        return false;
    }

    for corner in footprint.corners(point, rotation) {
        if !probe_down(world, corner, ray_height).is_buildable() {
            return false;
        }
    }

    let center = point + Vec3::Y * (footprint.height() / 2.0);
    !world
        .overlap_box(center, footprint.half_extents(), rotation.quat())
        .iter()
        .any(|tag| Classification::from_tag(tag) == Classification::Building)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelCatalog;
    use crate::scene::ColliderScene;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn lot_scene() -> ColliderScene {
        let mut scene = ColliderScene::new();
        scene.add_static("Buildable", Vec3::new(0.0, -0.5, 0.0), Vec3::new(10.0, 1.0, 10.0), 0.0);
        scene.add_static("Road", Vec3::new(0.0, 0.05, 4.0), Vec3::new(10.0, 0.1, 2.0), 0.0);
        scene
    }

    #[test]
    fn test_corners_unrotated() {
        let fp = Footprint::new(2.0, 1.0, 4.0);
        let corners = fp.corners(Vec3::ZERO, Rotation::Deg0);
        assert!(corners.contains(&Vec3::new(1.0, 0.0, 2.0)));
        assert!(corners.contains(&Vec3::new(-1.0, 0.0, -2.0)));
    }

    #[test]
    fn test_corners_rotated_90_swap_axes() {
        let fp = Footprint::new(2.0, 1.0, 4.0);
        for corner in fp.corners(Vec3::ZERO, Rotation::Deg90) {
            assert!((corner.x.abs() - 2.0).abs() < 1e-5, "corner {corner:?}");
            assert!((corner.z.abs() - 1.0).abs() < 1e-5, "corner {corner:?}");
        }
    }

    #[test]
    fn test_random_rotation_covers_all() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(Rotation::random(&mut rng));
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_table_resolves_sample_archetypes() {
        let table = FootprintTable::build(&LevelCatalog::sample());
        assert_eq!(table.len(), 4);
        assert_eq!(table.resolve("shop_corner"), Footprint::new(2.0, 1.5, 3.0));
    }

    #[test]
    fn test_missing_footprint_is_zero() {
        let mut catalog = LevelCatalog::sample();
        catalog.archetypes[0].collider_size = [0.0, 0.0, 0.0];
        let table = FootprintTable::build(&catalog);
        assert_eq!(table.resolve("house_small"), Footprint::ZERO);
        assert!(matches!(
            table.try_resolve("house_small"),
            Err(CoreError::MissingFootprint(_))
        ));
        assert_eq!(table.resolve("no_such_archetype"), Footprint::ZERO);
    }

    #[test]
    fn test_placeable_on_open_lot() {
        let scene = lot_scene();
        assert!(is_placeable(&scene, Vec3::ZERO, Footprint::new(2.0, 2.0, 2.0), Rotation::Deg0, 25.0));
    }

    #[test]
    fn test_not_placeable_when_corner_on_road() {
        let scene = lot_scene();
        // depth 3 reaches z = 3.5, inside the road strip (z 3..5)
        let fp = Footprint::new(1.0, 1.0, 3.0);
        let point = Vec3::new(0.0, 0.0, 2.0);
        assert!(!is_placeable(&scene, point, fp, Rotation::Deg0, 25.0));
        // rotated 90 the long side runs along X and stays clear
        assert!(is_placeable(&scene, point, fp, Rotation::Deg90, 25.0));
    }

    #[test]
    fn test_not_placeable_off_the_map() {
        let scene = lot_scene();
        let point = Vec3::new(4.5, 0.0, 0.0);
        assert!(!is_placeable(&scene, point, Footprint::new(2.0, 1.0, 2.0), Rotation::Deg0, 25.0));
    }

    #[test]
    fn test_not_placeable_over_building() {
        let mut scene = lot_scene();
        scene.add_static("Building", Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 2.0, 1.0), 0.0);
        // corners at +/-1.5 miss the small building but the box covers it
        let fp = Footprint::new(3.0, 2.0, 3.0);
        assert!(!is_placeable(&scene, Vec3::ZERO, fp, Rotation::Deg0, 25.0));
    }

    #[test]
    fn test_zero_footprint_never_placeable() {
        let scene = lot_scene();
        assert!(!is_placeable(&scene, Vec3::ZERO, Footprint::ZERO, Rotation::Deg0, 25.0));
    }

    #[test]
    fn test_candidate_delegates() {
        let scene = lot_scene();
        let candidate = PlacementCandidate {
            position: Vec3::new(-2.0, 0.0, -2.0),
            footprint: Footprint::new(2.0, 2.0, 2.0),
            rotation: Rotation::Deg180,
        };
        assert!(candidate.is_placeable(&scene, 25.0));
    }
}
