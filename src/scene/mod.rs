//! In-memory collision scene.
//!
//! Stands in for the engine's physics world when the core runs headless:
//! - every map piece and placed building is a rapier cuboid collider in a
//!   standalone `ColliderSet`, rotated about Y
//! - raycasts and box overlaps go through a `QueryPipeline` that is rebuilt
//!   after every change to the set
//! - collider user data packs the tag index and the owning placement

use bevy::math::{Quat, Vec3};
use bevy::prelude::Transform;
use bevy_rapier3d::rapier::prelude::{
    Collider, ColliderBuilder, ColliderHandle, ColliderSet, Cuboid, IslandManager, Isometry,
    QueryFilter, QueryPipeline, Ray, Real, RigidBodySet, SharedShape,
};
use bevy_rapier3d::utils::iso_to_transform;
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::BUILDING_TAG;
use crate::layout::{Placement, PlacementId, SceneHost};
use crate::level::{AreaBounds, MapDefinition};
use crate::probe::{PhysicsWorld, RayHit};

/// Overlap queries shrink by this much so touching faces do not count
const OVERLAP_EPSILON: f32 = 1e-4;

/// Low 64 bits: tag index. High 64 bits: placement id + 1, 0 for terrain.
fn pack_user_data(tag: usize, placement: Option<PlacementId>) -> u128 {
    let owner = placement.map_or(0, |id| u128::from(id.0) + 1);
    (owner << 64) | tag as u128
}

fn unpack_user_data(data: u128) -> (usize, Option<PlacementId>) {
    let tag = (data & u128::from(u64::MAX)) as usize;
    let owner = data >> 64;
    (tag, (owner > 0).then(|| PlacementId((owner - 1) as u64)))
}

fn isometry(center: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(center.into(), rotation.into())
}

fn cuboid_collider(center: Vec3, half_extents: Vec3, rotation: Quat, user_data: u128) -> Collider {
    ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        .position(isometry(center, rotation))
        .user_data(user_data)
        .build()
}

/// Collision world of tagged boxes plus the buildings placed on it
#[derive(Clone, Default)]
pub struct ColliderScene {
    colliders: ColliderSet,
    // no rigid bodies: every collider is free-standing
    bodies: RigidBodySet,
    islands: IslandManager,
    query: QueryPipeline,
    tags: Vec<String>,
    buildings: BTreeMap<PlacementId, (Placement, ColliderHandle)>,
    map_name: Option<String>,
}

impl ColliderScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a non-building collider (terrain, props, test fixtures)
    pub fn add_static(&mut self, tag: &str, center: Vec3, size: Vec3, yaw_degrees: f32) {
        let tag = self.tag_index(tag);
        let rotation = Quat::from_rotation_y(yaw_degrees.to_radians());
        self.insert(cuboid_collider(center, size / 2.0, rotation, pack_user_data(tag, None)));
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Placement> {
        self.buildings.values().map(|(placement, _)| placement)
    }

    pub fn building(&self, id: PlacementId) -> Option<&Placement> {
        self.buildings.get(&id).map(|(placement, _)| placement)
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    /// Shape and world transform of a building's collider, for mirroring
    /// into an engine world
    pub fn building_shape(&self, id: PlacementId) -> Option<(SharedShape, Transform)> {
        let (_, handle) = self.buildings.get(&id)?;
        let collider = self.colliders.get(*handle)?;
        Some((collider.shared_shape().clone(), iso_to_transform(collider.position())))
    }

    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    fn tag_index(&mut self, tag: &str) -> usize {
        match self.tags.iter().position(|t| t == tag) {
            Some(index) => index,
            None => {
                self.tags.push(tag.to_string());
                self.tags.len() - 1
            }
        }
    }

    fn insert(&mut self, collider: Collider) -> ColliderHandle {
        let handle = self.colliders.insert(collider);
        self.query.update(&self.colliders);
        handle
    }

    fn remove(&mut self, handle: ColliderHandle) {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, false);
        self.query.update(&self.colliders);
    }

    /// Tag and owning placement stored on a collider
    fn describe(&self, handle: ColliderHandle) -> Option<(String, Option<PlacementId>)> {
        let collider = self.colliders.get(handle)?;
        let (tag, placement) = unpack_user_data(collider.user_data);
        Some((self.tags.get(tag)?.clone(), placement))
    }
}

impl PhysicsWorld for ColliderScene {
    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        let ray = Ray::new(origin.into(), direction.into());
        let (handle, hit) = self.query.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            Real::MAX,
            true,
            QueryFilter::default(),
        )?;
        let (tag, placement) = self.describe(handle)?;
        Some(RayHit {
            point: origin + direction * hit.time_of_impact,
            distance: hit.time_of_impact,
            tag,
            placement,
        })
    }

    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat) -> Vec<String> {
        let half = (half_extents - Vec3::splat(OVERLAP_EPSILON)).max(Vec3::ZERO);
        let shape = Cuboid::new(half.into());
        let mut tags = Vec::new();
        self.query.intersections_with_shape(
            &self.bodies,
            &self.colliders,
            &isometry(center, rotation),
            &shape,
            QueryFilter::default(),
            |handle| {
                if let Some((tag, _)) = self.describe(handle) {
                    tags.push(tag);
                }
                true
            },
        );
        tags
    }
}

impl SceneHost for ColliderScene {
    fn clear_level(&mut self) {
        if let Some(name) = self.map_name.take() {
            debug!("Clearing map {} ({} buildings)", name, self.buildings.len());
        }
        self.colliders = ColliderSet::new();
        self.islands = IslandManager::new();
        self.query.update(&self.colliders);
        self.buildings.clear();
    }

    fn spawn_map(&mut self, map: &MapDefinition) -> AreaBounds {
        for piece in &map.terrain {
            self.add_static(
                &piece.tag,
                Vec3::from_array(piece.center),
                Vec3::from_array(piece.size),
                piece.yaw_degrees,
            );
        }
        self.map_name = Some(map.name.clone());
        map.area
    }

    fn spawn_building(&mut self, placement: &Placement) {
        let footprint = placement.footprint;
        let center = placement.position + Vec3::Y * (footprint.height() / 2.0);
        let tag = self.tag_index(BUILDING_TAG);
        let handle = self.insert(cuboid_collider(
            center,
            footprint.half_extents(),
            placement.rotation.quat(),
            pack_user_data(tag, Some(placement.id)),
        ));
        if let Some((_, stale)) = self.buildings.insert(placement.id, (placement.clone(), handle)) {
            self.remove(stale);
        }
    }

    fn remove_building(&mut self, id: PlacementId) -> Option<Placement> {
        let (placement, handle) = self.buildings.remove(&id)?;
        self.remove(handle);
        Some(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::{Footprint, Rotation};
    use crate::level::{BuildingType, LevelCatalog};

    fn placement(id: u64, position: Vec3, rotation: Rotation) -> Placement {
        Placement {
            id: PlacementId(id),
            archetype: "house_small".into(),
            building_type: BuildingType::House,
            position,
            rotation,
            footprint: Footprint::new(2.0, 2.0, 2.0),
        }
    }

    #[test]
    fn test_user_data_packs_tag_and_owner() {
        assert_eq!(unpack_user_data(pack_user_data(3, None)), (3, None));
        let packed = pack_user_data(1, Some(PlacementId(0)));
        assert_eq!(unpack_user_data(packed), (1, Some(PlacementId(0))));
        let packed = pack_user_data(7, Some(PlacementId(u64::MAX - 1)));
        assert_eq!(unpack_user_data(packed), (7, Some(PlacementId(u64::MAX - 1))));
    }

    #[test]
    fn test_raycast_misses_and_ignores_behind() {
        let mut scene = ColliderScene::new();
        scene.add_static("Buildable", Vec3::new(0.0, -0.5, 0.0), Vec3::new(2.0, 1.0, 2.0), 0.0);
        assert!(scene.raycast(Vec3::new(3.0, 10.0, 0.0), Vec3::NEG_Y).is_none());
        assert!(scene.raycast(Vec3::new(0.0, -5.0, 0.0), Vec3::NEG_Y).is_none());
        assert!(scene.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO).is_none());
        let hit = scene.raycast(Vec3::new(0.5, 10.0, 0.5), Vec3::NEG_Y).unwrap();
        assert!((hit.distance - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_raycast_returns_nearest() {
        let mut scene = ColliderScene::new();
        scene.add_static("Buildable", Vec3::new(0.0, -0.5, 0.0), Vec3::new(10.0, 1.0, 10.0), 0.0);
        scene.add_static("Road", Vec3::new(0.0, 0.05, 0.0), Vec3::new(10.0, 0.1, 2.0), 0.0);

        let hit = scene.raycast(Vec3::new(0.0, 25.0, 0.0), Vec3::NEG_Y).unwrap();
        assert_eq!(hit.tag, "Road");
        assert!((hit.point.y - 0.1).abs() < 1e-5);

        let hit = scene.raycast(Vec3::new(0.0, 25.0, 3.0), Vec3::NEG_Y).unwrap();
        assert_eq!(hit.tag, "Buildable");
        assert!(hit.point.y.abs() < 1e-5);
    }

    #[test]
    fn test_raycast_rotated_box() {
        let mut scene = ColliderScene::new();
        // 4 x 1 strip rotated 90 degrees now spans z in [-2, 2]
        scene.add_static("Water", Vec3::ZERO, Vec3::new(4.0, 1.0, 1.0), 90.0);
        assert!(scene.raycast(Vec3::new(0.0, 5.0, 1.8), Vec3::NEG_Y).is_some());
        assert!(scene.raycast(Vec3::new(1.8, 5.0, 0.0), Vec3::NEG_Y).is_none());
    }

    #[test]
    fn test_overlap_ignores_touching_faces() {
        let mut scene = ColliderScene::new();
        scene.add_static("Building", Vec3::new(2.0, 1.0, 0.0), Vec3::new(2.0, 2.0, 2.0), 0.0);
        let touching = scene.overlap_box(Vec3::new(0.0, 1.0, 0.0), Vec3::ONE, Quat::IDENTITY);
        assert!(touching.is_empty());
        let overlapping = scene.overlap_box(Vec3::new(0.5, 1.0, 0.0), Vec3::ONE, Quat::IDENTITY);
        assert_eq!(overlapping, vec!["Building".to_string()]);
    }

    #[test]
    fn test_overlap_respects_rotation() {
        let mut scene = ColliderScene::new();
        scene.add_static("Building", Vec3::new(0.0, 1.0, 2.3), Vec3::new(1.0, 2.0, 1.0), 0.0);
        // 4 wide, 1 deep query: unrotated it stays clear of z = 2.3
        let half = Vec3::new(2.0, 1.0, 0.5);
        assert!(scene.overlap_box(Vec3::new(0.0, 1.0, 0.0), half, Quat::IDENTITY).is_empty());
        let rotated = Quat::from_rotation_y(90f32.to_radians());
        assert_eq!(scene.overlap_box(Vec3::new(0.0, 1.0, 0.0), half, rotated).len(), 1);
    }

    #[test]
    fn test_spawn_and_remove_building() {
        let mut scene = ColliderScene::new();
        let map = LevelCatalog::sample().maps[0].clone();
        let area = scene.spawn_map(&map);
        assert_eq!(area, map.area);
        assert_eq!(scene.map_name(), Some("riverside"));

        scene.spawn_building(&placement(1, Vec3::new(4.0, 0.0, 4.0), Rotation::Deg90));
        let hit = scene.raycast(Vec3::new(4.0, 25.0, 4.0), Vec3::NEG_Y).unwrap();
        assert_eq!(hit.tag, "Building");
        assert_eq!(hit.placement, Some(PlacementId(1)));
        assert!((hit.point.y - 2.0).abs() < 1e-5);

        let removed = scene.remove_building(PlacementId(1)).unwrap();
        assert_eq!(removed.id, PlacementId(1));
        assert_eq!(scene.building_count(), 0);
        let hit = scene.raycast(Vec3::new(4.0, 25.0, 4.0), Vec3::NEG_Y).unwrap();
        assert_eq!(hit.tag, "Buildable");
    }

    #[test]
    fn test_clear_level() {
        let mut scene = ColliderScene::new();
        scene.spawn_map(&LevelCatalog::sample().maps[0]);
        scene.spawn_building(&placement(1, Vec3::new(4.0, 0.0, 4.0), Rotation::Deg0));
        scene.clear_level();
        assert_eq!(scene.collider_count(), 0);
        assert!(scene.raycast(Vec3::new(4.0, 25.0, 4.0), Vec3::NEG_Y).is_none());
        assert_eq!(scene.building_count(), 0);
        assert!(scene.map_name().is_none());
    }

    #[test]
    fn test_building_shape_matches_placement() {
        let mut scene = ColliderScene::new();
        scene.spawn_building(&placement(5, Vec3::new(1.0, 0.0, -2.0), Rotation::Deg90));
        let (shape, transform) = scene.building_shape(PlacementId(5)).unwrap();
        let half = shape.as_cuboid().unwrap().half_extents;
        assert!((half.x - 1.0).abs() < 1e-6 && (half.y - 1.0).abs() < 1e-6);
        assert!((transform.translation - Vec3::new(1.0, 1.0, -2.0)).length() < 1e-5);
        assert!(transform.rotation.angle_between(Rotation::Deg90.quat()) < 1e-4);
        assert!(scene.building_shape(PlacementId(6)).is_none());
    }

    #[test]
    fn test_respawn_replaces_collider() {
        let mut scene = ColliderScene::new();
        scene.spawn_building(&placement(1, Vec3::ZERO, Rotation::Deg0));
        scene.spawn_building(&placement(1, Vec3::new(6.0, 0.0, 0.0), Rotation::Deg0));
        assert_eq!(scene.collider_count(), 1);
        assert!(scene.raycast(Vec3::new(0.0, 25.0, 0.0), Vec3::NEG_Y).is_none());
        assert!(scene.raycast(Vec3::new(6.0, 25.0, 0.0), Vec3::NEG_Y).is_some());
    }
}
