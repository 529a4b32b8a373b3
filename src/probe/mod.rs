//! Spatial Grid Prober
//!
//! Casts a probe into the collision world and classifies the first surface
//! it meets by its tag. The collision world itself is an engine service
//! behind the [`PhysicsWorld`] trait; [`crate::scene::ColliderScene`] is the
//! in-memory implementation used headless and in tests.

use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::{BUILDABLE_TAG, BUILDING_TAG, ROAD_TAG};
use crate::layout::PlacementId;

/// Terrain classification derived from a collider tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Road,
    Building,
    Buildable,
    Other,
}

impl Classification {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            ROAD_TAG => Self::Road,
            BUILDING_TAG => Self::Building,
            BUILDABLE_TAG => Self::Buildable,
            _ => Self::Other,
        }
    }

    /// Scan filter: roads and buildings are never candidate points
    pub fn is_occupied(&self) -> bool {
        matches!(self, Self::Road | Self::Building)
    }
}

/// Nearest intersection reported by a raycast
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: f32,
    pub tag: String,
    /// Set when the collider belongs to a placed building
    pub placement: Option<PlacementId>,
}

/// Read-only collision queries the core needs from the engine
pub trait PhysicsWorld {
    /// First surface hit along the ray, if any
    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit>;

    /// Tags of every collider overlapping the oriented box
    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat) -> Vec<String>;
}

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    Hit {
        classification: Classification,
        point: Vec3,
        placement: Option<PlacementId>,
    },
    Empty,
}

impl Probe {
    pub fn classification(&self) -> Option<Classification> {
        match self {
            Probe::Hit { classification, .. } => Some(*classification),
            Probe::Empty => None,
        }
    }

    /// An empty probe is never buildable
    pub fn is_buildable(&self) -> bool {
        self.classification() == Some(Classification::Buildable)
    }
}

/// Cast a probe and classify whatever it hits first
pub fn probe<W: PhysicsWorld + ?Sized>(world: &W, origin: Vec3, direction: Vec3) -> Probe {
    match world.raycast(origin, direction) {
        Some(hit) => Probe::Hit {
            classification: Classification::from_tag(&hit.tag),
            point: hit.point,
            placement: hit.placement,
        },
        None => Probe::Empty,
    }
}

/// Probe straight down from `height` above the given point
pub fn probe_down<W: PhysicsWorld + ?Sized>(world: &W, point: Vec3, height: f32) -> Probe {
    probe(world, point + Vec3::Y * height, Vec3::NEG_Y)
}
