use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::gamebar::Collectable;
use crate::layout::PlacementId;
use crate::level::BuildingType;

/// Animation or effect a front-end should start. The core never waits on
/// the front-end; it schedules its own continuations with the same durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisualCue {
    BuildingRaised {
        id: PlacementId,
        position: Vec3,
    },
    /// Lift then fly from the map into a slot
    CollectableFlyToSlot {
        id: PlacementId,
        slot: usize,
        from: Vec3,
        to: Vec3,
        duration: f32,
    },
    /// Compaction hop between slots
    CollectableJump {
        id: PlacementId,
        from_slot: usize,
        to_slot: usize,
        to: Vec3,
        duration: f32,
    },
    MergeStarted {
        building_type: BuildingType,
        ids: Vec<PlacementId>,
        target: Vec3,
        duration: f32,
    },
    DestroyFx {
        position: Vec3,
    },
    /// Red highlight on a pick the bar had no room for
    RejectFlash {
        id: PlacementId,
    },
    RejectFlashEnd {
        id: PlacementId,
    },
}

/// Continuations the composition root schedules on itself
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TimedAction {
    /// Fly-in or jump animation into this slot finished
    SlotSettled { slot: usize },
    /// One merged piece reached the merge point
    MergePieceArrived { piece: Collectable },
    DestroyFx { position: Vec3 },
    RejectFlashEnd { id: PlacementId },
}
