//! Centralized game constants for the merge town core.
//!
//! Defaults for `GameConfig` live here so the config layer, the layout
//! generator and the slot bar agree on the same numbers.

// =====================================================
// Terrain tags
// =====================================================

/// Tag carried by colliders buildings may stand on
pub const BUILDABLE_TAG: &str = "Buildable";

/// Tag carried by road colliders
pub const ROAD_TAG: &str = "Road";

/// Tag carried by placed building colliders
pub const BUILDING_TAG: &str = "Building";

// =====================================================
// Layout generation
// =====================================================

/// Height above the area floor that downward probes start from
pub const RAY_UPPER_DIFF: f32 = 25.0;

/// Inset from the buildable area edges before the grid starts
pub const AREA_MARGIN: f32 = 1.0;

/// Default step between grid probe points
pub const DEFAULT_RAY_SPACING: f32 = 1.0;

/// Extra copies of each required building placed on top of the goal count
pub const REQUIRED_SLACK: u32 = 2;

/// Pause between generator phases so freshly destroyed/spawned objects settle
pub const SETTLE_DELAY_SECS: f32 = 0.1;

/// Default seed for layout randomness
pub const DEFAULT_LAYOUT_SEED: u64 = 42;

// =====================================================
// Collection bar
// =====================================================

/// Slots in the collection bar
pub const DEFAULT_SLOT_COUNT: usize = 7;

/// Same-type items that merge into one set
pub const MATCH_SIZE: usize = 3;

/// Horizontal distance between slot anchors
pub const SLOT_SPACING: f32 = 1.2;

/// Lift before an item flies to its slot
pub const LIFT_ANIMATION_DURATION: f32 = 0.2;

/// Flight from the map into the bar
pub const MOVE_ANIMATION_DURATION: f32 = 1.0;

/// Hop from one slot to another while compacting
pub const JUMP_ANIMATION_DURATION: f32 = 0.3;

/// Merge flight to the triple's centroid
pub const DESTROY_ANIMATION_DURATION: f32 = 0.4;

/// How far above the centroid merged items meet
pub const DESTROY_POSITION_UP_DIFF: f32 = 4.0;

/// Red flash shown when the bar has no room
pub const REJECT_FLASH_DURATION: f32 = 0.05;

/// Minimum time between two accepted picks
pub const CLICK_COOLDOWN_SECS: f32 = 0.15;
