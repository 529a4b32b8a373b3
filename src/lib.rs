//! Merge Town - Core Library
//!
//! Engine-agnostic core of a casual 3D merge/collection game:
//! - Level data (building types, archetypes, maps, level catalog)
//! - Spatial probing and footprint validation against tagged colliders
//! - Level layout generation (required buildings, then random fill)
//! - Collection slot bar (insert, triple matching, compaction)
//! - Level progress tracking (goals, completion, game over, level timer)
//! - Composition root with cancellable timers and a signal bus
//! - Bevy plugin and catalog hot-reload

pub mod config;
pub mod constants;
pub mod error;
pub mod footprint;
pub mod game;
pub mod gamebar;
pub mod hotreload;
pub mod layout;
pub mod level;
pub mod logging;
pub mod plugin;
pub mod probe;
pub mod progress;
pub mod scene;
pub mod scheduler;
pub mod signals;

pub use config::GameConfig;
pub use error::{CoreError, CoreResult};
pub use game::{Game, PickOutcome, VisualCue};
pub use level::{BuildingType, LevelCatalog};
pub use plugin::MergeCorePlugin;
pub use scene::ColliderScene;
pub use signals::GameSignal;
