// ABOUTME: Crate root - re-exports the engine's host-facing surface
// ABOUTME: Everything a driver binary needs lives under engine::sim::GameState

pub mod engine;

pub use engine::actions::{ActionOutcome, RefusalReason, TrenchDirection, TrenchMode};
pub use engine::config::EngineConfig;
pub use engine::sim::{GameState, StateView};
pub use engine::state::biome::BiomeKind;
pub use engine::state::events::{Event, EventKind};
pub use engine::state::structures::StructureKind;
pub use engine::worldgen::GenerationError;
