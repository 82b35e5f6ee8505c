//! Scrapline - Simulation Core
//!
//! A deterministic, fixed-timestep simulation of the destructible world in a
//! top-down survival action game: static obstacle registry, per-tick collision
//! resolution, and the explosion/chain-reaction engine.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod spatial;
pub mod structures;
pub mod systems;
pub mod world;
pub mod worldgen;

pub use api::SimWorld;
pub use components::*;
pub use config::{ExplosionPreset, SimConfig, SimRng, SimTick, SimTime};
pub use spatial::{StaticEntry, StaticIndex};
pub use structures::{
    DamageResult, Structure, StructureConfig, StructureId, StructureKind, StructureRegistry,
};
pub use systems::*;
pub use world::{SimEvent, SimEvents, Snapshot};
pub use worldgen::{Rect, WorldGenConfig, WorldLayout};
