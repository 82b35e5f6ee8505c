//! Simulation configuration and shared tick/time/rng resources.

use bevy_ecs::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Parameters of one explosion kind: radius, base damage at the origin, and
/// whether it may hurt the player.
///
/// Barrels hurt the player; grenades and missiles thrown by the player do not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplosionPreset {
    pub radius: f32,
    pub base_damage: i32,
    pub hurts_player: bool,
    pub destroys_structures: bool,
}

impl ExplosionPreset {
    pub fn barrel() -> Self {
        Self {
            radius: 140.0,
            base_damage: 40,
            hurts_player: true,
            destroys_structures: true,
        }
    }

    pub fn grenade() -> Self {
        Self {
            radius: 110.0,
            base_damage: 35,
            hurts_player: false,
            destroys_structures: true,
        }
    }

    pub fn missile() -> Self {
        Self {
            radius: 160.0,
            base_damage: 60,
            hurts_player: false,
            destroys_structures: true,
        }
    }
}

/// Configuration for the simulation core.
#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    /// Fixed timestep in seconds (e.g., 1/30 = 0.0333 for 30 Hz).
    pub fixed_timestep: f32,
    /// Seed for the shared simulation RNG (placement sampling, cascade jitter).
    pub seed: u64,
    /// Ticks between rebuilds of the static-geometry collision index.
    pub index_rebuild_interval: u64,
    /// Base delay before a chained hazard barrel takes its ignition damage.
    pub chain_stagger: f32,
    /// Maximum random extra delay added to the stagger.
    pub chain_jitter: f32,
    /// Explosion presets per source kind.
    pub barrel_explosion: ExplosionPreset,
    pub grenade_explosion: ExplosionPreset,
    pub missile_explosion: ExplosionPreset,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 30.0, // 30 Hz
            seed: 0x5C4A_91B2,
            index_rebuild_interval: 120, // ~4 seconds at 30 Hz
            chain_stagger: 0.25,
            chain_jitter: 0.15,
            barrel_explosion: ExplosionPreset::barrel(),
            grenade_explosion: ExplosionPreset::grenade(),
            missile_explosion: ExplosionPreset::missile(),
        }
    }
}

/// Global simulation tick counter. Increments each fixed update.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Elapsed simulation time in seconds. Scheduler entries are keyed by it.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTime(pub f32);

/// Shared deterministic RNG for the running simulation.
///
/// World generation does not use this stream; it derives per-cell RNGs from
/// the world seed so cell output is order-independent.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);
