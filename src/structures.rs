//! Structure registry - owns every placed obstacle in the world.
//!
//! Structures are created in bulk by world generation or ad hoc (hazard
//! placement), mutated only through [`StructureRegistry::apply_damage`], and
//! deactivated exactly once. Once `active` is false a structure is terminal:
//! it is excluded from every query and every further damage call is a no-op.

use bevy_ecs::prelude::*;
use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque handle to a placed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureId(pub u32);

/// Enumerated obstacle kind. Behavior is data-driven through the descriptor
/// table rather than per-kind code paths; the only behavioral split the
/// resolver makes is hazard barrel vs everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Rock,
    DeadTree,
    Crate,
    Wreck,
    HazardBarrel,
}

/// Per-kind defaults: collision half extents, health, and flags.
#[derive(Debug, Clone, Copy)]
pub struct StructureDescriptor {
    pub half_w: f32,
    pub half_h: f32,
    pub health: i32,
    pub destructible: bool,
    pub has_physics: bool,
}

impl StructureKind {
    pub fn descriptor(&self) -> StructureDescriptor {
        match self {
            StructureKind::Rock => StructureDescriptor {
                half_w: 44.0,
                half_h: 38.0,
                health: 0,
                destructible: false,
                has_physics: true,
            },
            StructureKind::DeadTree => StructureDescriptor {
                half_w: 18.0,
                half_h: 26.0,
                health: 2,
                destructible: true,
                has_physics: true,
            },
            StructureKind::Crate => StructureDescriptor {
                half_w: 22.0,
                half_h: 22.0,
                health: 1,
                destructible: true,
                has_physics: true,
            },
            StructureKind::Wreck => StructureDescriptor {
                half_w: 70.0,
                half_h: 36.0,
                health: 0,
                destructible: false,
                has_physics: true,
            },
            StructureKind::HazardBarrel => StructureDescriptor {
                half_w: 16.0,
                half_h: 20.0,
                health: 3,
                destructible: true,
                has_physics: true,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StructureKind::Rock => "Rock",
            StructureKind::DeadTree => "DeadTree",
            StructureKind::Crate => "Crate",
            StructureKind::Wreck => "Wreck",
            StructureKind::HazardBarrel => "HazardBarrel",
        }
    }
}

/// Per-instance overrides applied on top of the kind descriptor.
#[derive(Debug, Clone, Copy)]
pub struct StructureConfig {
    /// Uniform scale applied to the kind's collision half extents.
    pub scale: f32,
    pub health: Option<i32>,
    pub has_physics: Option<bool>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            health: None,
            has_physics: None,
        }
    }
}

/// A placed obstacle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub kind: StructureKind,
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
    pub has_physics: bool,
    pub destructible: bool,
    pub health: i32,
    pub max_health: i32,
    pub active: bool,
}

impl Structure {
    pub fn is_hazard(&self) -> bool {
        self.kind == StructureKind::HazardBarrel
    }
}

/// Outcome of a damage call against a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageResult {
    /// Stale handle, non-destructible target, or non-positive amount.
    Ignored,
    /// Health decremented, structure still active.
    Damaged,
    /// Health reached zero; the structure was deactivated before this
    /// result was returned.
    Destroyed,
}

impl DamageResult {
    pub fn destroyed(&self) -> bool {
        matches!(self, DamageResult::Destroyed)
    }
}

/// Owns all structures: creation, removal, damage, and range queries.
///
/// Range queries are linear scans over live structures; populations stay in
/// the tens to low hundreds, and the per-tick hot path goes through the
/// throttled [`crate::spatial::StaticIndex`] instead.
#[derive(Resource, Debug, Default)]
pub struct StructureRegistry {
    slots: Vec<Structure>,
    index: HashMap<u32, usize>,
    next_id: u32,
    active_count: usize,
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a structure of `kind` at (`x`, `y`). Always succeeds.
    pub fn create(
        &mut self,
        kind: StructureKind,
        x: f32,
        y: f32,
        config: StructureConfig,
    ) -> StructureId {
        let desc = kind.descriptor();
        let id = StructureId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let health = config.health.unwrap_or(desc.health).max(0);
        let structure = Structure {
            id,
            kind,
            x,
            y,
            half_w: desc.half_w * config.scale,
            half_h: desc.half_h * config.scale,
            has_physics: config.has_physics.unwrap_or(desc.has_physics),
            destructible: desc.destructible,
            health,
            max_health: health,
            active: true,
        };

        self.index.insert(id.0, self.slots.len());
        self.slots.push(structure);
        self.active_count += 1;
        id
    }

    /// Deactivate and unindex a structure. Idempotent: a second call on an
    /// already-inactive handle is a no-op.
    pub fn remove(&mut self, id: StructureId) {
        if let Some(slot) = self.index.remove(&id.0) {
            self.slots[slot].active = false;
            self.active_count -= 1;
        }
    }

    /// Get an active structure by handle. Inactive handles resolve to `None`.
    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.index
            .get(&id.0)
            .map(|&slot| &self.slots[slot])
            .filter(|s| s.active)
    }

    /// Iterate over all currently-active structures.
    pub fn iter_active(&self) -> impl Iterator<Item = &Structure> {
        self.slots.iter().filter(|s| s.active)
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Handles of active structures whose center lies within `radius` of the
    /// point. Center-distance test, not shape-exact - a deliberate
    /// approximation shared with the original game.
    pub fn query_in_radius(&self, x: f32, y: f32, radius: f32) -> Vec<StructureId> {
        let radius_sq = radius * radius;
        self.iter_active()
            .filter(|s| {
                let dx = s.x - x;
                let dy = s.y - y;
                dx * dx + dy * dy <= radius_sq
            })
            .map(|s| s.id)
            .collect()
    }

    /// True iff no active structure center lies within `radius` of the point.
    pub fn is_area_free(&self, x: f32, y: f32, radius: f32) -> bool {
        self.query_in_radius(x, y, radius).is_empty()
    }

    /// Sample random points in the annulus [`min_radius`, `max_radius`]
    /// around the target, returning the first one whose `min_radius`
    /// neighborhood is free. `None` when `max_attempts` is exhausted.
    pub fn find_free_position(
        &self,
        rng: &mut ChaCha8Rng,
        target_x: f32,
        target_y: f32,
        min_radius: f32,
        max_radius: f32,
        max_attempts: u32,
    ) -> Option<(f32, f32)> {
        for _ in 0..max_attempts {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let dist = rng.gen_range(min_radius..=max_radius);
            let x = target_x + dist * angle.cos();
            let y = target_y + dist * angle.sin();
            if self.is_area_free(x, y, min_radius) {
                return Some((x, y));
            }
        }
        None
    }

    /// Apply damage to a structure.
    ///
    /// No-op (`Ignored`) for stale handles, non-destructible targets, and
    /// non-positive amounts. When health reaches zero the structure is
    /// deactivated and unindexed *before* `Destroyed` is returned, so a
    /// concurrent cascade branch re-checking liveness can never target it
    /// again.
    pub fn apply_damage(&mut self, id: StructureId, amount: i32) -> DamageResult {
        let Some(&slot) = self.index.get(&id.0) else {
            debug!("apply_damage on stale structure handle {:?}", id);
            return DamageResult::Ignored;
        };
        let structure = &mut self.slots[slot];
        if !structure.active || !structure.destructible || structure.health <= 0 || amount <= 0 {
            return DamageResult::Ignored;
        }

        structure.health = (structure.health - amount).max(0);
        if structure.health == 0 {
            structure.active = false;
            self.index.remove(&id.0);
            self.active_count -= 1;
            DamageResult::Destroyed
        } else {
            DamageResult::Damaged
        }
    }
}
