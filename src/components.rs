//! ECS components for the dynamic entities the core collides and damages.
//!
//! The player, enemies, projectiles, and pickups are owned by external
//! collaborators (AI, weapon, and loot subsystems); they enter the ECS world
//! only through the `SimWorld` spawn API, and the core reads their position
//! and radius and reports removals through the event buffer.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position in world units (x = east/west, y = north/south).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 2D velocity vector.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

/// Approximate circular collision radius.
///
/// A single scalar derived from the entity's sprite half-width. All dynamic
/// collision is circle-circle or circle-rect against this radius.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollisionRadius(pub f32);

impl Default for CollisionRadius {
    fn default() -> Self {
        Self(12.0)
    }
}

// ============================================================================
// PLAYER COMPONENTS
// ============================================================================

/// Marker for the player entity. At most one exists.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Player health and shield pool.
///
/// Incoming damage drains the shield first, then health.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerVitals {
    pub health: i32,
    pub max_health: i32,
    pub shield: i32,
    pub max_shield: i32,
}

impl PlayerVitals {
    pub fn new(max_health: i32, max_shield: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            shield: max_shield,
            max_shield,
        }
    }

    /// Apply damage through the shield-then-health absorption contract.
    /// Negative amounts are ignored, never healed.
    pub fn absorb(&mut self, amount: i32) {
        let amount = amount.max(0);
        let shield_hit = amount.min(self.shield);
        self.shield -= shield_hit;
        self.health = (self.health - (amount - shield_hit)).max(0);
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

impl Default for PlayerVitals {
    fn default() -> Self {
        Self::new(100, 50)
    }
}

// ============================================================================
// ENEMY COMPONENTS
// ============================================================================

/// Unique identifier for an enemy, assigned by the spawning collaborator.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Health pool for damageable entities (currently enemies only).
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn damage(&mut self, amount: i32) {
        self.current = (self.current - amount.max(0)).max(0);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(30)
    }
}

/// Damage dealt to the player on contact.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContactDamage(pub i32);

impl Default for ContactDamage {
    fn default() -> Self {
        Self(10)
    }
}

/// Score awarded when this enemy is killed (reported outward, scored externally).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreValue(pub u32);

// ============================================================================
// PROJECTILE COMPONENTS
// ============================================================================

/// Unique identifier for a projectile, assigned by the weapon collaborator.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// Nominal damage this projectile deals to enemies and destructible
/// structures. Hazard barrels ignore it and always take 1 per hit.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectileDamage(pub i32);

impl Default for ProjectileDamage {
    fn default() -> Self {
        Self(10)
    }
}

// ============================================================================
// PICKUP COMPONENTS
// ============================================================================

/// Unique identifier for a pickup.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PickupId(pub u32);

/// What a pickup grants when collected. The effect is applied externally.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PickupKind {
    #[default]
    Scrap,
    Medkit,
    Ammo,
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning the player entity.
#[derive(Bundle, Default)]
pub struct PlayerBundle {
    pub marker: Player,
    pub position: Position,
    pub velocity: Velocity,
    pub radius: CollisionRadius,
    pub vitals: PlayerVitals,
}

impl PlayerBundle {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Position::new(x, y),
            radius: CollisionRadius(14.0),
            ..Default::default()
        }
    }
}

/// Bundle for spawning an enemy entity.
#[derive(Bundle, Default)]
pub struct EnemyBundle {
    pub id: EnemyId,
    pub position: Position,
    pub velocity: Velocity,
    pub radius: CollisionRadius,
    pub health: Health,
    pub contact_damage: ContactDamage,
    pub score: ScoreValue,
}

impl EnemyBundle {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self {
            id: EnemyId(id),
            position: Position::new(x, y),
            score: ScoreValue(50),
            ..Default::default()
        }
    }
}

/// Bundle for spawning a projectile entity.
#[derive(Bundle, Default)]
pub struct ProjectileBundle {
    pub id: ProjectileId,
    pub position: Position,
    pub velocity: Velocity,
    pub radius: CollisionRadius,
    pub damage: ProjectileDamage,
}

impl ProjectileBundle {
    pub fn new(id: u32, x: f32, y: f32, vx: f32, vy: f32, damage: i32) -> Self {
        Self {
            id: ProjectileId(id),
            position: Position::new(x, y),
            velocity: Velocity::new(vx, vy),
            radius: CollisionRadius(4.0),
            damage: ProjectileDamage(damage),
        }
    }
}

/// Bundle for spawning a pickup entity.
#[derive(Bundle, Default)]
pub struct PickupBundle {
    pub id: PickupId,
    pub position: Position,
    pub radius: CollisionRadius,
    pub kind: PickupKind,
}

impl PickupBundle {
    pub fn new(id: u32, x: f32, y: f32, kind: PickupKind) -> Self {
        Self {
            id: PickupId(id),
            position: Position::new(x, y),
            radius: CollisionRadius(10.0),
            kind,
        }
    }
}
