//! Snapshot types and the outward event buffer.
//!
//! The `Snapshot` struct provides a serializable view of the simulation state
//! for the rendering client; `SimEvents` buffers the fire-and-forget events
//! consumed by VFX, scoring, and quest collaborators.

use crate::components::*;
use crate::structures::{DamageResult, StructureId, StructureRegistry};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// An outward, fire-and-forget event. The core expects no response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    StructureDamaged { id: u32, amount: i32 },
    StructureDestroyed { id: u32, x: f32, y: f32 },
    HazardDestroyed { x: f32, y: f32 },
    EnemyKilled { id: u32, x: f32, y: f32, score: u32 },
    EnemyHit { id: u32, x: f32, y: f32 },
    PlayerDamaged { amount: i32 },
    PickupCollected { id: u32, kind: PickupKind },
}

/// Per-tick buffer of outward events, drained by the client.
#[derive(Resource, Debug, Default)]
pub struct SimEvents {
    pub events: Vec<SimEvent>,
}

impl SimEvents {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply structure damage through the registry and report the outcome.
    ///
    /// Captures position and kind before the damage call because a destroyed
    /// structure is unindexed the instant its health reaches zero.
    pub fn apply_structure_damage(
        &mut self,
        registry: &mut StructureRegistry,
        id: StructureId,
        amount: i32,
    ) -> DamageResult {
        let info = registry.get(id).map(|s| (s.x, s.y, s.is_hazard()));
        let result = registry.apply_damage(id, amount);
        if let Some((x, y, hazard)) = info {
            match result {
                DamageResult::Damaged => {
                    self.push(SimEvent::StructureDamaged { id: id.0, amount });
                }
                DamageResult::Destroyed => {
                    self.push(SimEvent::StructureDestroyed { id: id.0, x, y });
                    if hazard {
                        self.push(SimEvent::HazardDestroyed { x, y });
                    }
                }
                DamageResult::Ignored => {}
            }
        }
        result
    }
}

/// Snapshot of the player's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub max_health: i32,
    pub shield: i32,
    pub max_shield: i32,
}

/// Snapshot of a single enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub max_health: i32,
}

/// Snapshot of a projectile in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// Snapshot of an uncollected pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: PickupKind,
}

/// Snapshot of an active structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub id: u32,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
    pub health: i32,
    pub max_health: i32,
    pub destructible: bool,
}

/// Complete simulation state snapshot for the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub player: Option<PlayerSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub pickups: Vec<PickupSnapshot>,
    pub structures: Vec<StructureSnapshot>,
    /// Events emitted since the last snapshot/drain.
    pub events: Vec<SimEvent>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world. Events are attached by the
    /// caller, which owns the drain.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let player = world
            .query_filtered::<(&Position, &PlayerVitals), With<Player>>()
            .iter(world)
            .next()
            .map(|(pos, vitals)| PlayerSnapshot {
                x: pos.x,
                y: pos.y,
                health: vitals.health,
                max_health: vitals.max_health,
                shield: vitals.shield,
                max_shield: vitals.max_shield,
            });

        let enemies = world
            .query::<(&EnemyId, &Position, &Health)>()
            .iter(world)
            .map(|(id, pos, health)| EnemySnapshot {
                id: id.0,
                x: pos.x,
                y: pos.y,
                health: health.current,
                max_health: health.max,
            })
            .collect();

        let projectiles = world
            .query::<(&ProjectileId, &Position)>()
            .iter(world)
            .map(|(id, pos)| ProjectileSnapshot {
                id: id.0,
                x: pos.x,
                y: pos.y,
            })
            .collect();

        let pickups = world
            .query::<(&PickupId, &Position, &PickupKind)>()
            .iter(world)
            .map(|(id, pos, kind)| PickupSnapshot {
                id: id.0,
                x: pos.x,
                y: pos.y,
                kind: *kind,
            })
            .collect();

        let structures = world
            .get_resource::<StructureRegistry>()
            .map(|registry| {
                registry
                    .iter_active()
                    .map(|s| StructureSnapshot {
                        id: s.id.0,
                        kind: s.kind.name().to_string(),
                        x: s.x,
                        y: s.y,
                        half_w: s.half_w,
                        half_h: s.half_h,
                        health: s.health,
                        max_health: s.max_health,
                        destructible: s.destructible,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            tick,
            time,
            player,
            enemies,
            projectiles,
            pickups,
            structures,
            events: Vec::new(),
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::{StructureConfig, StructureKind};

    #[test]
    fn test_snapshot_json_roundtrip() {
        let snapshot = Snapshot {
            tick: 42,
            time: 1.4,
            player: Some(PlayerSnapshot {
                x: 1.0,
                y: 2.0,
                health: 80,
                max_health: 100,
                shield: 10,
                max_shield: 50,
            }),
            enemies: vec![EnemySnapshot {
                id: 7,
                x: 5.0,
                y: 5.0,
                health: 30,
                max_health: 30,
            }],
            projectiles: vec![],
            pickups: vec![],
            structures: vec![],
            events: vec![SimEvent::PlayerDamaged { amount: 5 }],
        };

        let json = snapshot.to_json().unwrap();
        let restored: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.tick, 42);
        assert_eq!(restored.enemies.len(), 1);
        assert_eq!(restored.events, vec![SimEvent::PlayerDamaged { amount: 5 }]);
    }

    #[test]
    fn test_apply_structure_damage_emits_events() {
        let mut registry = StructureRegistry::new();
        let mut events = SimEvents::default();
        let id = registry.create(
            StructureKind::HazardBarrel,
            10.0,
            20.0,
            StructureConfig::default(),
        );

        assert_eq!(
            events.apply_structure_damage(&mut registry, id, 1),
            DamageResult::Damaged
        );
        assert_eq!(
            events.events,
            vec![SimEvent::StructureDamaged { id: id.0, amount: 1 }]
        );

        events.drain();
        events.apply_structure_damage(&mut registry, id, 1);
        assert_eq!(
            events.apply_structure_damage(&mut registry, id, 1),
            DamageResult::Destroyed
        );
        let drained = events.drain();
        assert!(drained.contains(&SimEvent::StructureDestroyed {
            id: id.0,
            x: 10.0,
            y: 20.0
        }));
        assert!(drained.contains(&SimEvent::HazardDestroyed { x: 10.0, y: 20.0 }));

        // Stale handle: no further events.
        events.apply_structure_damage(&mut registry, id, 1);
        assert!(events.events.is_empty());
    }

    #[test]
    fn test_snapshot_from_world_includes_structures() {
        let mut world = World::new();
        let mut registry = StructureRegistry::new();
        registry.create(StructureKind::Rock, 0.0, 0.0, StructureConfig::default());
        world.insert_resource(registry);
        world.spawn(PlayerBundle::new(3.0, 4.0));
        world.spawn(EnemyBundle::new(1, 10.0, 10.0));

        let snapshot = Snapshot::from_world(&mut world, 1, 0.033);
        assert!(snapshot.player.is_some());
        assert_eq!(snapshot.enemies.len(), 1);
        assert_eq!(snapshot.structures.len(), 1);
        assert_eq!(snapshot.structures[0].kind, "Rock");
    }
}
