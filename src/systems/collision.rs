//! Per-tick collision resolution.
//!
//! Two systems split the work: `dynamic_collision_system` handles the
//! circle-circle pairs between dynamic entities, `static_collision_system`
//! tests projectiles and movers against structure AABBs and river bands
//! through the throttled static index. Each contact pair resolves at most
//! once per tick; removals go through `Commands` so every system in the
//! chain sees a consistent world.

use crate::components::*;
use crate::config::{SimConfig, SimTick};
use crate::spatial::StaticIndex;
use crate::structures::StructureRegistry;
use crate::systems::explosion::{ExplosionQueue, ExplosionSource, BARREL_CHAIN_DAMAGE};
use crate::world::{SimEvent, SimEvents};
use crate::worldgen::{Rect, WorldLayout};
use bevy_ecs::prelude::*;
use std::collections::HashSet;

/// Overlap test and minimum push-out vector for a circle against an AABB.
///
/// Returns `None` when the circle does not penetrate the rect. When the
/// circle's center lies inside the rect the push is along the axis of least
/// penetration, so a mover that tunneled in one tick exits on the near side.
pub fn circle_rect_push(px: f32, py: f32, radius: f32, rect: &Rect) -> Option<(f32, f32)> {
    let (cx, cy) = rect.closest_point(px, py);
    let dx = px - cx;
    let dy = py - cy;
    let d_sq = dx * dx + dy * dy;
    if d_sq >= radius * radius {
        return None;
    }
    if d_sq > 1e-6 {
        let d = d_sq.sqrt();
        let push = radius - d;
        Some((dx / d * push, dy / d * push))
    } else {
        let left = px - rect.min_x + radius;
        let right = rect.max_x - px + radius;
        let down = py - rect.min_y + radius;
        let up = rect.max_y - py + radius;
        let min = left.min(right).min(down).min(up);
        if min == left {
            Some((-left, 0.0))
        } else if min == right {
            Some((right, 0.0))
        } else if min == down {
            Some((0.0, -down))
        } else {
            Some((0.0, up))
        }
    }
}

fn circles_overlap(ax: f32, ay: f32, ar: f32, bx: f32, by: f32, br: f32) -> bool {
    let dx = ax - bx;
    let dy = ay - by;
    let r = ar + br;
    dx * dx + dy * dy < r * r
}

/// Resolves the dynamic pairs: player vs enemy contact, projectile vs enemy
/// hits, and player vs pickup collection.
#[allow(clippy::type_complexity)]
pub fn dynamic_collision_system(
    mut commands: Commands,
    mut events: ResMut<SimEvents>,
    mut player_q: Query<(&Position, &CollisionRadius, &mut PlayerVitals), With<Player>>,
    mut enemy_q: Query<(
        Entity,
        &EnemyId,
        &Position,
        &CollisionRadius,
        &mut Health,
        &ContactDamage,
        &ScoreValue,
    )>,
    projectile_q: Query<(Entity, &Position, &CollisionRadius, &ProjectileDamage), With<ProjectileId>>,
    pickup_q: Query<(Entity, &PickupId, &Position, &CollisionRadius, &PickupKind)>,
) {
    let mut removed_enemies: HashSet<Entity> = HashSet::new();
    let mut spent_projectiles: HashSet<Entity> = HashSet::new();

    let player = player_q
        .get_single_mut()
        .ok()
        .map(|(pos, radius, vitals)| (*pos, radius.0, vitals));

    // Player vs enemy: contact damage through the shield, enemy removed on
    // contact. Contact removal is not a kill, so no score event is emitted.
    if let Some((ppos, pradius, mut vitals)) = player {
        for (entity, _, pos, radius, _, contact, _) in enemy_q.iter() {
            if !circles_overlap(ppos.x, ppos.y, pradius, pos.x, pos.y, radius.0) {
                continue;
            }
            vitals.absorb(contact.0);
            events.push(SimEvent::PlayerDamaged { amount: contact.0 });
            removed_enemies.insert(entity);
            commands.entity(entity).despawn();
        }

        // Player vs pickup: collection only; the granted effect is applied by
        // the loot collaborator off the event.
        for (entity, id, pos, radius, kind) in pickup_q.iter() {
            if circles_overlap(ppos.x, ppos.y, pradius, pos.x, pos.y, radius.0) {
                events.push(SimEvent::PickupCollected {
                    id: id.0,
                    kind: *kind,
                });
                commands.entity(entity).despawn();
            }
        }
    }

    // Projectile vs enemy: each projectile spends itself on its first hit.
    for (proj_entity, proj_pos, proj_radius, damage) in projectile_q.iter() {
        if spent_projectiles.contains(&proj_entity) {
            continue;
        }
        for (entity, id, pos, radius, mut health, _, score) in enemy_q.iter_mut() {
            if removed_enemies.contains(&entity) {
                continue;
            }
            if !circles_overlap(
                proj_pos.x,
                proj_pos.y,
                proj_radius.0,
                pos.x,
                pos.y,
                radius.0,
            ) {
                continue;
            }
            health.damage(damage.0);
            if health.is_alive() {
                events.push(SimEvent::EnemyHit {
                    id: id.0,
                    x: pos.x,
                    y: pos.y,
                });
            } else {
                removed_enemies.insert(entity);
                commands.entity(entity).despawn();
                events.push(SimEvent::EnemyKilled {
                    id: id.0,
                    x: pos.x,
                    y: pos.y,
                    score: score.0,
                });
            }
            spent_projectiles.insert(proj_entity);
            commands.entity(proj_entity).despawn();
            break;
        }
    }
}

/// Resolves dynamic entities against static geometry: projectiles strike
/// structures and sink into rivers; the player and enemies are pushed out of
/// structure AABBs and river bands.
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn static_collision_system(
    mut commands: Commands,
    mut registry: ResMut<StructureRegistry>,
    index: Res<StaticIndex>,
    layout: Res<WorldLayout>,
    config: Res<SimConfig>,
    mut events: ResMut<SimEvents>,
    mut explosions: ResMut<ExplosionQueue>,
    projectile_q: Query<(Entity, &Position, &CollisionRadius, &ProjectileDamage), With<ProjectileId>>,
    mut mover_q: Query<
        (&mut Position, &CollisionRadius),
        (Or<(With<Player>, With<EnemyId>)>, Without<ProjectileId>),
    >,
) {
    // Projectiles: first overlapped structure absorbs the shot. Stale index
    // entries are rejected by the registry lookup.
    'projectiles: for (entity, pos, radius, damage) in projectile_q.iter() {
        for entry in index.query_circle(pos.x, pos.y, radius.0) {
            let Some(s) = registry.get(entry.id) else {
                continue;
            };
            if !s.has_physics {
                continue;
            }
            let rect = Rect::new(s.x - s.half_w, s.y - s.half_h, s.x + s.half_w, s.y + s.half_h);
            if circle_rect_push(pos.x, pos.y, radius.0, &rect).is_none() {
                continue;
            }
            let (hazard, destructible, sx, sy) = (s.is_hazard(), s.destructible, s.x, s.y);
            if hazard {
                // Barrels ignore the weapon's nominal damage and take the
                // fixed per-hit increment.
                if events
                    .apply_structure_damage(&mut registry, entry.id, BARREL_CHAIN_DAMAGE)
                    .destroyed()
                {
                    explosions.request_preset(
                        sx,
                        sy,
                        &config.barrel_explosion,
                        ExplosionSource::Barrel,
                    );
                }
            } else if destructible {
                events.apply_structure_damage(&mut registry, entry.id, damage.0);
            }
            commands.entity(entity).despawn();
            continue 'projectiles;
        }

        // Rivers absorb projectiles without any effect.
        for river in &layout.rivers {
            if river.overlaps_circle(pos.x, pos.y, radius.0) {
                commands.entity(entity).despawn();
                continue 'projectiles;
            }
        }
    }

    // Movers: positional push-out only, velocity untouched. Sliding along a
    // wall falls out of correcting position while the external mover keeps
    // setting velocity.
    for (mut pos, radius) in mover_q.iter_mut() {
        for entry in index.query_circle(pos.x, pos.y, radius.0 + index.cell_size * 0.5) {
            let Some(s) = registry.get(entry.id) else {
                continue;
            };
            if !s.has_physics {
                continue;
            }
            let rect = Rect::new(s.x - s.half_w, s.y - s.half_h, s.x + s.half_w, s.y + s.half_h);
            if let Some((dx, dy)) = circle_rect_push(pos.x, pos.y, radius.0, &rect) {
                pos.x += dx;
                pos.y += dy;
            }
        }
        for river in &layout.rivers {
            if let Some((dx, dy)) = circle_rect_push(pos.x, pos.y, radius.0, river) {
                pos.x += dx;
                pos.y += dy;
            }
        }
    }
}

/// Throttled snapshot-then-swap rebuild of the static index.
pub fn static_index_rebuild_system(
    tick: Res<SimTick>,
    config: Res<SimConfig>,
    registry: Res<StructureRegistry>,
    mut index: ResMut<StaticIndex>,
) {
    if tick.0.saturating_sub(index.built_at_tick) >= config.index_rebuild_interval {
        index.rebuild(&registry, tick.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::{StructureConfig, StructureKind};

    fn dynamic_world() -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(SimEvents::default());
        let mut schedule = Schedule::default();
        schedule.add_systems(dynamic_collision_system);
        (world, schedule)
    }

    fn static_world() -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(SimEvents::default());
        world.insert_resource(SimConfig::default());
        world.insert_resource(StructureRegistry::new());
        world.insert_resource(StaticIndex::default());
        world.insert_resource(WorldLayout::default());
        world.insert_resource(ExplosionQueue::default());
        let mut schedule = Schedule::default();
        schedule.add_systems(static_collision_system);
        (world, schedule)
    }

    fn rebuild_index(world: &mut World) {
        world.resource_scope(|world, mut index: Mut<StaticIndex>| {
            let registry = world.resource::<StructureRegistry>();
            index.rebuild(registry, 0);
        });
    }

    #[test]
    fn test_push_out_vectors() {
        let rect = Rect::new(-10.0, -10.0, 10.0, 10.0);
        // Clear of the rect.
        assert!(circle_rect_push(20.0, 0.0, 5.0, &rect).is_none());
        // Touching from the right: pushed right by the penetration depth.
        let (dx, dy) = circle_rect_push(13.0, 0.0, 5.0, &rect).unwrap();
        assert!((dx - 2.0).abs() < 0.001);
        assert!(dy.abs() < 0.001);
        // Center inside: pushed along the nearest axis, ending flush.
        let (dx, dy) = circle_rect_push(8.0, 0.0, 5.0, &rect).unwrap();
        assert!((dx - 7.0).abs() < 0.001);
        assert!(dy.abs() < 0.001);
    }

    #[test]
    fn test_enemy_contact_damages_player_and_removes_enemy() {
        let (mut world, mut schedule) = dynamic_world();
        world.spawn(PlayerBundle::new(0.0, 0.0));
        world.spawn(EnemyBundle::new(1, 10.0, 0.0));
        world.spawn(EnemyBundle::new(2, 300.0, 0.0)); // out of contact

        schedule.run(&mut world);

        let mut q = world.query::<&PlayerVitals>();
        let vitals = q.single(&world);
        assert_eq!(vitals.shield, 40); // default contact damage 10
        assert_eq!(vitals.health, 100);

        let mut enemies = world.query::<&EnemyId>();
        let alive: Vec<u32> = enemies.iter(&world).map(|id| id.0).collect();
        assert_eq!(alive, vec![2]);

        let events = world.resource::<SimEvents>();
        assert!(events
            .events
            .contains(&SimEvent::PlayerDamaged { amount: 10 }));
        // Contact removal is not a kill.
        assert!(!events
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::EnemyKilled { .. })));
    }

    #[test]
    fn test_projectile_spends_itself_on_first_enemy() {
        let (mut world, mut schedule) = dynamic_world();
        world.spawn(EnemyBundle {
            health: Health::new(100),
            ..EnemyBundle::new(1, 0.0, 0.0)
        });
        world.spawn(ProjectileBundle::new(1, 5.0, 0.0, 0.0, 0.0, 25));

        schedule.run(&mut world);

        let mut enemies = world.query::<&Health>();
        assert_eq!(enemies.single(&world).current, 75);
        let mut projectiles = world.query::<&ProjectileId>();
        assert_eq!(projectiles.iter(&world).count(), 0);
        assert!(world.resource::<SimEvents>().events.contains(&SimEvent::EnemyHit {
            id: 1,
            x: 0.0,
            y: 0.0
        }));
    }

    #[test]
    fn test_projectile_hits_only_first_of_two_enemies() {
        let (mut world, mut schedule) = dynamic_world();
        // Both enemies overlap the projectile; the shot spends itself on the
        // first and the second is untouched.
        world.spawn(EnemyBundle {
            health: Health::new(100),
            ..EnemyBundle::new(1, 0.0, 0.0)
        });
        world.spawn(EnemyBundle {
            health: Health::new(100),
            ..EnemyBundle::new(2, 6.0, 0.0)
        });
        world.spawn(ProjectileBundle::new(1, 3.0, 0.0, 0.0, 0.0, 25));

        schedule.run(&mut world);

        let mut enemies = world.query::<&Health>();
        let total: i32 = enemies.iter(&world).map(|h| h.current).sum();
        assert_eq!(total, 175); // exactly one enemy damaged
        let hits = world
            .resource::<SimEvents>()
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::EnemyHit { .. }))
            .count();
        assert_eq!(hits, 1);
        let mut projectiles = world.query::<&ProjectileId>();
        assert_eq!(projectiles.iter(&world).count(), 0);
    }

    #[test]
    fn test_projectile_resolves_once_across_both_phases() {
        // A projectile overlapping an enemy and a destructible structure in
        // the same tick spends itself in the dynamic phase; the command flush
        // between the chained systems removes it before the static phase.
        let (mut world, _) = static_world();
        let crate_id = world.resource_mut::<StructureRegistry>().create(
            StructureKind::Crate,
            0.0,
            0.0,
            StructureConfig {
                health: Some(10),
                ..Default::default()
            },
        );
        rebuild_index(&mut world);
        world.spawn(EnemyBundle {
            health: Health::new(100),
            ..EnemyBundle::new(1, 5.0, 0.0)
        });
        world.spawn(ProjectileBundle::new(1, 0.0, 0.0, 0.0, 0.0, 25));

        let mut schedule = Schedule::default();
        schedule.add_systems((dynamic_collision_system, static_collision_system).chain());
        schedule.run(&mut world);

        let mut enemies = world.query::<&Health>();
        assert_eq!(enemies.single(&world).current, 75);
        let registry = world.resource::<StructureRegistry>();
        assert_eq!(registry.get(crate_id).unwrap().health, 10); // untouched
        let mut projectiles = world.query::<&ProjectileId>();
        assert_eq!(projectiles.iter(&world).count(), 0);

        let events = &world.resource::<SimEvents>().events;
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SimEvent::EnemyHit { .. }))
                .count(),
            1
        );
        assert!(!events
            .iter()
            .any(|e| matches!(e, SimEvent::StructureDamaged { .. })));
    }

    #[test]
    fn test_projectile_kill_reports_score() {
        let (mut world, mut schedule) = dynamic_world();
        world.spawn(EnemyBundle {
            health: Health::new(20),
            score: ScoreValue(150),
            ..EnemyBundle::new(7, 0.0, 0.0)
        });
        world.spawn(ProjectileBundle::new(1, 5.0, 0.0, 0.0, 0.0, 25));

        schedule.run(&mut world);

        let mut enemies = world.query::<&EnemyId>();
        assert_eq!(enemies.iter(&world).count(), 0);
        assert!(world.resource::<SimEvents>().events.contains(&SimEvent::EnemyKilled {
            id: 7,
            x: 0.0,
            y: 0.0,
            score: 150
        }));
    }

    #[test]
    fn test_pickup_collection() {
        let (mut world, mut schedule) = dynamic_world();
        world.spawn(PlayerBundle::new(0.0, 0.0));
        world.spawn(PickupBundle::new(3, 10.0, 0.0, PickupKind::Medkit));
        world.spawn(PickupBundle::new(4, 400.0, 0.0, PickupKind::Scrap));

        schedule.run(&mut world);

        let mut pickups = world.query::<&PickupId>();
        let remaining: Vec<u32> = pickups.iter(&world).map(|id| id.0).collect();
        assert_eq!(remaining, vec![4]);
        assert!(world
            .resource::<SimEvents>()
            .events
            .contains(&SimEvent::PickupCollected {
                id: 3,
                kind: PickupKind::Medkit
            }));
    }

    #[test]
    fn test_projectile_hits_barrel_for_one_damage() {
        let (mut world, mut schedule) = static_world();
        let barrel = world.resource_mut::<StructureRegistry>().create(
            StructureKind::HazardBarrel,
            0.0,
            0.0,
            StructureConfig::default(),
        );
        rebuild_index(&mut world);
        world.spawn(ProjectileBundle::new(1, 10.0, 0.0, 0.0, 0.0, 9000));

        schedule.run(&mut world);

        let registry = world.resource::<StructureRegistry>();
        assert_eq!(registry.get(barrel).unwrap().health, 2); // 3 - 1, damage ignored
        let mut projectiles = world.query::<&ProjectileId>();
        assert_eq!(projectiles.iter(&world).count(), 0);
        assert!(world.resource::<ExplosionQueue>().0.is_empty());
    }

    #[test]
    fn test_destroying_barrel_queues_explosion() {
        let (mut world, mut schedule) = static_world();
        world.resource_mut::<StructureRegistry>().create(
            StructureKind::HazardBarrel,
            0.0,
            0.0,
            StructureConfig {
                health: Some(1),
                ..Default::default()
            },
        );
        rebuild_index(&mut world);
        world.spawn(ProjectileBundle::new(1, 10.0, 0.0, 0.0, 0.0, 5));

        schedule.run(&mut world);

        let queue = world.resource::<ExplosionQueue>();
        assert_eq!(queue.0.len(), 1);
        assert_eq!(queue.0[0].source, ExplosionSource::Barrel);
        assert!(world
            .resource::<SimEvents>()
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::HazardDestroyed { .. })));
    }

    #[test]
    fn test_projectile_damages_crate_with_nominal_damage() {
        let (mut world, mut schedule) = static_world();
        let crate_id = world.resource_mut::<StructureRegistry>().create(
            StructureKind::Crate,
            0.0,
            0.0,
            StructureConfig {
                health: Some(10),
                ..Default::default()
            },
        );
        rebuild_index(&mut world);
        world.spawn(ProjectileBundle::new(1, 15.0, 0.0, 0.0, 0.0, 4));

        schedule.run(&mut world);

        let registry = world.resource::<StructureRegistry>();
        assert_eq!(registry.get(crate_id).unwrap().health, 6);
    }

    #[test]
    fn test_river_absorbs_projectiles_and_blocks_movers() {
        let (mut world, mut schedule) = static_world();
        world.resource_mut::<WorldLayout>().rivers =
            vec![Rect::new(-50.0, 100.0, 50.0, 200.0)];

        world.spawn(ProjectileBundle::new(1, 0.0, 150.0, 0.0, 0.0, 10));
        world.spawn(PlayerBundle::new(0.0, 95.0)); // radius 14, overlapping band

        schedule.run(&mut world);

        let mut projectiles = world.query::<&ProjectileId>();
        assert_eq!(projectiles.iter(&world).count(), 0);
        // No structure damage events for a river sink.
        assert!(world.resource::<SimEvents>().events.is_empty());

        let mut q = world.query_filtered::<&Position, With<Player>>();
        let pos = q.single(&world);
        assert!(pos.y <= 100.0 - 14.0 + 0.001, "player not pushed out: {}", pos.y);
    }

    #[test]
    fn test_mover_pushed_out_of_structure() {
        let (mut world, mut schedule) = static_world();
        world.resource_mut::<StructureRegistry>().create(
            StructureKind::Rock,
            0.0,
            0.0,
            StructureConfig::default(),
        );
        rebuild_index(&mut world);
        // Rock half extents 44x38; enemy overlapping the right face.
        world.spawn(EnemyBundle::new(1, 50.0, 0.0));

        schedule.run(&mut world);

        let mut q = world.query_filtered::<&Position, With<EnemyId>>();
        let pos = q.single(&world);
        assert!(pos.x >= 44.0 + 12.0 - 0.001, "enemy not pushed out: {}", pos.x);
    }

    #[test]
    fn test_stale_index_entry_is_harmless() {
        let (mut world, mut schedule) = static_world();
        let id = world.resource_mut::<StructureRegistry>().create(
            StructureKind::Crate,
            0.0,
            0.0,
            StructureConfig::default(),
        );
        rebuild_index(&mut world);
        world.resource_mut::<StructureRegistry>().remove(id);

        world.spawn(ProjectileBundle::new(1, 0.0, 0.0, 0.0, 0.0, 10));
        schedule.run(&mut world);

        // Projectile flies on: the indexed AABB no longer resolves.
        let mut projectiles = world.query::<&ProjectileId>();
        assert_eq!(projectiles.iter(&world).count(), 1);
        assert!(world.resource::<SimEvents>().events.is_empty());
    }

    #[test]
    fn test_rebuild_system_respects_throttle() {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(StructureRegistry::new());
        world.insert_resource(StaticIndex::default());
        world.insert_resource(SimTick(0));

        let mut schedule = Schedule::default();
        schedule.add_systems(static_index_rebuild_system);

        world.resource_mut::<StructureRegistry>().create(
            StructureKind::Rock,
            0.0,
            0.0,
            StructureConfig::default(),
        );

        // Below the interval: no rebuild.
        world.insert_resource(SimTick(60));
        schedule.run(&mut world);
        assert_eq!(world.resource::<StaticIndex>().entry_count(), 0);

        // At the interval: rebuild happens and the timestamp advances.
        world.insert_resource(SimTick(120));
        schedule.run(&mut world);
        let index = world.resource::<StaticIndex>();
        assert_eq!(index.entry_count(), 1);
        assert_eq!(index.built_at_tick, 120);
    }
}
