//! Explosion engine - area damage with distance falloff and chain reactions.
//!
//! Explosions are requested through the [`ExplosionQueue`] (direct barrel
//! hits, player weapons, scripted blasts) and processed once per tick after
//! collision resolution. Damage to the player and enemies falls off linearly
//! with distance; structure destruction is all-or-nothing. Every explosion,
//! regardless of its structure-destruction flag, queries nearby healthy
//! hazard barrels and schedules a staggered 1-damage ignition against each,
//! which is what produces the perceptible cascade.

use crate::components::*;
use crate::config::{ExplosionPreset, SimConfig, SimRng, SimTime};
use crate::structures::StructureRegistry;
use crate::systems::scheduler::{ActionScheduler, PendingAction};
use crate::world::{SimEvent, SimEvents};
use bevy_ecs::prelude::*;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Damage a hazard barrel takes from a chain-reaction step or a direct
/// projectile hit. Fixed at 1 regardless of the triggering explosion's
/// magnitude or the firing weapon's nominal damage; this is a preserved
/// balancing rule, not an oversight.
pub const BARREL_CHAIN_DAMAGE: i32 = 1;

/// Overwhelming damage used to destroy non-hazard structures caught in a
/// blast in a single step.
pub const STRUCTURE_WRECK_DAMAGE: i32 = 9_999;

/// Who asked for the explosion. Used for logging and attribution only; the
/// player-safety behavior comes from the request flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplosionSource {
    Barrel,
    Grenade,
    Missile,
    Script,
}

/// A single explosion to resolve.
#[derive(Debug, Clone, Copy)]
pub struct ExplosionRequest {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub base_damage: i32,
    pub hurts_player: bool,
    pub affects_enemies: bool,
    pub destroys_structures: bool,
    pub source: ExplosionSource,
}

impl ExplosionRequest {
    pub fn from_preset(x: f32, y: f32, preset: &ExplosionPreset, source: ExplosionSource) -> Self {
        Self {
            x,
            y,
            radius: preset.radius,
            base_damage: preset.base_damage,
            hurts_player: preset.hurts_player,
            affects_enemies: true,
            destroys_structures: preset.destroys_structures,
            source,
        }
    }
}

/// Queue of explosion requests awaiting the explosion system.
#[derive(Resource, Debug, Default)]
pub struct ExplosionQueue(pub Vec<ExplosionRequest>);

impl ExplosionQueue {
    pub fn push(&mut self, request: ExplosionRequest) {
        self.0.push(request);
    }

    pub fn request_preset(
        &mut self,
        x: f32,
        y: f32,
        preset: &ExplosionPreset,
        source: ExplosionSource,
    ) {
        self.push(ExplosionRequest::from_preset(x, y, preset, source));
    }
}

/// Linear falloff: full damage at the origin, zero at the radius edge.
/// A target at `dist >= radius` takes nothing.
pub fn falloff_damage(base: i32, dist: f32, radius: f32) -> i32 {
    if dist >= radius {
        0
    } else {
        (base as f32 * (1.0 - dist / radius)).floor() as i32
    }
}

/// System that fires due chain-reaction entries and resolves queued
/// explosions.
#[allow(clippy::too_many_arguments)]
pub fn explosion_system(
    mut commands: Commands,
    time: Res<SimTime>,
    config: Res<SimConfig>,
    mut scheduler: ResMut<ActionScheduler>,
    mut queue: ResMut<ExplosionQueue>,
    mut registry: ResMut<StructureRegistry>,
    mut events: ResMut<SimEvents>,
    mut rng: ResMut<SimRng>,
    mut player_q: Query<(&Position, &mut PlayerVitals), With<Player>>,
    mut enemy_q: Query<(Entity, &EnemyId, &Position, &mut Health, &ScoreValue)>,
) {
    let now = time.0;

    // Fire due chain entries. Entries are speculative: the target may have
    // been destroyed by another branch since scheduling, so liveness is
    // re-checked here and stale entries fall through as no-ops.
    for action in scheduler.drain_due(now) {
        match action {
            PendingAction::IgniteBarrel { target } => {
                let Some(s) = registry.get(target) else {
                    continue;
                };
                if s.health <= 0 {
                    continue;
                }
                let (sx, sy) = (s.x, s.y);
                if events
                    .apply_structure_damage(&mut registry, target, BARREL_CHAIN_DAMAGE)
                    .destroyed()
                {
                    queue.request_preset(sx, sy, &config.barrel_explosion, ExplosionSource::Barrel);
                }
            }
        }
    }

    // Resolve queued requests to a fixed point within this tick. Barrel
    // ignitions always land on the scheduler at a future time, so the loop
    // is bounded by the requests already enqueued plus the barrel count.
    let mut killed: HashSet<Entity> = HashSet::new();
    let mut pending = std::mem::take(&mut queue.0);
    while !pending.is_empty() {
        for request in pending {
            resolve_explosion(
                request,
                now,
                &config,
                &mut scheduler,
                &mut registry,
                &mut events,
                &mut rng,
                &mut commands,
                &mut player_q,
                &mut enemy_q,
                &mut killed,
            );
        }
        pending = std::mem::take(&mut queue.0);
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_explosion(
    request: ExplosionRequest,
    now: f32,
    config: &SimConfig,
    scheduler: &mut ActionScheduler,
    registry: &mut StructureRegistry,
    events: &mut SimEvents,
    rng: &mut SimRng,
    commands: &mut Commands,
    player_q: &mut Query<(&Position, &mut PlayerVitals), With<Player>>,
    enemy_q: &mut Query<(Entity, &EnemyId, &Position, &mut Health, &ScoreValue)>,
    killed: &mut HashSet<Entity>,
) {
    if !request.x.is_finite()
        || !request.y.is_finite()
        || !request.radius.is_finite()
        || request.radius <= 0.0
    {
        warn!(
            "rejected explosion request from {:?}: invalid origin or radius",
            request.source
        );
        return;
    }

    debug!(
        "explosion from {:?} at ({:.1}, {:.1}) radius {:.0}",
        request.source, request.x, request.y, request.radius
    );

    if request.hurts_player {
        if let Ok((pos, mut vitals)) = player_q.get_single_mut() {
            let dist = ((pos.x - request.x).powi(2) + (pos.y - request.y).powi(2)).sqrt();
            let damage = falloff_damage(request.base_damage, dist, request.radius);
            if damage > 0 {
                vitals.absorb(damage);
                events.push(SimEvent::PlayerDamaged { amount: damage });
            }
        }
    }

    if request.affects_enemies {
        for (entity, id, pos, mut health, score) in enemy_q.iter_mut() {
            if killed.contains(&entity) {
                continue;
            }
            let dist = ((pos.x - request.x).powi(2) + (pos.y - request.y).powi(2)).sqrt();
            let damage = falloff_damage(request.base_damage, dist, request.radius);
            if damage <= 0 {
                continue;
            }
            health.damage(damage);
            if health.is_alive() {
                events.push(SimEvent::EnemyHit {
                    id: id.0,
                    x: pos.x,
                    y: pos.y,
                });
            } else {
                killed.insert(entity);
                commands.entity(entity).despawn();
                events.push(SimEvent::EnemyKilled {
                    id: id.0,
                    x: pos.x,
                    y: pos.y,
                    score: score.0,
                });
            }
        }
    }

    // Structures in range: hazard barrels are never destroyed outright here;
    // they only ever receive the scheduled chain damage. Everything else
    // destructible is wrecked in one step when the request asks for it.
    for id in registry.query_in_radius(request.x, request.y, request.radius) {
        let Some(s) = registry.get(id) else {
            continue;
        };
        if s.is_hazard() {
            if s.health > 0 {
                let jitter = rng.0.gen_range(0.0..config.chain_jitter.max(f32::EPSILON));
                scheduler.schedule(
                    now + config.chain_stagger + jitter,
                    PendingAction::IgniteBarrel { target: id },
                );
            }
        } else if request.destroys_structures && s.destructible {
            events.apply_structure_damage(registry, id, STRUCTURE_WRECK_DAMAGE);
        }
    }
}
