//! Public API facade over the ECS world.
//!
//! `SimWorld` owns the `bevy_ecs` world and schedule and exposes the narrow
//! surface external collaborators use: fixed-timestep stepping, one-shot
//! world generation, spawn/despawn of dynamic entities, scripted damage and
//! explosions, and snapshot/event extraction. All mutation funnels through
//! here; collaborators never touch the ECS world directly.

use crate::components::*;
use crate::config::{ExplosionPreset, SimConfig, SimRng, SimTick, SimTime};
use crate::spatial::StaticIndex;
use crate::structures::{DamageResult, StructureConfig, StructureId, StructureKind, StructureRegistry};
use crate::systems::{
    dynamic_collision_system, explosion_system, movement_system, static_collision_system,
    static_index_rebuild_system, ActionScheduler, DeltaTime, ExplosionQueue, ExplosionRequest,
    ExplosionSource,
};
use crate::world::{SimEvent, SimEvents, Snapshot};
use crate::worldgen::{self, WorldGenConfig, WorldLayout};
use bevy_ecs::prelude::*;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The simulation world and its fixed-timestep driver.
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    fixed_timestep: f32,
    tick: u64,
    time: f32,
    accumulator: f32,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(SimTick::default());
        world.insert_resource(SimTime::default());
        world.insert_resource(StructureRegistry::new());
        world.insert_resource(StaticIndex::default());
        world.insert_resource(WorldLayout::default());
        world.insert_resource(ActionScheduler::default());
        world.insert_resource(ExplosionQueue::default());
        world.insert_resource(SimEvents::default());
        world.insert_resource(SimRng(ChaCha8Rng::seed_from_u64(config.seed)));

        let fixed_timestep = config.fixed_timestep;
        world.insert_resource(config);

        // Systems run chained on a single logical thread; command flushes
        // between them keep despawns visible to the next system.
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                movement_system,
                dynamic_collision_system,
                static_collision_system,
                explosion_system,
                static_index_rebuild_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            fixed_timestep,
            tick: 0,
            time: 0.0,
            accumulator: 0.0,
        }
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance the simulation by wall-clock `dt` seconds, running as many
    /// fixed updates as the accumulator allows. Returns the number of ticks
    /// executed.
    pub fn step(&mut self, dt: f32) -> u32 {
        self.accumulator += dt;
        let mut ticks = 0;
        while self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            self.fixed_update();
            ticks += 1;
        }
        ticks
    }

    /// Run exactly one fixed update regardless of the accumulator.
    pub fn tick_once(&mut self) {
        self.fixed_update();
    }

    fn fixed_update(&mut self) {
        self.tick += 1;
        self.time += self.fixed_timestep;
        self.world.insert_resource(DeltaTime(self.fixed_timestep));
        self.world.insert_resource(SimTick(self.tick));
        self.world.insert_resource(SimTime(self.time));
        self.schedule.run(&mut self.world);
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn current_time(&self) -> f32 {
        self.time
    }

    // ------------------------------------------------------------------
    // World generation
    // ------------------------------------------------------------------

    /// Generate the world layout, populate the structure registry, and build
    /// the first static index. Intended to run once per session before any
    /// stepping.
    pub fn generate_world(&mut self, config: &WorldGenConfig) {
        let layout = self
            .world
            .resource_scope(|_, mut registry: Mut<StructureRegistry>| {
                worldgen::generate(config, &mut registry)
            });
        info!(
            "world generated: {} structures, {} river rects, {} bridges",
            self.world.resource::<StructureRegistry>().active_count(),
            layout.rivers.len(),
            layout.bridges.len()
        );
        self.world.insert_resource(layout);
        self.rebuild_static_index();
    }

    pub fn layout(&self) -> &WorldLayout {
        self.world.resource::<WorldLayout>()
    }

    pub fn registry(&self) -> &StructureRegistry {
        self.world.resource::<StructureRegistry>()
    }

    fn rebuild_static_index(&mut self) {
        let tick = self.tick;
        self.world
            .resource_scope(|world, mut index: Mut<StaticIndex>| {
                index.rebuild(world.resource::<StructureRegistry>(), tick);
            });
    }

    // ------------------------------------------------------------------
    // Dynamic entities
    // ------------------------------------------------------------------

    pub fn spawn_player(&mut self, x: f32, y: f32) -> Entity {
        self.world.spawn(PlayerBundle::new(x, y)).id()
    }

    pub fn spawn_enemy(&mut self, id: u32, x: f32, y: f32) -> Entity {
        self.world.spawn(EnemyBundle::new(id, x, y)).id()
    }

    pub fn spawn_projectile(
        &mut self,
        id: u32,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        damage: i32,
    ) -> Entity {
        self.world
            .spawn(ProjectileBundle::new(id, x, y, vx, vy, damage))
            .id()
    }

    pub fn spawn_pickup(&mut self, id: u32, x: f32, y: f32, kind: PickupKind) -> Entity {
        self.world.spawn(PickupBundle::new(id, x, y, kind)).id()
    }

    /// Set the player's velocity for the coming ticks. No-op without a
    /// player.
    pub fn set_player_velocity(&mut self, vx: f32, vy: f32) {
        let mut query = self
            .world
            .query_filtered::<&mut Velocity, With<Player>>();
        if let Ok(mut vel) = query.get_single_mut(&mut self.world) {
            vel.vx = vx;
            vel.vy = vy;
        }
    }

    pub fn player_vitals(&mut self) -> Option<PlayerVitals> {
        let mut query = self
            .world
            .query_filtered::<&PlayerVitals, With<Player>>();
        query.get_single(&self.world).ok().copied()
    }

    /// Teleport the player (respawn, scripted moves). Push-out corrects any
    /// resulting penetration on the next tick.
    pub fn set_player_position(&mut self, x: f32, y: f32) {
        let mut query = self
            .world
            .query_filtered::<&mut Position, With<Player>>();
        if let Ok(mut pos) = query.get_single_mut(&mut self.world) {
            pos.x = x;
            pos.y = y;
        }
    }

    pub fn set_enemy_position(&mut self, id: u32, x: f32, y: f32) {
        let mut query = self.world.query::<(&EnemyId, &mut Position)>();
        for (enemy_id, mut pos) in query.iter_mut(&mut self.world) {
            if enemy_id.0 == id {
                pos.x = x;
                pos.y = y;
                return;
            }
        }
    }

    pub fn set_enemy_velocity(&mut self, id: u32, vx: f32, vy: f32) {
        let mut query = self.world.query::<(&EnemyId, &mut Velocity)>();
        for (enemy_id, mut vel) in query.iter_mut(&mut self.world) {
            if enemy_id.0 == id {
                vel.vx = vx;
                vel.vy = vy;
                return;
            }
        }
    }

    /// Despawn an enemy by external id. Returns whether it existed.
    pub fn remove_enemy(&mut self, id: u32) -> bool {
        let mut query = self.world.query::<(Entity, &EnemyId)>();
        let found = query
            .iter(&self.world)
            .find(|(_, enemy_id)| enemy_id.0 == id)
            .map(|(entity, _)| entity);
        if let Some(entity) = found {
            self.world.despawn(entity);
            true
        } else {
            false
        }
    }

    pub fn remove_projectile(&mut self, id: u32) -> bool {
        let mut query = self.world.query::<(Entity, &ProjectileId)>();
        let found = query
            .iter(&self.world)
            .find(|(_, proj_id)| proj_id.0 == id)
            .map(|(entity, _)| entity);
        if let Some(entity) = found {
            self.world.despawn(entity);
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Structures and scripted effects
    // ------------------------------------------------------------------

    /// Place a structure outside world generation (scripted hazards, level
    /// events). The static index is rebuilt immediately so the placement
    /// collides this very tick.
    pub fn spawn_structure(
        &mut self,
        kind: StructureKind,
        x: f32,
        y: f32,
        config: StructureConfig,
    ) -> StructureId {
        let id = self
            .world
            .resource_mut::<StructureRegistry>()
            .create(kind, x, y, config);
        self.rebuild_static_index();
        id
    }

    /// Scatter a cluster of hazard barrels around a center point, skipping
    /// positions the sampler cannot free up. Returns the placed handles.
    pub fn spawn_hazard_cluster(&mut self, x: f32, y: f32, count: u32) -> Vec<StructureId> {
        let mut placed = Vec::new();
        for _ in 0..count {
            let position = self
                .world
                .resource_scope(|world, mut rng: Mut<SimRng>| {
                    world
                        .resource::<StructureRegistry>()
                        .find_free_position(&mut rng.0, x, y, 40.0, 120.0, 12)
                });
            if let Some((px, py)) = position {
                placed.push(self.world.resource_mut::<StructureRegistry>().create(
                    StructureKind::HazardBarrel,
                    px,
                    py,
                    StructureConfig::default(),
                ));
            }
        }
        if !placed.is_empty() {
            self.rebuild_static_index();
        }
        placed
    }

    /// Apply scripted damage to a structure, with the same event and chain
    /// semantics as a projectile hit carrying this amount.
    pub fn damage_structure(&mut self, id: StructureId, amount: i32) -> DamageResult {
        let info = self
            .world
            .resource::<StructureRegistry>()
            .get(id)
            .map(|s| (s.x, s.y, s.is_hazard()));
        let result = self.world.resource_scope(|world, mut events: Mut<SimEvents>| {
            let mut registry = world.resource_mut::<StructureRegistry>();
            events.apply_structure_damage(&mut registry, id, amount)
        });
        if let Some((x, y, true)) = info {
            if result.destroyed() {
                let preset = self.world.resource::<SimConfig>().barrel_explosion;
                self.world.resource_mut::<ExplosionQueue>().request_preset(
                    x,
                    y,
                    &preset,
                    ExplosionSource::Script,
                );
            }
        }
        result
    }

    /// Queue a scripted explosion; it resolves in the next fixed update.
    pub fn create_explosion(
        &mut self,
        x: f32,
        y: f32,
        preset: &ExplosionPreset,
        source: ExplosionSource,
    ) {
        self.world
            .resource_mut::<ExplosionQueue>()
            .push(ExplosionRequest::from_preset(x, y, preset, source));
    }

    /// Find a structure-free position in an annulus around the target, for
    /// spawners that must not place entities inside obstacles.
    pub fn find_free_position(
        &mut self,
        target_x: f32,
        target_y: f32,
        min_radius: f32,
        max_radius: f32,
        max_attempts: u32,
    ) -> Option<(f32, f32)> {
        self.world.resource_scope(|world, mut rng: Mut<SimRng>| {
            world.resource::<StructureRegistry>().find_free_position(
                &mut rng.0,
                target_x,
                target_y,
                min_radius,
                max_radius,
                max_attempts,
            )
        })
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Drain the events emitted since the last drain or snapshot.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world.resource_mut::<SimEvents>().drain()
    }

    /// Take a full state snapshot, consuming the pending event buffer.
    pub fn snapshot(&mut self) -> Snapshot {
        let events = self.drain_events();
        let mut snapshot = Snapshot::from_world(&mut self.world, self.tick, self.time);
        snapshot.events = events;
        snapshot
    }

    pub fn snapshot_json(&mut self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }
}
