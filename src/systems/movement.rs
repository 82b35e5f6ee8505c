//! Movement system - applies velocity to position.
//!
//! The core makes no movement decisions; velocities are set by external
//! collaborators (AI, weapon cadence). Integration lives here so projectiles
//! travel between the positions the resolver tests each tick.

use crate::components::*;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// System that applies velocity to position.
pub fn movement_system(dt: Res<DeltaTime>, mut query: Query<(&mut Position, &Velocity)>) {
    let delta = dt.0;
    for (mut pos, vel) in query.iter_mut() {
        pos.x += vel.vx * delta;
        pos.y += vel.vy * delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_applies_velocity() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));

        world.spawn((Position::new(0.0, 0.0), Velocity::new(5.0, 3.0)));

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        let mut query = world.query::<&Position>();
        let pos = query.single(&world);
        assert!((pos.x - 5.0).abs() < 0.001);
        assert!((pos.y - 3.0).abs() < 0.001);
    }
}
