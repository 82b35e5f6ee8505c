//! Demo: shoot a line of hazard barrels and watch the chain reaction.
//!
//! Run with `RUST_LOG=debug` to see the explosion engine's attribution logs.

use scrapline_sim::{
    SimEvent, SimWorld, StructureConfig, StructureKind,
};

fn main() {
    env_logger::init();

    let mut sim = SimWorld::new();

    // A line of barrels, each within the previous one's blast radius.
    for i in 0..6 {
        sim.spawn_structure(
            StructureKind::HazardBarrel,
            i as f32 * 100.0,
            0.0,
            StructureConfig {
                health: Some(1),
                ..Default::default()
            },
        );
    }
    println!(
        "placed {} barrels, firing at the first one",
        sim.registry().active_count()
    );

    // One shot into the first barrel starts the cascade.
    sim.spawn_projectile(0, -40.0, 0.0, 900.0, 0.0, 10);

    let dt = 1.0 / 30.0;
    for frame in 0..90 {
        sim.step(dt);
        for event in sim.drain_events() {
            match event {
                SimEvent::HazardDestroyed { x, y } => {
                    println!("t={:.2}s  barrel detonated at ({x:.0}, {y:.0})", sim.current_time());
                }
                SimEvent::StructureDestroyed { id, .. } => {
                    println!("t={:.2}s  structure {id} destroyed", sim.current_time());
                }
                _ => {}
            }
        }
        if frame > 10 && sim.registry().active_count() == 0 {
            break;
        }
    }

    println!(
        "cascade finished after {} ticks, {} barrels left",
        sim.current_tick(),
        sim.registry().active_count()
    );
}
