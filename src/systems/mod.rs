//! Systems for the simulation core.
//!
//! All systems run on a single logical thread in a fixed, chained order each
//! tick:
//!
//! 1. `movement_system` - integrates velocity into position
//! 2. `dynamic_collision_system` - circle-circle pairs (player/enemy,
//!    projectile/enemy, player/pickup)
//! 3. `static_collision_system` - projectiles and movers against structures
//!    and rivers
//! 4. `explosion_system` - fires due chain-reaction entries, then processes
//!    queued explosion requests
//! 5. `static_index_rebuild_system` - throttled snapshot-then-swap rebuild of
//!    the static-geometry index
//!
//! Cross-tick effects (cascades mid-flight) live on the action scheduler and
//! never block tick progress.

pub mod collision;
pub mod explosion;
pub mod movement;
pub mod scheduler;

pub use collision::*;
pub use explosion::*;
pub use movement::*;
pub use scheduler::*;
