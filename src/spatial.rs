//! Static-geometry collision index over the structure registry.
//!
//! Rebuilt on a throttle (not every tick) from the registry's current active
//! set. The rebuild constructs a complete new cell map and swaps it in whole,
//! so a query never observes a partially built index. Structures destroyed
//! between rebuilds linger as stale entries; every consumer re-checks the
//! structure's own `active` flag through the registry, which makes stale
//! entries harmless no-ops.

use crate::structures::{StructureId, StructureRegistry};
use bevy_ecs::prelude::*;
use std::collections::{HashMap, HashSet};

/// Entry in an index cell: a structure's id and collision AABB.
#[derive(Debug, Clone, Copy)]
pub struct StaticEntry {
    pub id: StructureId,
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

/// Grid-bucketed index of static collision AABBs.
#[derive(Resource, Debug)]
pub struct StaticIndex {
    /// Cell size in world units.
    pub cell_size: f32,
    cells: HashMap<(i32, i32), Vec<StaticEntry>>,
    /// Tick of the last rebuild.
    pub built_at_tick: u64,
}

impl Default for StaticIndex {
    fn default() -> Self {
        Self::new(200.0)
    }
}

impl StaticIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            built_at_tick: 0,
        }
    }

    #[inline]
    fn world_to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Rebuild from the registry's current active set: build the new cell map
    /// fully off to the side, then swap it in.
    pub fn rebuild(&mut self, registry: &StructureRegistry, tick: u64) {
        let mut cells: HashMap<(i32, i32), Vec<StaticEntry>> = HashMap::new();

        for s in registry.iter_active() {
            if !s.has_physics {
                continue;
            }
            let entry = StaticEntry {
                id: s.id,
                x: s.x,
                y: s.y,
                half_w: s.half_w,
                half_h: s.half_h,
            };
            let (min_cx, min_cy) = self.world_to_cell(s.x - s.half_w, s.y - s.half_h);
            let (max_cx, max_cy) = self.world_to_cell(s.x + s.half_w, s.y + s.half_h);
            for cx in min_cx..=max_cx {
                for cy in min_cy..=max_cy {
                    cells.entry((cx, cy)).or_default().push(entry);
                }
            }
        }

        self.cells = cells;
        self.built_at_tick = tick;
    }

    /// Entries whose AABB may overlap a circle at (`x`, `y`). Conservative:
    /// callers do the exact test and the registry `active` re-check.
    pub fn query_circle(&self, x: f32, y: f32, radius: f32) -> Vec<StaticEntry> {
        let (min_cx, min_cy) = self.world_to_cell(x - radius, y - radius);
        let (max_cx, max_cy) = self.world_to_cell(x + radius, y + radius);

        let mut seen: HashSet<StructureId> = HashSet::new();
        let mut results = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                if let Some(entries) = self.cells.get(&(cx, cy)) {
                    for entry in entries {
                        if seen.insert(entry.id) {
                            results.push(*entry);
                        }
                    }
                }
            }
        }
        results
    }

    pub fn entry_count(&self) -> usize {
        let mut seen: HashSet<StructureId> = HashSet::new();
        for entries in self.cells.values() {
            for entry in entries {
                seen.insert(entry.id);
            }
        }
        seen.len()
    }
}
