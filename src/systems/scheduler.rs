//! Time-ordered action scheduler for delayed effects.
//!
//! Chain-reaction staggering is modeled as entries on this logical scheduler,
//! drained each tick by the explosion system. Entries are speculative: there
//! is no cancel token, the consumer re-validates target liveness at fire time
//! and a stale entry becomes a no-op.

use crate::structures::StructureId;
use bevy_ecs::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A delayed effect waiting to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Apply the fixed chain-reaction damage to a hazard barrel.
    IgniteBarrel { target: StructureId },
}

#[derive(Debug, Clone, Copy)]
struct ScheduledAction {
    fire_at: f32,
    /// Insertion order, used as a tie-breaker so draining is deterministic.
    seq: u64,
    action: PendingAction,
}

impl PartialEq for ScheduledAction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledAction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .total_cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of pending actions keyed by fire time.
#[derive(Resource, Debug, Default)]
pub struct ActionScheduler {
    heap: BinaryHeap<Reverse<ScheduledAction>>,
    next_seq: u64,
}

impl ActionScheduler {
    pub fn schedule(&mut self, fire_at: f32, action: PendingAction) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Reverse(ScheduledAction {
            fire_at,
            seq,
            action,
        }));
    }

    /// Pop every action whose fire time has arrived, in fire-time order.
    pub fn drain_due(&mut self, now: f32) -> Vec<PendingAction> {
        let mut due = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.fire_at > now {
                break;
            }
            if let Some(Reverse(a)) = self.heap.pop() {
                due.push(a.action);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn next_fire_at(&self) -> Option<f32> {
        self.heap.peek().map(|Reverse(a)| a.fire_at)
    }
}
