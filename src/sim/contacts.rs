//! Built-in sphere-overlap contact detection
//!
//! Stands in for a host physics engine. Each pass compares every pair of
//! colliders whose layers have a handler and reports pairs that started or
//! stopped overlapping since the previous pass. Pair sets are ordered so
//! dispatch order is deterministic.

use std::collections::BTreeSet;

use super::body::Kinematics;
use super::collision::{Collider, Contact, ContactTable};

#[derive(Debug, Default)]
pub struct ContactTracker {
    previous: BTreeSet<Contact>,
    current: BTreeSet<Contact>,
    /// Pairs that began overlapping in the last pass
    pub started: Vec<Contact>,
    /// Pairs that stopped overlapping (or lost a collider) in the last pass
    pub ended: Vec<Contact>,
}

/// Contact with its colliders in a fixed order
pub fn canonical(a: Collider, b: Collider) -> Contact {
    if a <= b { Contact { a, b } } else { Contact { a: b, b: a } }
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one detection pass over `colliders`
    pub fn detect<C>(&mut self, colliders: &[(Collider, Kinematics)], table: &ContactTable<C>) {
        self.current.clear();
        for (i, (ca, ka)) in colliders.iter().enumerate() {
            for (cb, kb) in &colliders[i + 1..] {
                // A craft's hull never touches its own sensor
                if ca.entity == cb.entity || !table.is_tracked(ca.layer, cb.layer) {
                    continue;
                }
                if ka.position.distance(kb.position) < ka.radius + kb.radius {
                    self.current.insert(canonical(*ca, *cb));
                }
            }
        }

        self.started.clear();
        self.ended.clear();
        self.started.extend(self.current.difference(&self.previous).copied());
        self.ended.extend(self.previous.difference(&self.current).copied());
        std::mem::swap(&mut self.previous, &mut self.current);
    }

    /// Forget every tracked pair without reporting ends
    pub fn clear(&mut self) {
        self.previous.clear();
        self.current.clear();
        self.started.clear();
        self.ended.clear();
    }

    pub fn active_pairs(&self) -> usize {
        self.previous.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::{EntityRef, Layer};
    use crate::sim::pool::Handle;
    use glam::Vec3;

    fn noop(_: &mut (), _: EntityRef, _: EntityRef) {}

    fn round(index: u32, position: Vec3) -> (Collider, Kinematics) {
        (
            Collider::new(Layer::Gattler, EntityRef::GattlerRound(Handle { index, generation: 0 })),
            Kinematics {
                position,
                velocity: Vec3::ZERO,
                radius: 0.1,
            },
        )
    }

    fn ship(position: Vec3) -> (Collider, Kinematics) {
        (
            Collider::new(Layer::Spaceship, EntityRef::Spaceship),
            Kinematics {
                position,
                velocity: Vec3::ZERO,
                radius: 0.1,
            },
        )
    }

    #[test]
    fn test_start_and_end_reported_once() {
        let table = ContactTable::<()>::new().on_start(Layer::Spaceship, Layer::Gattler, noop);
        let mut tracker = ContactTracker::new();

        let touching = [ship(Vec3::ZERO), round(0, Vec3::new(0.15, 0.0, 0.0))];
        tracker.detect(&touching, &table);
        assert_eq!(tracker.started.len(), 1);
        assert!(tracker.ended.is_empty());

        tracker.detect(&touching, &table);
        assert!(tracker.started.is_empty());
        assert_eq!(tracker.active_pairs(), 1);

        let apart = [ship(Vec3::ZERO), round(0, Vec3::new(1.0, 0.0, 0.0))];
        tracker.detect(&apart, &table);
        assert!(tracker.started.is_empty());
        assert_eq!(tracker.ended.len(), 1);
    }

    #[test]
    fn test_untracked_layers_are_skipped() {
        let table = ContactTable::<()>::new();
        let mut tracker = ContactTracker::new();
        tracker.detect(&[ship(Vec3::ZERO), round(0, Vec3::ZERO)], &table);
        assert!(tracker.started.is_empty());
    }

    #[test]
    fn test_vanished_collider_ends_contact() {
        let table = ContactTable::<()>::new().on_start(Layer::Gattler, Layer::Gattler, noop);
        let mut tracker = ContactTracker::new();
        tracker.detect(&[round(0, Vec3::ZERO), round(1, Vec3::ZERO)], &table);
        assert_eq!(tracker.started.len(), 1);
        tracker.detect(&[round(0, Vec3::ZERO)], &table);
        assert_eq!(tracker.ended.len(), 1);
    }
}
