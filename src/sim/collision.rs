//! Collision response and contact dispatch
//!
//! Contacts arrive as pairs of colliders tagged with a layer. Handlers are
//! registered per layer pair in a [`ContactTable`] when the game state is built,
//! so dispatch is a map lookup rather than anything resolved per event.

use std::collections::HashMap;

use glam::Vec3;

use super::asteroid::AsteroidId;
use super::pool::Handle;
use super::ufo::UfoId;

/// Swap momenta between two bodies: `v1' = v2·m2/m1`, `v2' = v1·m1/m2`.
///
/// Not a true elastic collision (the contact normal is ignored and kinetic
/// energy is not conserved). Callers re-clamp speeds afterwards.
pub fn momentum_swap(v1: Vec3, m1: f32, v2: Vec3, m2: f32) -> (Vec3, Vec3) {
    (v2 * m2 / m1, v1 * m1 / m2)
}

/// Collision layer of a collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Player rounds
    Gattler,
    Asteroid,
    /// Enemy hull
    Ufo,
    /// Enemy proximity sensor feeding obstacle avoidance
    UfoSensor,
    Spaceship,
    /// Enemy shots
    Shooter,
}

/// The simulation entity behind a collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityRef {
    Asteroid(AsteroidId),
    Ufo(UfoId),
    GattlerRound(Handle),
    Shot(Handle),
    Spaceship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Collider {
    pub layer: Layer,
    pub entity: EntityRef,
}

impl Collider {
    pub fn new(layer: Layer, entity: EntityRef) -> Self {
        Self { layer, entity }
    }
}

/// A contact between two colliders, as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Contact {
    pub a: Collider,
    pub b: Collider,
}

/// Contact handler; receives entities in the order the pair was registered
pub type ContactHandler<C> = fn(&mut C, EntityRef, EntityRef);

/// Handlers keyed by layer pair, separately for contact start and end
pub struct ContactTable<C> {
    on_start: HashMap<(Layer, Layer), ContactHandler<C>>,
    on_end: HashMap<(Layer, Layer), ContactHandler<C>>,
}

impl<C> ContactTable<C> {
    pub fn new() -> Self {
        Self {
            on_start: HashMap::new(),
            on_end: HashMap::new(),
        }
    }

    pub fn on_start(mut self, a: Layer, b: Layer, handler: ContactHandler<C>) -> Self {
        self.on_start.insert((a, b), handler);
        self
    }

    pub fn on_end(mut self, a: Layer, b: Layer, handler: ContactHandler<C>) -> Self {
        self.on_end.insert((a, b), handler);
        self
    }

    /// True if any handler cares about this pair of layers
    pub fn is_tracked(&self, a: Layer, b: Layer) -> bool {
        [(a, b), (b, a)]
            .iter()
            .any(|key| self.on_start.contains_key(key) || self.on_end.contains_key(key))
    }

    fn lookup(
        map: &HashMap<(Layer, Layer), ContactHandler<C>>,
        contact: &Contact,
    ) -> Option<(ContactHandler<C>, EntityRef, EntityRef)> {
        let (a, b) = (contact.a, contact.b);
        if let Some(handler) = map.get(&(a.layer, b.layer)) {
            return Some((*handler, a.entity, b.entity));
        }
        map.get(&(b.layer, a.layer))
            .map(|handler| (*handler, b.entity, a.entity))
    }

    /// Handler and ordered entities for a contact start, if the pair is registered
    pub fn start_handler(&self, contact: &Contact) -> Option<(ContactHandler<C>, EntityRef, EntityRef)> {
        Self::lookup(&self.on_start, contact)
    }

    pub fn end_handler(&self, contact: &Contact) -> Option<(ContactHandler<C>, EntityRef, EntityRef)> {
        Self::lookup(&self.on_end, contact)
    }
}

impl<C> Default for ContactTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_momentum_swap_formula() {
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, -0.5, 0.25);
        let (a, b) = momentum_swap(v1, 4.0, v2, 2.0);
        assert!((a * 4.0 - v2 * 2.0).length() < 1e-6);
        assert!((b * 2.0 - v1 * 4.0).length() < 1e-6);
    }

    #[derive(Default)]
    struct Log {
        seen: Vec<(EntityRef, EntityRef)>,
    }

    fn record(log: &mut Log, a: EntityRef, b: EntityRef) {
        log.seen.push((a, b));
    }

    #[test]
    fn test_lookup_tries_both_orders() {
        let table = ContactTable::<Log>::new().on_start(Layer::Spaceship, Layer::Shooter, record);
        let shot = EntityRef::Shot(Handle { index: 2, generation: 0 });
        let contact = Contact {
            a: Collider::new(Layer::Shooter, shot),
            b: Collider::new(Layer::Spaceship, EntityRef::Spaceship),
        };
        let (handler, a, b) = table.start_handler(&contact).unwrap();
        let mut log = Log::default();
        handler(&mut log, a, b);
        assert_eq!(log.seen, vec![(EntityRef::Spaceship, shot)]);
        assert!(table.end_handler(&contact).is_none());
        assert!(table.is_tracked(Layer::Shooter, Layer::Spaceship));
        assert!(!table.is_tracked(Layer::Gattler, Layer::Spaceship));
    }
}
