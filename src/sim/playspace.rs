//! The spherical playspace

use glam::Vec3;
use rand::Rng;

use super::geom::{random_unit_vector, uniform};

/// Sphere centred on the origin that bounds the game world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playspace {
    pub radius: f32,
}

impl Playspace {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    /// A wrapped body becomes visible again once it is this far from the centre
    pub fn reentry_radius(&self, body_radius: f32) -> f32 {
        self.radius - body_radius / 4.0
    }

    /// Random point within `fraction` of the radius
    pub fn random_interior_point(&self, rng: &mut impl Rng, fraction: f32) -> Vec3 {
        let len = uniform(rng, 0.0, self.radius * fraction);
        random_unit_vector(rng, len)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.length() < self.radius
    }
}

impl Default for Playspace {
    fn default() -> Self {
        Self::new(crate::consts::PLAYSPACE_RADIUS)
    }
}
