//! Shared kinematic state for every mobile entity
//!
//! Bodies integrate position and spin each frame and wrap to the far side of
//! the playspace when they leave it. +Z is forward for every body.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::playspace::Playspace;

/// Position, velocity and extent: what other systems may read about a body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    /// Local spin axis
    pub rotation_axis: Vec3,
    /// Spin rate (radians/sec)
    pub angular_speed: f32,
    pub radius: f32,
    /// Hidden while outside the playspace after a wrap
    pub visible: bool,
    /// In the world at all (false while sitting in a pool)
    pub active: bool,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            rotation_axis: Vec3::Y,
            angular_speed: 0.0,
            radius: 0.0,
            visible: false,
            active: false,
        }
    }
}

impl Body {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            ..Default::default()
        }
    }

    /// Put a pooled body into the world
    pub fn activate(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
        self.orientation = Quat::IDENTITY;
        self.active = true;
        self.visible = true;
    }

    /// Take the body out of the world
    pub fn deactivate(&mut self) {
        self.active = false;
        self.visible = false;
        self.velocity = Vec3::ZERO;
        self.angular_speed = 0.0;
    }

    /// Advance position and spin by one frame
    pub fn integrate(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        if self.angular_speed != 0.0 {
            let spin = Quat::from_axis_angle(self.rotation_axis, self.angular_speed * dt);
            self.orientation = (self.orientation * spin).normalize();
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    /// Turn to face `direction` (no-op for a zero vector)
    pub fn face(&mut self, direction: Vec3) {
        let dir = direction.normalize_or_zero();
        if dir != Vec3::ZERO {
            self.orientation = Quat::from_rotation_arc(Vec3::Z, dir);
        }
    }

    /// Set velocity towards `target` at `speed` and face along it
    pub fn head_towards(&mut self, target: Vec3, speed: f32) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.velocity = dir * speed;
        self.face(dir);
    }

    /// On or beyond the boundary and still moving outward
    pub fn is_outside(&self, playspace: &Playspace) -> bool {
        self.position.length() >= playspace.radius && self.velocity.dot(self.position) > 0.0
    }

    /// Move to the mirror point just beyond the far side, keep the speed, and
    /// head towards `aim(new_position)`. The body stays hidden until it re-enters.
    pub fn wrap(&mut self, playspace: &Playspace, jitter: f32, aim: impl FnOnce(Vec3) -> Vec3) {
        let outward = self.position.normalize_or_zero();
        let outward = if outward == Vec3::ZERO { Vec3::Z } else { outward };
        let speed = self.speed();

        self.position = -outward * playspace.radius * (1.0 + jitter);
        let target = aim(self.position);
        let heading = (target - self.position).normalize_or_zero();
        // An aim point on the wrap point itself falls back to the centre
        let heading = if heading == Vec3::ZERO { outward } else { heading };
        self.velocity = heading * speed;
        self.visible = false;
    }

    /// Reveal a wrapped body once it is clear of the boundary
    pub fn update_visibility(&mut self, playspace: &Playspace) {
        if !self.visible && self.active && self.position.length() < playspace.reentry_radius(self.radius) {
            self.visible = true;
        }
    }

    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            position: self.position,
            velocity: self.velocity,
            radius: self.radius,
        }
    }
}
