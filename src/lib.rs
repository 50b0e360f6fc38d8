//! Spacerocks - simulation core for a 3D asteroids shooter inside a spherical playspace
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (bodies, pools, targeting, steering, waves)
//! - `settings`: Runtime settings and configuration errors
//! - `tuning`: Data-driven difficulty table with level inheritance
//!
//! Rendering, input mapping and the menu/pause state machine live in the host.
//! The host calls [`sim::tick`] once per frame and reads positions, visibility
//! and events back out of [`sim::GameState`].

pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{ConfigError, SimSettings};
pub use tuning::LevelTable;

/// Simulation constants (metres, seconds, kilograms)
pub mod consts {
    /// Fixed simulation timestep (90 Hz, headset refresh)
    pub const SIM_DT: f32 = 1.0 / 90.0;

    /// Default playspace radius
    pub const PLAYSPACE_RADIUS: f32 = 4.0;
    /// Bodies reappear up to this fraction beyond the boundary after a wrap
    pub const MAX_WRAP_JITTER: f32 = 0.05;
    /// Heading targets after a wrap are drawn inside `radius / WRAP_AIM_DIVISOR`
    pub const WRAP_AIM_DIVISOR: f32 = 1.5;

    /// Asteroid radii by class
    pub const LARGE_ASTEROID_RADIUS: f32 = 0.4;
    pub const SMALL_ASTEROID_RADIUS: f32 = 0.2;
    pub const TINY_ASTEROID_RADIUS: f32 = 0.1;
    /// Asteroid masses by class (collision response only)
    pub const LARGE_ASTEROID_MASS: f32 = 4.0;
    pub const SMALL_ASTEROID_MASS: f32 = 2.0;
    pub const TINY_ASTEROID_MASS: f32 = 1.0;

    /// Enemy craft radii and masses
    pub const LARGE_UFO_RADIUS: f32 = 0.25;
    pub const SMALL_UFO_RADIUS: f32 = 0.15;
    pub const LARGE_UFO_MASS: f32 = 2.0;
    pub const SMALL_UFO_MASS: f32 = 1.0;
    /// Sensor sphere around each craft, as a multiple of its hull radius
    pub const UFO_SENSOR_FACTOR: f32 = 4.0;

    /// Player ship
    pub const SHIP_RADIUS: f32 = 0.15;
    pub const SHIP_MAX_SPEED: f32 = 0.75;
    /// Time for thrust to take the ship from rest to max speed
    pub const THRUST_PICKUP_SECS: f32 = 0.6;
    /// Reverse thrust takes this many pickup intervals to stop the ship
    pub const REVERSE_THRUST_FACTOR: f32 = 2.5;
    /// Below this speed the ship is considered stopped
    pub const STOP_EPSILON: f32 = 0.005;
    /// Pitch/yaw rate at full stick deflection (radians/sec)
    pub const PITCH_YAW_RATE: f32 = std::f32::consts::FRAC_PI_2;

    /// Pool capacities
    pub const LARGE_ASTEROID_POOL: usize = 8;
    pub const SMALL_ASTEROID_POOL: usize = 16;
    pub const TINY_ASTEROID_POOL: usize = 32;
    pub const UFO_POOL: usize = 4;
    pub const UFO_SHOT_POOL: usize = 8;
    pub const GATTLER_POOL: usize = 24;
}
