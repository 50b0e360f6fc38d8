//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (activation order within each pool)
//! - No rendering or platform dependencies

pub mod asteroid;
pub mod body;
pub mod collision;
pub mod contacts;
pub mod geom;
pub mod playspace;
pub mod pool;
pub mod process;
pub mod signal;
pub mod spaceship;
pub mod state;
pub mod steering;
pub mod targeting;
pub mod tick;
pub mod ufo;

pub use asteroid::{AsteroidHit, AsteroidId, AsteroidSize, Asteroids};
pub use body::{Body, Kinematics};
pub use collision::{Collider, Contact, ContactTable, EntityRef, Layer, momentum_swap};
pub use playspace::Playspace;
pub use pool::{Handle, Pool, Poolable};
pub use signal::{CompletionSignal, SignalState, WaveSignals};
pub use spaceship::{PlayerView, Spaceship};
pub use state::{GameEvent, GamePhase, GameState, LevelStart, SimContext};
pub use steering::{Steer, steer};
pub use targeting::{intercept_point, time_to_intercept};
pub use tick::{TickInput, tick};
pub use ufo::{Obstacle, UfoHit, UfoId, UfoSize, Ufos};
