//! Fixed timestep simulation tick
//!
//! Advances every system by one frame in a fixed order: ship, asteroids,
//! enemy craft, then the contact pass.

use glam::Vec3;

use super::body::Kinematics;
use super::spaceship::GATTLER_MUZZLE_SPEED;
use super::state::{GamePhase, GameState};
use super::targeting::intercept_point;

/// Aim is good enough to fire when the target is within this cone (cosine)
const AUTOPILOT_FIRE_CONE: f32 = 0.95;
/// Stick gain from local aim offset to pitch/yaw
const AUTOPILOT_GAIN: f32 = 4.0;
/// Close in on targets further than this
const AUTOPILOT_STANDOFF: f32 = 1.5;
/// Jump when a threat is this close to the hull
const AUTOPILOT_PANIC_GAP: f32 = 0.5;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Accelerate along the heading
    pub thrust: bool,
    /// Hold to keep the gattler firing
    pub fire: bool,
    /// Stick deflection in [-1, 1]; positive turns the nose towards local +Y
    pub pitch: f32,
    /// Stick deflection in [-1, 1]; positive turns the nose towards local +X
    pub yaw: f32,
    /// Engage hyperspace (ignored while cooling down)
    pub hyperspace: bool,
    /// Demo mode - the ship flies itself
    pub autopilot: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    match state.phase {
        GamePhase::Playing | GamePhase::LevelCleared => {}
        GamePhase::Idle | GamePhase::Complete => return,
    }

    state.time_ticks += 1;
    state.ctx.level_time += dt;

    let mut threats = std::mem::take(&mut state.threat_scratch);
    state.collect_threats(&mut threats);

    let input = if input.autopilot {
        autopilot(state, &threats)
    } else {
        input.clone()
    };

    state.ship.update(&mut state.ctx, &input, &threats, dt);
    state.threat_scratch = threats;

    let player = state.ship.view();
    state.asteroids.update(&mut state.ctx, &player, dt);
    state.ufos.update(&mut state.ctx, &player, &state.asteroids, dt);

    if state.settings.detect_contacts {
        state.detect_contacts();
    }
    state.settle_waves();
}

/// Point at the nearest threat, lead it, and fire once lined up
pub fn autopilot(state: &GameState, threats: &[Kinematics]) -> TickInput {
    let ship = &state.ship.body;
    let mut input = TickInput::default();

    let nearest = threats.iter().min_by(|a, b| {
        let da = a.position.distance_squared(ship.position);
        let db = b.position.distance_squared(ship.position);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
    let Some(target) = nearest else {
        return input;
    };

    let gap = target.position.distance(ship.position) - target.radius - ship.radius;
    if gap < AUTOPILOT_PANIC_GAP && state.ship.cooldown <= 0.0 {
        input.hyperspace = true;
        return input;
    }

    let aim = intercept_point(
        ship.position,
        ship.velocity,
        target.position,
        target.velocity,
        GATTLER_MUZZLE_SPEED,
    )
    .map_or(target.position, |(_, point)| point);

    let local = (ship.orientation.inverse() * (aim - ship.position)).normalize_or_zero();
    if local == Vec3::ZERO {
        return input;
    }
    input.yaw = (local.x * AUTOPILOT_GAIN).clamp(-1.0, 1.0);
    input.pitch = (local.y * AUTOPILOT_GAIN).clamp(-1.0, 1.0);
    // Directly behind: swing round rather than sit on the singularity
    if local.z < 0.0 && local.x.abs() < 0.1 {
        input.yaw = 1.0;
    }
    input.fire = local.z > AUTOPILOT_FIRE_CONE;
    input.thrust = input.fire && gap > AUTOPILOT_STANDOFF;
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::state::{GameEvent, LevelStart};

    fn playing(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        state.new_game();
        assert_eq!(state.next_level(), LevelStart::Started(1));
        state
    }

    #[test]
    fn test_idle_state_does_not_advance() {
        let mut state = GameState::new(1);
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_level_clock_advances() {
        let mut state = playing(1);
        for _ in 0..90 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.time_ticks, 90);
        assert!((state.ctx.level_time - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_same_seed_same_run() {
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        let mut a = playing(42);
        let mut b = playing(42);
        for _ in 0..600 {
            tick(&mut a, &input, SIM_DT);
            tick(&mut b, &input, SIM_DT);
        }
        assert_eq!(a.score, b.score);
        assert_eq!(a.ship.body.position, b.ship.body.position);
        assert_eq!(a.asteroids.len(), b.asteroids.len());
        assert_eq!(a.drain_events(), b.drain_events());
    }

    #[test]
    fn test_bodies_stay_near_the_playspace() {
        let mut state = playing(9);
        let limit = state.ctx.playspace.radius * 1.2;
        for _ in 0..900 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            for (_, rock) in state.asteroids.iter() {
                assert!(rock.body.position.length() < limit);
            }
            for (_, ufo) in state.ufos.iter() {
                assert!(ufo.body.position.length() < limit);
            }
        }
    }

    #[test]
    fn test_autopilot_turns_towards_target() {
        let state = playing(3);
        let threats = [Kinematics {
            position: Vec3::new(2.0, 0.0, 0.5),
            velocity: Vec3::ZERO,
            radius: 0.2,
        }];
        let input = autopilot(&state, &threats);
        assert!(input.yaw > 0.0);
        assert!(!input.fire);
        assert!(!input.hyperspace);
    }

    #[test]
    fn test_autopilot_fires_when_lined_up() {
        let state = playing(3);
        let threats = [Kinematics {
            position: Vec3::new(0.0, 0.0, 2.0),
            velocity: Vec3::ZERO,
            radius: 0.2,
        }];
        let input = autopilot(&state, &threats);
        assert!(input.fire);
        assert!(input.yaw.abs() < 1e-3);
    }

    #[test]
    fn test_autopilot_jumps_when_crowded() {
        let state = playing(3);
        let threats = [Kinematics {
            position: Vec3::new(0.0, 0.0, 0.4),
            velocity: Vec3::ZERO,
            radius: 0.1,
        }];
        assert!(autopilot(&state, &threats).hyperspace);
    }

    #[test]
    fn test_events_drain_once() {
        let mut state = playing(5);
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.drain_events().contains(&GameEvent::LevelStarted { level: 1 }));
        assert!(state.drain_events().is_empty());
    }
}
