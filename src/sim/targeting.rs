//! Intercept solutions for constant-speed projectiles
//!
//! Used by enemy gunners, by wrapped asteroids that lead the player, by the
//! hyperspace escape scoring and by the demo autopilot.

use glam::Vec3;

use super::geom::resolve_quadratic;

/// Separation below which the launcher is considered to already be on the target
const CONTACT_EPSILON: f32 = 1e-6;

/// Time until a projectile launched now at `speed` from `launch_pos` (moving with
/// `launch_vel`) meets a target at `target_pos` moving with `target_vel`.
///
/// Solves `(TRV·TRV − s²)·t² + 2·(TRV·RP)·t + RP·RP = 0` for the smallest positive
/// `t`, where `RP` and `TRV` are the target's position and velocity relative to the
/// launcher. Returns `None` when the target can't be reached at that speed.
pub fn time_to_intercept(
    launch_pos: Vec3,
    launch_vel: Vec3,
    target_pos: Vec3,
    target_vel: Vec3,
    speed: f32,
) -> Option<f32> {
    let rp = target_pos - launch_pos;
    let trv = target_vel - launch_vel;

    let c = rp.dot(rp);
    if c < CONTACT_EPSILON {
        return Some(0.0);
    }

    let a = trv.dot(trv) - speed * speed;
    let b = 2.0 * trv.dot(rp);

    // A tangent solution only grazes the target
    if a.abs() >= 1e-6 && b * b - 4.0 * a * c <= 0.0 {
        return None;
    }

    resolve_quadratic(a, b, c).smallest_positive()
}

/// Intercept time and the aim point in the launcher's frame.
///
/// A projectile that inherits `launch_vel` and adds `speed` towards the aim point
/// meets the target.
pub fn intercept_point(
    launch_pos: Vec3,
    launch_vel: Vec3,
    target_pos: Vec3,
    target_vel: Vec3,
    speed: f32,
) -> Option<(f32, Vec3)> {
    let t = time_to_intercept(launch_pos, launch_vel, target_pos, target_vel, speed)?;
    Some((t, target_pos + (target_vel - launch_vel) * t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_target() {
        let t = time_to_intercept(
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(0.0, 3.0, 4.0),
            Vec3::ZERO,
            2.0,
        )
        .unwrap();
        assert!((t - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_outrunning_target_has_no_solution() {
        // Target runs directly away faster than the projectile
        let t = time_to_intercept(
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            1.0,
        );
        assert_eq!(t, None);
    }

    #[test]
    fn test_crossing_target() {
        let target_pos = Vec3::new(0.0, 0.0, 4.0);
        let target_vel = Vec3::new(1.0, 0.0, 0.0);
        let speed = 2.0;
        let (t, point) = intercept_point(Vec3::ZERO, Vec3::ZERO, target_pos, target_vel, speed).unwrap();
        // Projectile covers exactly the distance to the meeting point
        assert!((point.length() - speed * t).abs() < 1e-4);
        assert!((point - (target_pos + target_vel * t)).length() < 1e-5);
    }

    #[test]
    fn test_launcher_velocity_is_relative() {
        // Launcher moving with the target: equivalent to a stationary pair
        let v = Vec3::new(0.3, -0.2, 0.1);
        let t = time_to_intercept(Vec3::ZERO, v, Vec3::new(2.0, 0.0, 0.0), v, 1.0).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_coincident_positions() {
        assert_eq!(
            time_to_intercept(Vec3::ONE, Vec3::ZERO, Vec3::ONE, Vec3::X, 1.0),
            Some(0.0)
        );
    }
}
