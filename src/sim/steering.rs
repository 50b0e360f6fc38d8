//! Obstacle avoidance and target seeking for enemy craft
//!
//! Steering only ever changes the direction of travel. The craft's speed is
//! restored after every adjustment.

use glam::Vec3;

use super::body::Kinematics;

/// Nudges allowed in one frame before giving up and reversing
pub const MAX_AVOID_ATTEMPTS: u32 = 5;
/// Each retry pushes harder than the last
pub const AVOID_RETRY_SCALE: f32 = 1.5;

const MIN_CLOSING_SPEED: f32 = 1e-4;
const MIN_TIME_TO_CONTACT: f32 = 1e-4;

/// What steering did this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steer {
    /// No collision pending
    Clear,
    /// Velocity was nudged this many times
    Nudged(u32),
    /// Nudging failed; velocity was reversed along its dominant axis
    Reversed,
}

/// Axis index with the largest absolute component
fn dominant_axis(v: Vec3) -> usize {
    let a = v.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

/// Axis index along which the pair closes least
fn least_closing_axis(closing: Vec3) -> usize {
    let a = closing.abs();
    if a.x <= a.y && a.x <= a.z {
        0
    } else if a.y <= a.z {
        1
    } else {
        2
    }
}

/// Steer `own` around `obstacles` and towards `target` for one frame.
///
/// Obstacles whose predicted separation after this frame is still at least the
/// sum of radii are ignored. Every frame re-evaluates from scratch because either
/// heading may have changed since the last one.
pub fn steer(own: &Kinematics, speed: f32, target: Vec3, obstacles: &[Kinematics], dt: f32) -> (Vec3, Steer) {
    let mut velocity = own.velocity;
    let mut attempts = 0;
    let mut outcome = Steer::Clear;

    'scan: loop {
        for obstacle in obstacles {
            let own_next = own.position + velocity * dt;
            let other_next = obstacle.position + obstacle.velocity * dt;
            let reach = own.radius + obstacle.radius;
            let away = own_next - other_next;
            let separation = away.length();
            if separation >= reach {
                continue;
            }

            attempts += 1;
            if attempts > MAX_AVOID_ATTEMPTS {
                let axis = dominant_axis(velocity);
                velocity[axis] = -velocity[axis];
                outcome = Steer::Reversed;
                break 'scan;
            }

            // Per-axis closing rate: positive components bring the pair together
            let towards = (-away).normalize_or_zero();
            let relative = velocity - obstacle.velocity;
            let closing = relative * towards;
            let axis = least_closing_axis(closing);

            let gap = (own.position - obstacle.position).length() - reach;
            let closing_speed = relative.dot(towards).max(MIN_CLOSING_SPEED);
            let time_to_contact = (gap / closing_speed).max(dt).max(MIN_TIME_TO_CONTACT);
            let overlap = reach - separation;
            let nudge = overlap / time_to_contact * AVOID_RETRY_SCALE.powi(attempts as i32);

            let sign = if away[axis] < 0.0 { -1.0 } else { 1.0 };
            velocity[axis] += sign * nudge;
            outcome = Steer::Nudged(attempts);
            continue 'scan;
        }
        break;
    }

    let to_target = target - own.position;
    let distance = to_target.length();
    if obstacles.is_empty() && distance > 0.0 && speed > 0.0 {
        let desired = to_target / distance * speed;
        let blend = (dt / (distance / speed)).min(1.0);
        velocity = velocity.lerp(desired, blend);
    }

    let direction = velocity.normalize_or_zero();
    let direction = if direction == Vec3::ZERO {
        own.velocity.normalize_or_zero()
    } else {
        direction
    };
    (direction * speed, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kin(position: Vec3, velocity: Vec3, radius: f32) -> Kinematics {
        Kinematics {
            position,
            velocity,
            radius,
        }
    }

    #[test]
    fn test_distant_obstacle_is_ignored() {
        let own = kin(Vec3::ZERO, Vec3::X, 0.2);
        let rock = kin(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO, 0.4);
        let (v, outcome) = steer(&own, 1.0, Vec3::new(5.0, 0.0, 0.0), &[rock], 0.01);
        assert_eq!(outcome, Steer::Clear);
        assert!((v - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_pending_collision_changes_heading_not_speed() {
        let own = kin(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.05), 0.2);
        let rock = kin(Vec3::new(0.55, 0.0, 0.0), Vec3::ZERO, 0.4);
        let (v, outcome) = steer(&own, 1.0, Vec3::new(5.0, 0.0, 0.0), &[rock], 0.1);
        assert_ne!(outcome, Steer::Clear);
        assert!((v.length() - 1.0).abs() < 1e-5);
        assert!((v - own.velocity.normalize()).length() > 1e-3);
    }

    #[test]
    fn test_hopeless_overlap_reverses() {
        // A fast crossing obstacle barely closes along the line between centres,
        // so each nudge is tiny and the predicted overlap never clears
        let own = kin(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.5), 0.5);
        let rock = kin(Vec3::new(0.9, 1.0, 0.0), Vec3::new(0.0, -100.0, 0.0), 0.5);
        let (v, outcome) = steer(&own, 0.5, Vec3::new(0.0, 0.0, 5.0), &[rock], 0.01);
        assert_eq!(outcome, Steer::Reversed);
        assert!(v.z < 0.0);
        assert!((v.length() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_seeks_target_without_obstacles() {
        let own = kin(Vec3::ZERO, Vec3::X, 0.2);
        let target = Vec3::new(0.0, 1.0, 0.0);
        let (v, outcome) = steer(&own, 1.0, target, &[], 0.1);
        assert_eq!(outcome, Steer::Clear);
        assert!(v.y > 0.0);
        assert!((v.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_close_target_is_reached_in_one_blend() {
        let own = kin(Vec3::ZERO, Vec3::X, 0.2);
        let target = Vec3::new(0.0, 0.0, 0.01);
        let (v, _) = steer(&own, 1.0, target, &[], 0.1);
        assert!((v - Vec3::Z).length() < 1e-5);
    }
}
