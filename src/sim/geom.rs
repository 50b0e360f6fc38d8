//! Vector helpers and the quadratic solver

use glam::Vec3;
use rand::Rng;

/// Coefficients smaller than this are treated as zero
const EPSILON: f32 = 1e-6;

/// Sample a direction by drawing each axis from [-1, 1] and normalizing, scaled to `length`.
///
/// Not uniform over the sphere (corners are favoured) which is fine for gameplay.
pub fn random_unit_vector(rng: &mut impl Rng, length: f32) -> Vec3 {
    let v = Vec3::new(
        uniform(rng, -1.0, 1.0),
        uniform(rng, -1.0, 1.0),
        uniform(rng, -1.0, 1.0),
    );
    let dir = v.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Vec3::Y * length;
    }
    dir * length
}

/// Uniform float in `[lo, hi)`; returns `lo` when the range is empty
pub fn uniform(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    lo + (hi - lo) * rng.random::<f32>()
}

/// A unit vector perpendicular to `dir`, rotated by a random angle around it
pub fn random_perpendicular(rng: &mut impl Rng, dir: Vec3) -> Vec3 {
    let axis = dir.normalize_or_zero();
    if axis == Vec3::ZERO {
        return random_unit_vector(rng, 1.0);
    }
    let base = axis.any_orthonormal_vector();
    let angle = uniform(rng, 0.0, std::f32::consts::TAU);
    glam::Quat::from_axis_angle(axis, angle) * base
}

/// Real roots of `a·x² + b·x + c = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Roots {
    None,
    One(f32),
    Two(f32, f32),
}

impl Roots {
    /// Combine the roots with `f`; a single root is returned unchanged
    pub fn reduce(self, f: impl Fn(f32, f32) -> f32) -> Option<f32> {
        match self {
            Roots::None => None,
            Roots::One(x) => Some(x),
            Roots::Two(x, y) => Some(f(x, y)),
        }
    }

    pub fn max(self) -> Option<f32> {
        self.reduce(f32::max)
    }

    /// Smallest strictly positive root
    pub fn smallest_positive(self) -> Option<f32> {
        match self {
            Roots::None => None,
            Roots::One(x) => (x > 0.0).then_some(x),
            Roots::Two(x, y) => match (x > 0.0, y > 0.0) {
                (true, true) => Some(x.min(y)),
                (true, false) => Some(x),
                (false, true) => Some(y),
                (false, false) => None,
            },
        }
    }
}

/// Solve `a·x² + b·x + c = 0`.
///
/// With `a ≈ 0` the equation is solved as linear so nothing divides by zero.
pub fn resolve_quadratic(a: f32, b: f32, c: f32) -> Roots {
    if a.abs() < EPSILON {
        if b.abs() < EPSILON {
            return Roots::None;
        }
        return Roots::One(-c / b);
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        Roots::None
    } else if disc == 0.0 {
        Roots::One(-b / (2.0 * a))
    } else {
        let root = disc.sqrt();
        Roots::Two((-b + root) / (2.0 * a), (-b - root) / (2.0 * a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_two_roots() {
        assert_eq!(resolve_quadratic(1.0, 0.0, -4.0), Roots::Two(2.0, -2.0));
        assert_eq!(resolve_quadratic(1.0, 0.0, -4.0).max(), Some(2.0));
    }

    #[test]
    fn test_no_roots() {
        assert_eq!(resolve_quadratic(1.0, 0.0, 4.0), Roots::None);
        assert_eq!(resolve_quadratic(1.0, 0.0, 4.0).max(), None);
    }

    #[test]
    fn test_single_root() {
        assert_eq!(resolve_quadratic(1.0, -4.0, 4.0), Roots::One(2.0));
    }

    #[test]
    fn test_linear_fallback() {
        assert_eq!(resolve_quadratic(0.0, 2.0, -4.0), Roots::One(2.0));
        assert_eq!(resolve_quadratic(0.0, 0.0, 1.0), Roots::None);
    }

    #[test]
    fn test_smallest_positive() {
        assert_eq!(Roots::Two(3.0, 1.0).smallest_positive(), Some(1.0));
        assert_eq!(Roots::Two(-3.0, 1.0).smallest_positive(), Some(1.0));
        assert_eq!(Roots::Two(-3.0, -1.0).smallest_positive(), None);
        assert_eq!(Roots::One(0.0).smallest_positive(), None);
    }

    #[test]
    fn test_random_unit_vector_length() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            let v = random_unit_vector(&mut rng, 2.5);
            assert!((v.length() - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_random_perpendicular() {
        let mut rng = Pcg32::seed_from_u64(3);
        let dir = Vec3::new(1.0, 2.0, -0.5);
        for _ in 0..50 {
            let p = random_perpendicular(&mut rng, dir);
            assert!(p.dot(dir).abs() < 1e-4);
            assert!((p.length() - 1.0).abs() < 1e-4);
        }
    }
}
