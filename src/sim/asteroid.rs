//! Asteroid field: spawning, speed ramp, wrap tracking, splitting

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::{Body, Kinematics};
use super::collision::{Collider, EntityRef, Layer, momentum_swap};
use super::geom::{random_unit_vector, uniform};
use super::pool::{Handle, Pool, Poolable};
use super::signal::CompletionSignal;
use super::spaceship::PlayerView;
use super::state::{GameEvent, SimContext};
use super::targeting::intercept_point;
use crate::consts::*;
use crate::tuning::{AsteroidClassConfig, AsteroidWave};

/// Asteroid size classes, largest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AsteroidSize {
    Large,
    Small,
    Tiny,
}

impl AsteroidSize {
    pub const ALL: [AsteroidSize; 3] = [AsteroidSize::Large, AsteroidSize::Small, AsteroidSize::Tiny];

    /// Class produced when this one splits; tiny asteroids don't split
    pub fn next_smaller(self) -> Option<Self> {
        match self {
            AsteroidSize::Large => Some(AsteroidSize::Small),
            AsteroidSize::Small => Some(AsteroidSize::Tiny),
            AsteroidSize::Tiny => None,
        }
    }

    pub fn radius(self) -> f32 {
        match self {
            AsteroidSize::Large => LARGE_ASTEROID_RADIUS,
            AsteroidSize::Small => SMALL_ASTEROID_RADIUS,
            AsteroidSize::Tiny => TINY_ASTEROID_RADIUS,
        }
    }

    pub fn mass(self) -> f32 {
        match self {
            AsteroidSize::Large => LARGE_ASTEROID_MASS,
            AsteroidSize::Small => SMALL_ASTEROID_MASS,
            AsteroidSize::Tiny => TINY_ASTEROID_MASS,
        }
    }

    /// Score for destroying one
    pub fn points(self) -> u32 {
        match self {
            AsteroidSize::Large => 20,
            AsteroidSize::Small => 50,
            AsteroidSize::Tiny => 100,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn pool_name(self) -> &'static str {
        match self {
            AsteroidSize::Large => "large asteroid",
            AsteroidSize::Small => "small asteroid",
            AsteroidSize::Tiny => "tiny asteroid",
        }
    }

    fn pool_capacity(self) -> usize {
        match self {
            AsteroidSize::Large => LARGE_ASTEROID_POOL,
            AsteroidSize::Small => SMALL_ASTEROID_POOL,
            AsteroidSize::Tiny => TINY_ASTEROID_POOL,
        }
    }
}

/// Pool class plus slot handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AsteroidId {
    pub size: AsteroidSize,
    pub handle: Handle,
}

/// Linear speed ramp measured from level start
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeedRamp {
    pub min: f32,
    pub max: f32,
    pub ramp_secs: f32,
}

impl SpeedRamp {
    pub fn from_config(cfg: &AsteroidClassConfig) -> Self {
        Self {
            min: cfg.speed,
            max: cfg.max_speed,
            ramp_secs: cfg.ramp_secs,
        }
    }

    /// Ramp speed `level_time` seconds into the level, clamped to max
    pub fn speed_at(&self, level_time: f32) -> f32 {
        if self.ramp_secs <= 0.0 {
            return self.max;
        }
        let t = (level_time / self.ramp_secs).clamp(0.0, 1.0);
        self.min + (self.max - self.min) * t
    }

    /// Acceleration that follows the ramp
    pub fn acceleration(&self) -> f32 {
        if self.ramp_secs <= 0.0 {
            return f32::INFINITY;
        }
        (self.max - self.min) / self.ramp_secs
    }
}

#[derive(Debug, Clone, Default)]
pub struct Asteroid {
    pub serial: u32,
    pub body: Body,
    pub hits: u32,
    /// Probability of leading the player after a wrap
    pub accuracy: f32,
    pub mass: f32,
    pub ramp: SpeedRamp,
}

impl Poolable for Asteroid {
    fn reset(&mut self) {
        self.body.deactivate();
        self.hits = 0;
    }
}

/// Outcome of a hit on an asteroid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsteroidHit {
    /// The asteroid was already gone
    Missed,
    /// Hit but still has hits left
    Damaged,
    Destroyed,
    /// Destroyed the last asteroid and resolved the wave signal
    Cleared,
}

/// All asteroids in play
#[derive(Debug)]
pub struct Asteroids {
    pools: [Pool<Asteroid>; 3],
    active: Vec<AsteroidId>,
    wave: Option<AsteroidWave>,
    cleared: Option<CompletionSignal>,
}

impl Default for Asteroids {
    fn default() -> Self {
        Self::new()
    }
}

impl Asteroids {
    pub fn new() -> Self {
        let pool = |size: AsteroidSize| Pool::new(size.pool_name(), size.pool_capacity());
        Self {
            pools: AsteroidSize::ALL.map(pool),
            active: Vec::new(),
            wave: None,
            cleared: None,
        }
    }

    /// Return every asteroid to its pool and forget the current wave
    pub fn reset(&mut self) {
        for id in self.active.drain(..) {
            self.pools[id.size.index()].release(id.handle);
        }
        self.wave = None;
        self.cleared = None;
    }

    pub fn new_game(&mut self) {
        self.reset();
    }

    /// Repopulate the large class and arm `cleared` for when the field empties.
    ///
    /// Returns true if the field was empty from the start and `cleared` resolved.
    pub fn start_level(&mut self, ctx: &mut SimContext, wave: &AsteroidWave, cleared: CompletionSignal) -> bool {
        self.reset();
        self.wave = Some(*wave);

        let radius = ctx.playspace.radius;
        for _ in 0..wave.large.count {
            let position = random_unit_vector(&mut ctx.rng, radius * 0.9);
            let aim = ctx.playspace.random_interior_point(&mut ctx.rng, 0.5);
            let heading = (aim - position).normalize_or_zero();
            let speed = SpeedRamp::from_config(&wave.large).speed_at(ctx.level_time);
            self.spawn(ctx, AsteroidSize::Large, position, heading * speed);
        }
        log::info!("Asteroid wave started with {} large", self.active.len());

        if self.active.is_empty() {
            return cleared.resolve();
        }
        self.cleared = Some(cleared);
        false
    }

    /// Take an asteroid from its pool; `None` when the pool is exhausted
    pub fn spawn(
        &mut self,
        ctx: &mut SimContext,
        size: AsteroidSize,
        position: Vec3,
        velocity: Vec3,
    ) -> Option<AsteroidId> {
        let cfg = *self.wave.as_ref()?.class(size);
        let Some(handle) = self.pools[size.index()].request() else {
            log::trace!("{} spawn skipped", size.pool_name());
            return None;
        };

        let serial = ctx.next_id();
        let rotation_axis = random_unit_vector(&mut ctx.rng, 1.0);
        let asteroid = self.pools[size.index()].live_mut(handle);
        asteroid.serial = serial;
        asteroid.body.radius = size.radius();
        asteroid.body.activate(position, velocity);
        asteroid.body.rotation_axis = rotation_axis;
        asteroid.body.angular_speed = cfg.rotation.to_radians();
        asteroid.hits = cfg.hits;
        asteroid.accuracy = cfg.accuracy;
        asteroid.mass = size.mass();
        asteroid.ramp = SpeedRamp::from_config(&cfg);

        let id = AsteroidId { size, handle };
        self.active.push(id);
        log::debug!("Spawned {} #{serial}", size.pool_name());
        Some(id)
    }

    /// Advance every asteroid by one frame
    pub fn update(&mut self, ctx: &mut SimContext, player: &PlayerView, dt: f32) {
        let playspace = ctx.playspace;
        let level_time = ctx.level_time;

        for id in &self.active {
            let asteroid = self.pools[id.size.index()].live_mut(id.handle);
            let body = &mut asteroid.body;

            let ramp_speed = asteroid.ramp.speed_at(level_time);
            let speed = body.speed();
            if speed < ramp_speed {
                let next = (speed + asteroid.ramp.acceleration() * dt).min(ramp_speed);
                let dir = body.velocity.normalize_or_zero();
                if dir != Vec3::ZERO {
                    body.velocity = dir * next;
                }
            }

            body.integrate(dt);

            if body.is_outside(&playspace) {
                let jitter = uniform(&mut ctx.rng, 0.0, MAX_WRAP_JITTER);
                let accuracy = asteroid.accuracy;
                let speed = body.speed();
                let rng = &mut ctx.rng;
                body.wrap(&playspace, jitter, |from| {
                    if player.visible && rng.random::<f32>() < accuracy {
                        if let Some((_, lead)) =
                            intercept_point(from, Vec3::ZERO, player.position, player.velocity, speed)
                        {
                            return lead;
                        }
                    }
                    playspace.random_interior_point(rng, 1.0 / WRAP_AIM_DIVISOR)
                });
            }

            body.update_visibility(&playspace);
        }
    }

    /// Register a hit. On the last hit the asteroid splits into the next class.
    pub fn hit(&mut self, ctx: &mut SimContext, id: AsteroidId, by_player: bool) -> AsteroidHit {
        let pool = &mut self.pools[id.size.index()];
        let Some(asteroid) = pool.get_mut(id.handle) else {
            return AsteroidHit::Missed;
        };
        asteroid.hits = asteroid.hits.saturating_sub(1);
        if asteroid.hits > 0 {
            return AsteroidHit::Damaged;
        }

        let position = asteroid.body.position;
        let parent_speed = asteroid.body.speed();
        let serial = asteroid.serial;
        if let Some(idx) = self.active.iter().position(|a| *a == id) {
            self.active.remove(idx);
        }
        pool.release(id.handle);

        log::debug!("Destroyed {} #{serial}", id.size.pool_name());
        ctx.events.push(GameEvent::AsteroidDestroyed {
            size: id.size,
            position,
            by_player,
        });

        if let Some(child) = id.size.next_smaller() {
            self.split(ctx, child, position, parent_speed);
        }

        if self.active.is_empty() {
            if let Some(signal) = self.cleared.take() {
                if signal.resolve() {
                    return AsteroidHit::Cleared;
                }
            }
        }
        AsteroidHit::Destroyed
    }

    /// Scatter the child class outward from `position` in opposing pairs
    fn split(&mut self, ctx: &mut SimContext, child: AsteroidSize, position: Vec3, parent_speed: f32) {
        let Some(wave) = self.wave else {
            return;
        };
        let cfg = wave.class(child);
        let ramp = SpeedRamp::from_config(cfg);
        // Children keep the parent's pace but stay inside their own class band
        let speed = parent_speed.max(ramp.speed_at(ctx.level_time)).min(ramp.max);

        let mut dir = Vec3::Z;
        for i in 0..cfg.count {
            if i % 2 == 0 {
                dir = random_unit_vector(&mut ctx.rng, 1.0);
            } else {
                dir = -dir;
            }
            let at = position + dir * child.radius();
            self.spawn(ctx, child, at, dir * speed);
        }
    }

    /// Momentum-swap two colliding asteroids, then clamp both back into the
    /// current speed band of their class
    pub fn collision(&mut self, ctx: &mut SimContext, a: AsteroidId, b: AsteroidId) {
        if a == b {
            return;
        }
        let (Some(first), Some(second)) = (self.get(a), self.get(b)) else {
            return;
        };
        let (va, vb) = momentum_swap(first.body.velocity, first.mass, second.body.velocity, second.mass);

        for (id, velocity) in [(a, va), (b, vb)] {
            let level_time = ctx.level_time;
            let asteroid = self.pools[id.size.index()].live_mut(id.handle);
            let min = asteroid.ramp.min;
            let max = asteroid.ramp.speed_at(level_time).max(min);
            let speed = velocity.length();
            let dir = if speed > 0.0 {
                velocity / speed
            } else {
                random_unit_vector(&mut ctx.rng, 1.0)
            };
            asteroid.body.velocity = dir * speed.clamp(min, max);
        }
    }

    pub fn get(&self, id: AsteroidId) -> Option<&Asteroid> {
        self.pools[id.size.index()].get(id.handle)
    }

    pub fn is_live(&self, id: AsteroidId) -> bool {
        self.pools[id.size.index()].is_live(id.handle)
    }

    pub fn kinematics(&self, id: AsteroidId) -> Option<Kinematics> {
        self.get(id).map(|a| a.body.kinematics())
    }

    /// Active asteroids in spawn order
    pub fn ids(&self) -> &[AsteroidId] {
        &self.active
    }

    pub fn iter(&self) -> impl Iterator<Item = (AsteroidId, &Asteroid)> {
        self.active
            .iter()
            .map(|id| (*id, self.pools[id.size.index()].live(id.handle)))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn free_count(&self, size: AsteroidSize) -> usize {
        self.pools[size.index()].free_count()
    }

    /// Visible asteroids as contact colliders
    pub fn colliders(&self, out: &mut Vec<(Collider, Kinematics)>) {
        for (id, asteroid) in self.iter() {
            if asteroid.body.visible {
                out.push((
                    Collider::new(Layer::Asteroid, EntityRef::Asteroid(id)),
                    asteroid.body.kinematics(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::LevelTable;

    fn setup() -> (SimContext, Asteroids, AsteroidWave) {
        let ctx = SimContext::new(11, 4.0);
        let wave = LevelTable::standard().level(1).unwrap().asteroids;
        (ctx, Asteroids::new(), wave)
    }

    #[test]
    fn test_ramp_is_measured_from_level_start() {
        let ramp = SpeedRamp {
            min: 0.1,
            max: 0.3,
            ramp_secs: 10.0,
        };
        assert_eq!(ramp.speed_at(0.0), 0.1);
        assert!((ramp.speed_at(5.0) - 0.2).abs() < 1e-6);
        assert_eq!(ramp.speed_at(20.0), 0.3);
    }

    #[test]
    fn test_late_spawn_starts_at_ramp_speed() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 1;
        wave.large.ramp_secs = 10.0;
        ctx.level_time = 5.0;
        field.start_level(&mut ctx, &wave, CompletionSignal::new("test"));
        let (_, rock) = field.iter().next().unwrap();
        let expected = SpeedRamp::from_config(&wave.large).speed_at(5.0);
        assert!((rock.body.speed() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_split_cascade_resolves_once() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 1;
        wave.small.count = 2;
        wave.tiny.count = 2;
        let signal = CompletionSignal::new("asteroids");
        field.start_level(&mut ctx, &wave, signal.clone());

        let large = field.ids()[0];
        assert_eq!(field.hit(&mut ctx, large, true), AsteroidHit::Destroyed);
        assert_eq!(field.len(), 2);
        assert!(field.ids().iter().all(|id| id.size == AsteroidSize::Small));

        let mut last = AsteroidHit::Missed;
        while let Some(&id) = field.ids().first() {
            last = field.hit(&mut ctx, id, true);
        }
        assert_eq!(last, AsteroidHit::Cleared);
        assert!(signal.is_resolved());
        // 1 large, 2 small, 4 tiny
        let destroyed = ctx
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::AsteroidDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 7);
        for size in AsteroidSize::ALL {
            assert_eq!(field.free_count(size), size.pool_capacity());
        }
    }

    #[test]
    fn test_stale_hit_is_ignored() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 2;
        field.start_level(&mut ctx, &wave, CompletionSignal::new("test"));
        let id = field.ids()[0];
        field.hit(&mut ctx, id, true);
        assert_eq!(field.hit(&mut ctx, id, true), AsteroidHit::Missed);
    }

    #[test]
    fn test_multi_hit_asteroid() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 1;
        wave.large.hits = 2;
        field.start_level(&mut ctx, &wave, CompletionSignal::new("test"));
        let id = field.ids()[0];
        assert_eq!(field.hit(&mut ctx, id, false), AsteroidHit::Damaged);
        assert_eq!(field.hit(&mut ctx, id, false), AsteroidHit::Destroyed);
    }

    #[test]
    fn test_empty_wave_resolves_immediately() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 0;
        let signal = CompletionSignal::new("test");
        assert!(field.start_level(&mut ctx, &wave, signal.clone()));
        assert!(signal.is_resolved());
    }

    #[test]
    fn test_collision_clamps_to_band() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 2;
        wave.large.speed = 0.1;
        wave.large.max_speed = 0.2;
        wave.large.ramp_secs = 0.0;
        field.start_level(&mut ctx, &wave, CompletionSignal::new("test"));
        let (a, b) = (field.ids()[0], field.ids()[1]);
        field.collision(&mut ctx, a, b);
        for id in [a, b] {
            let speed = field.get(id).unwrap().body.speed();
            assert!((0.1 - 1e-5..=0.2 + 1e-5).contains(&speed));
        }
    }

    #[test]
    fn test_wrapped_asteroid_stays_in_band() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 1;
        field.start_level(&mut ctx, &wave, CompletionSignal::new("test"));
        let id = field.ids()[0];
        {
            let rock = field.pools[0].live_mut(id.handle);
            rock.body.position = Vec3::new(3.99, 0.0, 0.0);
            rock.body.velocity = Vec3::new(0.3, 0.0, 0.0);
        }
        let player = PlayerView::default();
        field.update(&mut ctx, &player, 0.1);
        let rock = field.get(id).unwrap();
        let r = rock.body.position.length();
        assert!(r >= 4.0 && r <= 4.0 * (1.0 + MAX_WRAP_JITTER) + 1e-4);
        assert!(!rock.body.visible);
        assert!(rock.body.velocity.dot(rock.body.position) < 0.0);
    }

    #[test]
    fn test_accurate_wrap_heads_for_the_player() {
        let (mut ctx, mut field, mut wave) = setup();
        wave.large.count = 1;
        field.start_level(&mut ctx, &wave, CompletionSignal::new("test"));
        let id = field.ids()[0];
        {
            let rock = field.pools[0].live_mut(id.handle);
            rock.accuracy = 1.0;
            rock.body.position = Vec3::new(3.99, 0.0, 0.0);
            rock.body.velocity = Vec3::new(0.3, 0.0, 0.0);
        }
        let player = PlayerView {
            position: Vec3::new(0.0, 1.0, 0.0),
            velocity: Vec3::ZERO,
            radius: SHIP_RADIUS,
            visible: true,
        };
        field.update(&mut ctx, &player, 0.1);

        let rock = field.get(id).unwrap();
        assert!(rock.body.position.x < -3.99);
        let to_player = (player.position - rock.body.position).normalize();
        assert!(rock.body.velocity.normalize().dot(to_player) > 0.999);
    }
}
