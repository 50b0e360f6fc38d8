//! Enemy craft: timed launches, steering travel, gunnery and wave exhaustion

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::asteroid::{AsteroidId, Asteroids};
use super::body::{Body, Kinematics};
use super::collision::{Collider, EntityRef, Layer};
use super::geom::{random_perpendicular, random_unit_vector, uniform};
use super::pool::{Handle, Pool, Poolable};
use super::process::{Process, Step};
use super::signal::CompletionSignal;
use super::spaceship::PlayerView;
use super::state::{GameEvent, SimContext};
use super::steering::{Steer, steer};
use super::targeting::intercept_point;
use crate::consts::*;
use crate::tuning::{UfoClassConfig, UfoWave};

/// Spin about the craft's own Y axis (radians/sec)
pub const UFO_SPIN: f32 = std::f32::consts::FRAC_PI_2;
pub const UFO_SHOT_RADIUS: f32 = 0.03;
/// Wait before retrying a launch the pool couldn't serve
pub const LAUNCH_RETRY_SECS: f32 = 1.0;
/// Spawn this far inside the boundary
const SPAWN_INSET: f32 = 0.1;
/// Inaccurate shots whose offset already misses are pushed this much further out
const MISS_PENALTY: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UfoSize {
    Large,
    Small,
}

impl UfoSize {
    /// Launch order
    pub const ALL: [UfoSize; 2] = [UfoSize::Large, UfoSize::Small];

    pub fn radius(self) -> f32 {
        match self {
            UfoSize::Large => LARGE_UFO_RADIUS,
            UfoSize::Small => SMALL_UFO_RADIUS,
        }
    }

    pub fn mass(self) -> f32 {
        match self {
            UfoSize::Large => LARGE_UFO_MASS,
            UfoSize::Small => SMALL_UFO_MASS,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            UfoSize::Large => 200,
            UfoSize::Small => 1000,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn pool_name(self) -> &'static str {
        match self {
            UfoSize::Large => "large ufo",
            UfoSize::Small => "small ufo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UfoId {
    pub size: UfoSize,
    pub handle: Handle,
}

/// Something a craft's sensor has picked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Obstacle {
    Asteroid(AsteroidId),
    Ufo(UfoId),
}

#[derive(Debug, Clone, Default)]
pub struct Ufo {
    pub serial: u32,
    pub body: Body,
    /// Constant cruise speed
    pub speed: f32,
    pub hits: u32,
    pub accuracy: f32,
    pub mass: f32,
    /// Far point the craft heads for when nothing is in the way
    pub target: Vec3,
    pub obstacles: Vec<Obstacle>,
    /// The craft's one shot in flight
    pub shot: Option<Handle>,
    /// Seconds until the next firing attempt
    pub fire_in: f32,
    /// Mean interval between firing attempts is drawn from `[interval/2, interval)`
    pub fire_interval: f32,
    pub shot_speed: f32,
}

impl Poolable for Ufo {
    fn reset(&mut self) {
        self.body.deactivate();
        self.obstacles.clear();
        self.shot = None;
        self.hits = 0;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Shot {
    pub body: Body,
    pub owner: Option<UfoId>,
}

impl Poolable for Shot {
    fn reset(&mut self) {
        self.body.deactivate();
        self.owner = None;
    }
}

/// Outcome of a hit on a craft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UfoHit {
    Missed,
    Damaged,
    Destroyed,
    /// Destroyed the last craft after the level was told it is ending
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaunchStage {
    /// Draw the wait before the next launch
    Arm,
    /// Wait over, launch one craft
    Spawn,
}

/// Loop state of the launch sequence, kept between steps
#[derive(Debug, Clone, Copy)]
struct Launcher {
    class: usize,
    remaining: u32,
    stage: LaunchStage,
}

impl Launcher {
    fn idle() -> Self {
        Self {
            class: UfoSize::ALL.len(),
            remaining: 0,
            stage: LaunchStage::Arm,
        }
    }
}

#[derive(Debug)]
pub struct Ufos {
    pools: [Pool<Ufo>; 2],
    shots: Pool<Shot>,
    active: Vec<UfoId>,
    live_shots: Vec<Handle>,
    wave: Option<UfoWave>,
    launcher: Launcher,
    launch: Process,
    travel: Process,
    /// Set by `level_ending` while craft are still in flight
    exhausted: Option<CompletionSignal>,
    obstacle_scratch: Vec<Kinematics>,
}

impl Default for Ufos {
    fn default() -> Self {
        Self::new()
    }
}

impl Ufos {
    pub fn new() -> Self {
        Self {
            pools: UfoSize::ALL.map(|size| Pool::new(size.pool_name(), UFO_POOL)),
            shots: Pool::new("ufo shot", UFO_SHOT_POOL),
            active: Vec::new(),
            live_shots: Vec::new(),
            wave: None,
            launcher: Launcher::idle(),
            launch: Process::new("ufo launcher"),
            travel: Process::new("ufo traveller"),
            exhausted: None,
            obstacle_scratch: Vec::new(),
        }
    }

    /// Stop both processes and return every craft and shot to its pool
    pub fn reset(&mut self) {
        self.travel.stop();
        self.launch.stop();
        for id in self.active.drain(..) {
            self.pools[id.size.index()].release(id.handle);
        }
        for handle in self.live_shots.drain(..) {
            self.shots.release(handle);
        }
        self.launcher = Launcher::idle();
        self.wave = None;
        self.exhausted = None;
    }

    pub fn new_game(&mut self) {
        self.reset();
    }

    /// Arm the launch sequence for this level's wave
    pub fn start_level(&mut self, wave: &UfoWave) {
        self.wave = Some(*wave);
        self.exhausted = None;
        self.launcher = Launcher {
            class: 0,
            remaining: wave.class(UfoSize::ALL[0]).count,
            stage: LaunchStage::Arm,
        };
        self.launch.restart();
        log::info!(
            "Ufo wave armed: {} large, {} small",
            wave.large.count,
            wave.small.count
        );
    }

    /// The asteroids are gone. Resolve `signal` now if no craft are flying,
    /// otherwise when the last one is destroyed. Returns true if resolved now.
    pub fn level_ending(&mut self, signal: CompletionSignal) -> bool {
        if self.active.is_empty() {
            self.launch.stop();
            return signal.resolve();
        }
        log::debug!("Level ending with {} ufos in flight", self.active.len());
        self.exhausted = Some(signal);
        false
    }

    /// Advance launches, craft and shots by one frame
    pub fn update(&mut self, ctx: &mut SimContext, player: &PlayerView, asteroids: &Asteroids, dt: f32) {
        if self.launch.poll(dt) {
            let step = self.launch_step(ctx);
            self.launch.resolve(step);
        }
        if self.travel.poll(dt) {
            self.travel_step(ctx, player, asteroids, dt);
        }
        self.move_shots(ctx, dt);
    }

    /// One step of the launch sequence: for each class in order, wait
    /// `uniform(timing/2, timing)` then launch, until the class count is spent
    fn launch_step(&mut self, ctx: &mut SimContext) -> Step {
        let Some(wave) = self.wave else {
            return Step::Done;
        };
        loop {
            let Some(&size) = UfoSize::ALL.get(self.launcher.class) else {
                log::debug!("Ufo launcher finished");
                return Step::Done;
            };
            let cfg = *wave.class(size);

            if self.launcher.remaining == 0 {
                self.launcher.class += 1;
                self.launcher.stage = LaunchStage::Arm;
                if let Some(&next) = UfoSize::ALL.get(self.launcher.class) {
                    self.launcher.remaining = wave.class(next).count;
                }
                continue;
            }

            match self.launcher.stage {
                LaunchStage::Arm => {
                    self.launcher.stage = LaunchStage::Spawn;
                    return Step::Wait(uniform(&mut ctx.rng, cfg.timing / 2.0, cfg.timing));
                }
                LaunchStage::Spawn => {
                    if self.spawn(ctx, size, &cfg).is_none() {
                        return Step::Wait(LAUNCH_RETRY_SECS);
                    }
                    self.launcher.remaining -= 1;
                    self.launcher.stage = LaunchStage::Arm;
                }
            }
        }
    }

    /// Launch one craft just inside the boundary, heading inward
    pub fn spawn(&mut self, ctx: &mut SimContext, size: UfoSize, cfg: &UfoClassConfig) -> Option<UfoId> {
        let Some(handle) = self.pools[size.index()].request() else {
            log::trace!("{} launch skipped", size.pool_name());
            return None;
        };

        let radius = ctx.playspace.radius;
        let position = random_unit_vector(&mut ctx.rng, radius - SPAWN_INSET);
        let aim = random_unit_vector(&mut ctx.rng, radius / 2.0);
        let heading = (aim - position).normalize_or_zero();
        let heading = if heading == Vec3::ZERO { -position.normalize() } else { heading };
        let fire_interval = cfg.timing / cfg.shots as f32;
        let fire_in = uniform(&mut ctx.rng, fire_interval / 2.0, fire_interval);
        let serial = ctx.next_id();

        let ufo = self.pools[size.index()].live_mut(handle);
        ufo.serial = serial;
        ufo.body.radius = size.radius();
        ufo.body.activate(position, heading * cfg.speed);
        ufo.body.face(heading);
        ufo.body.rotation_axis = Vec3::Y;
        ufo.body.angular_speed = UFO_SPIN;
        ufo.speed = cfg.speed;
        ufo.hits = cfg.hits;
        ufo.accuracy = cfg.accuracy;
        ufo.mass = size.mass();
        ufo.target = position + heading * radius * 2.0;
        ufo.obstacles.clear();
        ufo.shot = None;
        ufo.fire_interval = fire_interval;
        ufo.fire_in = fire_in;
        ufo.shot_speed = cfg.speed + cfg.shot_speed;

        let id = UfoId { size, handle };
        self.active.push(id);
        self.travel.start();
        ctx.events.push(GameEvent::UfoLaunched { size });
        log::debug!("Launched {} #{serial}", size.pool_name());
        Some(id)
    }

    fn obstacle_kinematics(pools: &[Pool<Ufo>; 2], asteroids: &Asteroids, obstacle: &Obstacle) -> Option<Kinematics> {
        match obstacle {
            Obstacle::Asteroid(id) => asteroids.kinematics(*id),
            Obstacle::Ufo(id) => pools[id.size.index()].get(id.handle).map(|u| u.body.kinematics()),
        }
    }

    fn travel_step(&mut self, ctx: &mut SimContext, player: &PlayerView, asteroids: &Asteroids, dt: f32) {
        let playspace = ctx.playspace;
        let mut scratch = std::mem::take(&mut self.obstacle_scratch);

        for idx in 0..self.active.len() {
            let id = self.active[idx];

            // Drop obstacles that were destroyed since the sensor saw them
            let mut obstacles = std::mem::take(&mut self.pools[id.size.index()].live_mut(id.handle).obstacles);
            scratch.clear();
            obstacles.retain(|o| match Self::obstacle_kinematics(&self.pools, asteroids, o) {
                Some(k) => {
                    scratch.push(k);
                    true
                }
                None => false,
            });

            let ufo = self.pools[id.size.index()].live_mut(id.handle);
            ufo.obstacles = obstacles;

            let (velocity, outcome) = steer(&ufo.body.kinematics(), ufo.speed, ufo.target, &scratch, dt);
            if outcome == Steer::Reversed {
                log::trace!("ufo #{} reversed to escape", ufo.serial);
            }
            ufo.body.velocity = velocity;
            ufo.body.integrate(dt);

            if ufo.body.is_outside(&playspace) {
                let jitter = uniform(&mut ctx.rng, 0.0, MAX_WRAP_JITTER);
                let rng = &mut ctx.rng;
                ufo.body.wrap(&playspace, jitter, |_| {
                    playspace.random_interior_point(rng, 1.0 / WRAP_AIM_DIVISOR)
                });
                let heading = ufo.body.velocity.normalize_or_zero();
                ufo.target = ufo.body.position + heading * playspace.radius * 2.0;
            }
            ufo.body.update_visibility(&playspace);

            ufo.fire_in -= dt;
            if ufo.fire_in <= 0.0 {
                let interval = ufo.fire_interval;
                self.try_fire(ctx, id, player);
                let ufo = self.pools[id.size.index()].live_mut(id.handle);
                ufo.fire_in = uniform(&mut ctx.rng, interval / 2.0, interval);
            }
        }

        self.obstacle_scratch = scratch;
    }

    /// Fire at the player's intercept point. Returns false if the shot was deferred.
    fn try_fire(&mut self, ctx: &mut SimContext, id: UfoId, player: &PlayerView) -> bool {
        let ufo = self.pools[id.size.index()].live(id.handle);
        if !ufo.body.visible || !player.visible || ufo.shot.is_some() {
            return false;
        }

        let origin = ufo.body.position;
        let Some((_, mut aim)) = intercept_point(origin, Vec3::ZERO, player.position, player.velocity, ufo.shot_speed)
        else {
            log::trace!("ufo #{} has no firing solution", ufo.serial);
            return false;
        };

        if ufo.accuracy < 1.0 {
            let spread = player.radius / ufo.accuracy;
            let axis = random_perpendicular(&mut ctx.rng, aim - origin);
            let mut offset = uniform(&mut ctx.rng, 0.0, spread);
            if offset > player.radius {
                offset *= MISS_PENALTY;
            }
            aim += axis * offset;
        }

        let dir = (aim - origin).normalize_or_zero();
        if dir == Vec3::ZERO {
            return false;
        }
        let hull = ufo.body.radius;
        let shot_speed = ufo.shot_speed;

        let Some(handle) = self.shots.request() else {
            log::trace!("ufo shot skipped");
            return false;
        };
        let shot = self.shots.live_mut(handle);
        shot.body.radius = UFO_SHOT_RADIUS;
        shot.body.activate(origin + dir * (hull + UFO_SHOT_RADIUS), dir * shot_speed);
        shot.body.face(dir);
        shot.owner = Some(id);
        self.live_shots.push(handle);
        self.pools[id.size.index()].live_mut(id.handle).shot = Some(handle);
        true
    }

    fn move_shots(&mut self, ctx: &SimContext, dt: f32) {
        let mut i = 0;
        while i < self.live_shots.len() {
            let handle = self.live_shots[i];
            let shot = self.shots.live_mut(handle);
            shot.body.integrate(dt);
            if ctx.playspace.contains(shot.body.position) {
                i += 1;
            } else {
                self.remove_shot(i);
            }
        }
    }

    fn remove_shot(&mut self, idx: usize) {
        let handle = self.live_shots.remove(idx);
        if let Some(owner) = self.shots.live(handle).owner {
            if let Some(ufo) = self.pools[owner.size.index()].get_mut(owner.handle) {
                if ufo.shot == Some(handle) {
                    ufo.shot = None;
                }
            }
        }
        self.shots.release(handle);
    }

    /// A shot hit something. Panics if the shot isn't in flight.
    pub fn shooter_hit(&mut self, handle: Handle) {
        let Some(idx) = self.live_shots.iter().position(|h| *h == handle) else {
            panic!("shooter_hit: {handle:?} is not a ufo shot in flight");
        };
        self.remove_shot(idx);
    }

    pub fn is_shot_live(&self, handle: Handle) -> bool {
        self.shots.is_live(handle)
    }

    /// A gattler round struck a craft
    pub fn gattler_hit(&mut self, ctx: &mut SimContext, id: UfoId, by_player: bool) -> UfoHit {
        let Some(ufo) = self.pools[id.size.index()].get_mut(id.handle) else {
            return UfoHit::Missed;
        };
        ufo.hits = ufo.hits.saturating_sub(1);
        if ufo.hits > 0 {
            return UfoHit::Damaged;
        }

        let position = ufo.body.position;
        let serial = ufo.serial;
        if let Some(shot) = ufo.shot.take() {
            self.shots.live_mut(shot).owner = None;
        }
        if let Some(idx) = self.active.iter().position(|u| *u == id) {
            self.active.remove(idx);
        }
        self.pools[id.size.index()].release(id.handle);
        for other in &self.active {
            let ufo = self.pools[other.size.index()].live_mut(other.handle);
            ufo.obstacles.retain(|o| *o != Obstacle::Ufo(id));
        }

        log::debug!("Destroyed {} #{serial}", id.size.pool_name());
        ctx.events.push(GameEvent::UfoDestroyed {
            size: id.size,
            position,
            by_player,
        });

        if self.active.is_empty() {
            if let Some(signal) = self.exhausted.take() {
                self.travel.stop();
                self.launch.stop();
                if signal.resolve() {
                    return UfoHit::Cleared;
                }
            }
        }
        UfoHit::Destroyed
    }

    /// A craft's sensor picked up an obstacle
    pub fn start_avoid(&mut self, id: UfoId, obstacle: Obstacle) {
        if obstacle == Obstacle::Ufo(id) {
            return;
        }
        if let Some(ufo) = self.pools[id.size.index()].get_mut(id.handle) {
            if !ufo.obstacles.contains(&obstacle) {
                ufo.obstacles.push(obstacle);
            }
        }
    }

    /// An obstacle left a craft's sensor
    pub fn end_avoid(&mut self, id: UfoId, obstacle: Obstacle) {
        if let Some(ufo) = self.pools[id.size.index()].get_mut(id.handle) {
            ufo.obstacles.retain(|o| *o != obstacle);
        }
    }

    /// Forget an asteroid that has been destroyed
    pub fn forget_asteroid(&mut self, asteroid: AsteroidId) {
        for id in &self.active {
            let ufo = self.pools[id.size.index()].live_mut(id.handle);
            ufo.obstacles.retain(|o| *o != Obstacle::Asteroid(asteroid));
        }
    }

    pub fn get(&self, id: UfoId) -> Option<&Ufo> {
        self.pools[id.size.index()].get(id.handle)
    }

    pub fn is_live(&self, id: UfoId) -> bool {
        self.pools[id.size.index()].is_live(id.handle)
    }

    pub fn kinematics(&self, id: UfoId) -> Option<Kinematics> {
        self.get(id).map(|u| u.body.kinematics())
    }

    pub fn ids(&self) -> &[UfoId] {
        &self.active
    }

    pub fn iter(&self) -> impl Iterator<Item = (UfoId, &Ufo)> {
        self.active
            .iter()
            .map(|id| (*id, self.pools[id.size.index()].live(id.handle)))
    }

    pub fn shots(&self) -> impl Iterator<Item = (Handle, &Shot)> {
        self.live_shots.iter().map(|h| (*h, self.shots.live(*h)))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_launching(&self) -> bool {
        self.launch.is_active()
    }

    pub fn is_travelling(&self) -> bool {
        self.travel.is_active()
    }

    pub fn free_count(&self, size: UfoSize) -> usize {
        self.pools[size.index()].free_count()
    }

    /// Hulls and sensors of visible craft, plus every shot in flight
    pub fn colliders(&self, out: &mut Vec<(Collider, Kinematics)>) {
        for (id, ufo) in self.iter() {
            if !ufo.body.visible {
                continue;
            }
            let hull = ufo.body.kinematics();
            out.push((Collider::new(Layer::Ufo, EntityRef::Ufo(id)), hull));
            out.push((
                Collider::new(Layer::UfoSensor, EntityRef::Ufo(id)),
                Kinematics {
                    radius: hull.radius * UFO_SENSOR_FACTOR,
                    ..hull
                },
            ));
        }
        for (handle, shot) in self.shots() {
            out.push((
                Collider::new(Layer::Shooter, EntityRef::Shot(handle)),
                shot.body.kinematics(),
            ));
        }
    }

    /// Everything that could hurt the player
    pub fn threats(&self, out: &mut Vec<Kinematics>) {
        out.extend(self.iter().map(|(_, u)| u.body.kinematics()));
        out.extend(self.shots().map(|(_, s)| s.body.kinematics()));
    }
}
