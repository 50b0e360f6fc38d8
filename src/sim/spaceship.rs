//! Player ship: thrust, pitch/yaw, gattler rounds and the hyperspace escape

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::body::{Body, Kinematics};
use super::collision::{Collider, EntityRef, Layer};
use super::pool::{Handle, Pool, Poolable};
use super::process::{Process, Step};
use super::state::{GameEvent, SimContext};
use super::targeting::time_to_intercept;
use super::tick::TickInput;
use crate::consts::*;

/// Gattler cadence (rounds per second)
pub const GATTLER_RATE: f32 = 5.0;
/// Rounds leave the ship this far beyond its hull
pub const GATTLER_ROUND_OFFSET: f32 = 0.035;
/// Round speed on top of the ship's own velocity
pub const GATTLER_MUZZLE_SPEED: f32 = SHIP_MAX_SPEED * 2.0;
pub const GATTLER_ROUND_RADIUS: f32 = 0.02;

/// Frames spent stretching out (and back in) during hyperspace
pub const WARP_FRAMES: u32 = 12;
/// Peak stretch along the ship's heading
pub const WARP_MAX_SCALE: f32 = 3.0;
/// Time spent out of the playspace between warps
pub const HYPERSPACE_HIDDEN_SECS: f32 = 0.4;
pub const HYPERSPACE_COOLDOWN_SECS: f32 = 5.0;
/// Random exit points considered per jump
pub const HYPERSPACE_CANDIDATES: usize = 8;
/// Exit points are drawn within this fraction of the playspace radius
pub const HYPERSPACE_RANGE: f32 = 0.6;

/// What other systems may read about the player
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerView {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    /// False while wrapping or in hyperspace
    pub visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GattlerRound {
    pub body: Body,
}

impl Poolable for GattlerRound {
    fn reset(&mut self) {
        self.body.deactivate();
    }
}

/// Hyperspace sequence stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HyperStage {
    Idle,
    WarpOut { frame: u32 },
    Hidden,
    WarpIn { frame: u32 },
}

#[derive(Debug)]
pub struct Spaceship {
    pub body: Body,
    pub lives: u8,
    /// Stretch along the heading, 1.0 outside hyperspace
    pub warp_scale: f32,
    pub hyper_stage: HyperStage,
    /// Seconds until hyperspace may be used again
    pub cooldown: f32,
    gattler: Process,
    /// Seconds until the next round may leave, kept across trigger releases
    reload: f32,
    hyperspace: Process,
    rounds: Pool<GattlerRound>,
    live_rounds: Vec<Handle>,
}

impl Default for Spaceship {
    fn default() -> Self {
        Self::new()
    }
}

impl Spaceship {
    pub fn new() -> Self {
        let mut body = Body::new(SHIP_RADIUS);
        body.activate(Vec3::ZERO, Vec3::ZERO);
        Self {
            body,
            lives: 0,
            warp_scale: 1.0,
            hyper_stage: HyperStage::Idle,
            cooldown: 0.0,
            gattler: Process::new("gattler"),
            reload: 0.0,
            hyperspace: Process::new("hyperspace"),
            rounds: Pool::new("gattler round", GATTLER_POOL),
            live_rounds: Vec::new(),
        }
    }

    /// Stop every process, recall all rounds and park the ship at the centre
    pub fn reset(&mut self) {
        self.gattler.stop();
        self.hyperspace.stop();
        for handle in self.live_rounds.drain(..) {
            self.rounds.release(handle);
        }
        self.body.activate(Vec3::ZERO, Vec3::ZERO);
        self.warp_scale = 1.0;
        self.hyper_stage = HyperStage::Idle;
        self.cooldown = 0.0;
        self.reload = 0.0;
    }

    pub fn new_game(&mut self, lives: u8) {
        self.reset();
        self.lives = lives;
    }

    pub fn start_level(&mut self) {
        self.reset();
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            position: self.body.position,
            velocity: self.body.velocity,
            radius: self.body.radius,
            visible: self.body.visible && !self.is_hyperspacing(),
        }
    }

    pub fn is_hyperspacing(&self) -> bool {
        self.hyperspace.is_active()
    }

    pub fn is_firing(&self) -> bool {
        self.gattler.is_active()
    }

    /// Advance the ship, its rounds and any hyperspace jump by one frame.
    /// `threats` are used to pick a safe hyperspace exit.
    pub fn update(&mut self, ctx: &mut SimContext, input: &TickInput, threats: &[Kinematics], dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        self.reload = (self.reload - dt).max(0.0);

        if input.hyperspace && !self.is_hyperspacing() && self.cooldown <= 0.0 {
            self.engage_hyperspace(ctx);
        }

        if self.hyperspace.poll(dt) {
            let step = self.hyperspace_step(ctx, threats);
            self.hyperspace.resolve(step);
        }

        if !self.is_hyperspacing() {
            self.steer(input, dt);
            self.thrust(input.thrust, dt);
            self.body.integrate(dt);
            if self.body.is_outside(&ctx.playspace) {
                self.body.wrap(&ctx.playspace, 0.0, |_| Vec3::ZERO);
                self.body.face(self.body.velocity);
            }
            self.body.update_visibility(&ctx.playspace);

            if input.fire {
                self.gattler.start();
            } else {
                self.gattler.stop();
            }
            if self.gattler.poll(dt) && self.reload <= 0.0 {
                self.fire_round();
                self.reload = 1.0 / GATTLER_RATE;
            }
        }

        self.move_rounds(ctx, dt);
    }

    fn steer(&mut self, input: &TickInput, dt: f32) {
        let pitch = input.pitch.clamp(-1.0, 1.0) * PITCH_YAW_RATE * dt;
        let yaw = input.yaw.clamp(-1.0, 1.0) * PITCH_YAW_RATE * dt;
        if pitch == 0.0 && yaw == 0.0 {
            return;
        }
        // Positive yaw turns the nose towards local +X, positive pitch towards local +Y
        let turn = Quat::from_axis_angle(Vec3::Y, yaw) * Quat::from_axis_angle(Vec3::X, -pitch);
        self.body.orientation = (self.body.orientation * turn).normalize();
    }

    /// Build speed along the heading while thrusting; otherwise decay towards a
    /// hard stop without ever reversing
    fn thrust(&mut self, thrusting: bool, dt: f32) {
        if thrusting {
            let accel = SHIP_MAX_SPEED / THRUST_PICKUP_SECS;
            self.body.velocity += self.body.forward() * accel * dt;
            self.body.velocity = self.body.velocity.clamp_length_max(SHIP_MAX_SPEED);
            return;
        }

        let speed = self.body.speed();
        if speed == 0.0 {
            return;
        }
        let decay = (SHIP_MAX_SPEED / STOP_EPSILON).ln() / (THRUST_PICKUP_SECS * REVERSE_THRUST_FACTOR);
        let next = speed * (-decay * dt).exp();
        if next < STOP_EPSILON {
            self.body.velocity = Vec3::ZERO;
        } else {
            self.body.velocity *= next / speed;
        }
    }

    fn fire_round(&mut self) {
        let Some(handle) = self.rounds.request() else {
            log::trace!("gattler round skipped");
            return;
        };
        let forward = self.body.forward();
        let position = self.body.position + forward * (self.body.radius + GATTLER_ROUND_OFFSET);
        let velocity = self.body.velocity + forward * GATTLER_MUZZLE_SPEED;

        let round = self.rounds.live_mut(handle);
        round.body.radius = GATTLER_ROUND_RADIUS;
        round.body.activate(position, velocity);
        round.body.face(forward);
        self.live_rounds.push(handle);
    }

    /// Rounds fly until they leave the playspace; removal happens mid-scan
    fn move_rounds(&mut self, ctx: &SimContext, dt: f32) {
        let mut i = 0;
        while i < self.live_rounds.len() {
            let handle = self.live_rounds[i];
            let round = self.rounds.live_mut(handle);
            round.body.integrate(dt);
            if ctx.playspace.contains(round.body.position) {
                i += 1;
            } else {
                self.live_rounds.remove(i);
                self.rounds.release(handle);
            }
        }
    }

    /// Remove a round that hit something. Panics if the round isn't in flight.
    pub fn destroy_round(&mut self, handle: Handle) {
        let Some(idx) = self.live_rounds.iter().position(|h| *h == handle) else {
            panic!("destroy_round: {handle:?} is not a gattler round in flight");
        };
        self.live_rounds.remove(idx);
        self.rounds.release(handle);
    }

    pub fn is_round_live(&self, handle: Handle) -> bool {
        self.rounds.is_live(handle)
    }

    /// A round struck an asteroid or enemy craft
    pub fn gattler_hit(&mut self, handle: Handle) {
        self.destroy_round(handle);
    }

    /// Hull contact with an asteroid or enemy craft. Returns true if it cost a life.
    pub fn collision(&mut self, ctx: &mut SimContext) -> bool {
        self.take_hit(ctx)
    }

    /// Struck by an enemy shot. Returns true if it cost a life.
    pub fn shooter_hit(&mut self, ctx: &mut SimContext) -> bool {
        self.take_hit(ctx)
    }

    fn take_hit(&mut self, ctx: &mut SimContext) -> bool {
        if self.is_hyperspacing() {
            return false;
        }
        self.lives = self.lives.saturating_sub(1);
        log::info!("Player hit, {} lives left", self.lives);
        ctx.events.push(GameEvent::PlayerHit { lives: self.lives });
        true
    }

    fn engage_hyperspace(&mut self, ctx: &mut SimContext) {
        if !self.hyperspace.start() {
            return;
        }
        self.gattler.stop();
        self.hyper_stage = HyperStage::WarpOut { frame: 0 };
        ctx.events.push(GameEvent::HyperspaceEngaged);
        log::debug!("Hyperspace engaged");
    }

    fn hyperspace_step(&mut self, ctx: &mut SimContext, threats: &[Kinematics]) -> Step {
        match self.hyper_stage {
            HyperStage::Idle => Step::Done,
            HyperStage::WarpOut { frame } => {
                let frame = frame + 1;
                self.warp_scale = 1.0 + (WARP_MAX_SCALE - 1.0) * frame as f32 / WARP_FRAMES as f32;
                if frame < WARP_FRAMES {
                    self.hyper_stage = HyperStage::WarpOut { frame };
                    return Step::Continue;
                }
                self.body.visible = false;
                self.hyper_stage = HyperStage::Hidden;
                Step::Wait(HYPERSPACE_HIDDEN_SECS)
            }
            HyperStage::Hidden => {
                let exit = self.safest_exit(ctx, threats);
                self.body.position = exit;
                self.body.velocity = Vec3::ZERO;
                self.body.face(-exit);
                self.body.visible = true;
                self.hyper_stage = HyperStage::WarpIn { frame: 0 };
                Step::Continue
            }
            HyperStage::WarpIn { frame } => {
                let frame = frame + 1;
                self.warp_scale = WARP_MAX_SCALE - (WARP_MAX_SCALE - 1.0) * frame as f32 / WARP_FRAMES as f32;
                if frame < WARP_FRAMES {
                    self.hyper_stage = HyperStage::WarpIn { frame };
                    return Step::Continue;
                }
                self.warp_scale = 1.0;
                self.hyper_stage = HyperStage::Idle;
                self.cooldown = HYPERSPACE_COOLDOWN_SECS;
                Step::Done
            }
        }
    }

    /// Pick the candidate exit that takes the longest for any threat to reach
    fn safest_exit(&self, ctx: &mut SimContext, threats: &[Kinematics]) -> Vec3 {
        let mut best = Vec3::ZERO;
        let mut best_time = f32::NEG_INFINITY;
        for _ in 0..HYPERSPACE_CANDIDATES {
            let candidate = ctx.playspace.random_interior_point(&mut ctx.rng, HYPERSPACE_RANGE);
            let earliest = exposure(candidate, self.body.radius, threats);
            if earliest > best_time {
                best_time = earliest;
                best = candidate;
            }
        }
        log::debug!("Hyperspace exit {best:?}, earliest threat in {best_time:.2}s");
        best
    }

    /// Visible ship hull plus every round in flight
    pub fn colliders(&self, out: &mut Vec<(Collider, Kinematics)>) {
        if self.body.visible && !self.is_hyperspacing() {
            out.push((
                Collider::new(Layer::Spaceship, EntityRef::Spaceship),
                self.body.kinematics(),
            ));
        }
        for handle in &self.live_rounds {
            out.push((
                Collider::new(Layer::Gattler, EntityRef::GattlerRound(*handle)),
                self.rounds.live(*handle).body.kinematics(),
            ));
        }
    }

    pub fn rounds_in_flight(&self) -> usize {
        self.live_rounds.len()
    }
}

/// Earliest time any threat, turning to chase at its current speed, could reach `point`
pub fn exposure(point: Vec3, radius: f32, threats: &[Kinematics]) -> f32 {
    threats
        .iter()
        .filter_map(|threat| {
            let reach = threat.radius + radius;
            let offset = point - threat.position;
            if offset.length() <= reach {
                return Some(0.0);
            }
            let edge = point - offset.normalize() * reach;
            time_to_intercept(threat.position, Vec3::ZERO, edge, Vec3::ZERO, threat.velocity.length())
        })
        .fold(f32::INFINITY, f32::min)
}
