//! Game state and the wave/level orchestrator
//!
//! `GameState` owns every system plus the [`SimContext`] they share. It wires
//! contact pairs to handlers, chains the asteroid and enemy completion signals,
//! and keeps score.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::asteroid::{AsteroidHit, AsteroidId, AsteroidSize, Asteroids};
use super::body::Kinematics;
use super::collision::{Collider, Contact, ContactTable, EntityRef, Layer};
use super::contacts::ContactTracker;
use super::playspace::Playspace;
use super::signal::WaveSignals;
use super::spaceship::Spaceship;
use super::ufo::{Obstacle, UfoHit, UfoId, UfoSize, Ufos};
use crate::settings::{ConfigError, SimSettings};
use crate::tuning::{LevelConfig, LevelTable};

/// Something the host may want to react to (sound, effects, HUD)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelStarted { level: u32 },
    AsteroidDestroyed { size: AsteroidSize, position: Vec3, by_player: bool },
    UfoLaunched { size: UfoSize },
    UfoDestroyed { size: UfoSize, position: Vec3, by_player: bool },
    PlayerHit { lives: u8 },
    HyperspaceEngaged,
    AsteroidsCleared,
    LevelCleared { level: u32 },
}

/// State every system shares: RNG, playspace, level clock, ids and events
#[derive(Debug, Clone)]
pub struct SimContext {
    pub rng: Pcg32,
    pub playspace: Playspace,
    /// Seconds since the current level started
    pub level_time: f32,
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl SimContext {
    pub fn new(seed: u64, playspace_radius: f32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            playspace: Playspace::new(playspace_radius),
            level_time: 0.0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity serial
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No game in progress
    Idle,
    Playing,
    /// Both waves cleared, waiting for `next_level`
    LevelCleared,
    /// Ran off the end of the level table
    Complete,
}

/// Result of asking for the next level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStart {
    Started(u32),
    GameComplete,
}

pub struct GameState {
    pub settings: SimSettings,
    pub levels: LevelTable,
    pub ctx: SimContext,
    pub ship: Spaceship,
    pub asteroids: Asteroids,
    pub ufos: Ufos,
    pub phase: GamePhase,
    /// Level being played (0 before the first level)
    pub level: u32,
    pub score: u32,
    pub time_ticks: u64,
    next_level: u32,
    wave: Option<WaveSignals>,
    /// The enemy wave has been told the level is ending
    ending_sent: bool,
    contact_table: ContactTable<GameState>,
    tracker: ContactTracker,
    collider_scratch: Vec<(Collider, Kinematics)>,
    pub(crate) threat_scratch: Vec<Kinematics>,
}

impl GameState {
    /// Default settings and the built-in level table with the given seed
    pub fn new(seed: u64) -> Self {
        let settings = SimSettings {
            seed,
            ..Default::default()
        };
        Self::with_levels(settings, LevelTable::standard())
    }

    /// Build from settings, loading the level table they point at
    pub fn from_config(settings: SimSettings) -> Result<Self, ConfigError> {
        let levels = match &settings.levels_path {
            Some(path) => LevelTable::load(path)?,
            None => LevelTable::standard(),
        };
        Ok(Self::with_levels(settings, levels))
    }

    pub fn with_levels(settings: SimSettings, levels: LevelTable) -> Self {
        let ctx = SimContext::new(settings.seed, settings.playspace_radius);
        let next_level = settings.start_level;
        Self {
            settings,
            levels,
            ctx,
            ship: Spaceship::new(),
            asteroids: Asteroids::new(),
            ufos: Ufos::new(),
            phase: GamePhase::Idle,
            level: 0,
            score: 0,
            time_ticks: 0,
            next_level,
            wave: None,
            ending_sent: false,
            contact_table: Self::contact_table(),
            tracker: ContactTracker::new(),
            collider_scratch: Vec::new(),
            threat_scratch: Vec::new(),
        }
    }

    /// Layer pairs and their handlers
    fn contact_table() -> ContactTable<GameState> {
        ContactTable::new()
            .on_start(Layer::Gattler, Layer::Asteroid, Self::on_gattler_asteroid)
            .on_start(Layer::Gattler, Layer::Ufo, Self::on_gattler_ufo)
            .on_start(Layer::Asteroid, Layer::Asteroid, Self::on_asteroid_asteroid)
            .on_start(Layer::UfoSensor, Layer::Asteroid, Self::on_sensor_asteroid_start)
            .on_end(Layer::UfoSensor, Layer::Asteroid, Self::on_sensor_asteroid_end)
            .on_start(Layer::UfoSensor, Layer::UfoSensor, Self::on_sensor_sensor_start)
            .on_end(Layer::UfoSensor, Layer::UfoSensor, Self::on_sensor_sensor_end)
            .on_start(Layer::Spaceship, Layer::Ufo, Self::on_spaceship_collision)
            .on_start(Layer::Spaceship, Layer::Asteroid, Self::on_spaceship_collision)
            .on_start(Layer::Shooter, Layer::Asteroid, Self::on_shooter_asteroid)
            .on_start(Layer::Shooter, Layer::Spaceship, Self::on_shooter_spaceship)
    }

    /// Start a fresh game from the configured start level
    pub fn new_game(&mut self) {
        self.reset();
        self.ship.new_game(self.settings.lives);
        self.asteroids.new_game();
        self.ufos.new_game();
        self.next_level = self.settings.start_level;
        self.level = 0;
        self.score = 0;
        self.phase = GamePhase::Idle;
        log::info!("New game, {} lives", self.settings.lives);
    }

    /// Reject any wave signal still pending and forget contact state
    pub fn reset(&mut self) {
        if let Some(wave) = self.wave.take() {
            wave.reject_pending();
        }
        self.ending_sent = false;
        self.tracker.clear();
    }

    /// Abandon the game and return every entity to its pool
    pub fn end_game(&mut self) {
        self.reset();
        self.asteroids.reset();
        self.ufos.reset();
        self.ship.reset();
        self.phase = GamePhase::Idle;
        log::info!("Game ended at level {} with score {}", self.level, self.score);
    }

    /// Advance to the next level in the table
    pub fn next_level(&mut self) -> LevelStart {
        let level = self.next_level;
        let Some(cfg) = self.levels.level(level).copied() else {
            self.reset();
            self.phase = GamePhase::Complete;
            log::info!("Level table exhausted after level {}", self.level);
            return LevelStart::GameComplete;
        };
        self.start_level(level, &cfg);
        self.next_level = level + 1;
        LevelStart::Started(level)
    }

    /// Populate the asteroid field, arm the enemy launcher and chain the two
    /// completion signals
    pub fn start_level(&mut self, level: u32, cfg: &LevelConfig) -> WaveSignals {
        self.reset();
        self.ctx.level_time = 0.0;
        self.ship.start_level();
        self.level = level;
        self.phase = GamePhase::Playing;

        let wave = WaveSignals::new();
        self.wave = Some(wave.clone());
        self.ctx.events.push(GameEvent::LevelStarted { level });
        log::info!("Level {level} started");

        self.ufos.start_level(&cfg.ufos);
        self.asteroids
            .start_level(&mut self.ctx, &cfg.asteroids, wave.asteroids_cleared.clone());
        self.settle_waves();
        wave
    }

    /// Run the continuation of whichever wave signals have resolved, once each
    /// per level. Hits routed through `asteroid_hit`/`ufo_hit` settle straight
    /// away; `tick` settles anything resolved behind its back.
    pub fn settle_waves(&mut self) {
        let Some(wave) = &self.wave else {
            return;
        };
        let asteroids_done = wave.asteroids_cleared.is_resolved();
        if asteroids_done && !self.ending_sent {
            self.asteroids_cleared();
        }
        if self.phase == GamePhase::Playing && self.level_complete() {
            self.level_cleared();
        }
    }

    /// Continuation of the asteroid signal: tell the enemy wave the level is ending
    fn asteroids_cleared(&mut self) {
        let Some(wave) = &self.wave else {
            return;
        };
        let ufos_cleared = wave.ufos_cleared.clone();
        self.ending_sent = true;
        self.ctx.events.push(GameEvent::AsteroidsCleared);
        log::info!("Asteroids cleared on level {}", self.level);
        if self.ufos.level_ending(ufos_cleared) {
            self.level_cleared();
        }
    }

    /// Continuation of the enemy signal
    fn level_cleared(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.phase = GamePhase::LevelCleared;
        self.ctx.events.push(GameEvent::LevelCleared { level: self.level });
        log::info!("Level {} cleared, score {}", self.level, self.score);
    }

    /// Both waves of the current level are done
    pub fn level_complete(&self) -> bool {
        self.wave.as_ref().is_some_and(|w| w.ufos_cleared.is_resolved())
    }

    /// Signals of the level in progress
    pub fn wave_signals(&self) -> Option<&WaveSignals> {
        self.wave.as_ref()
    }

    /// Take every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.ctx.events)
    }

    fn is_entity_live(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Asteroid(id) => self.asteroids.is_live(id),
            EntityRef::Ufo(id) => self.ufos.is_live(id),
            EntityRef::GattlerRound(handle) => self.ship.is_round_live(handle),
            EntityRef::Shot(handle) => self.ufos.is_shot_live(handle),
            EntityRef::Spaceship => true,
        }
    }

    /// Dispatch a contact start reported by the host
    pub fn contact_start(&mut self, contact: Contact) {
        // An earlier handler this frame may already have removed one side
        if !self.is_entity_live(contact.a.entity) || !self.is_entity_live(contact.b.entity) {
            log::trace!("Stale contact {contact:?} ignored");
            return;
        }
        match self.contact_table.start_handler(&contact) {
            Some((handler, a, b)) => handler(self, a, b),
            None => log::warn!(
                "No contact handler for {:?} x {:?}",
                contact.a.layer,
                contact.b.layer
            ),
        }
    }

    /// Dispatch a contact end reported by the host; unhandled pairs are ignored
    pub fn contact_end(&mut self, contact: Contact) {
        if let Some((handler, a, b)) = self.contact_table.end_handler(&contact) {
            handler(self, a, b);
        }
    }

    /// Run the built-in overlap pass and dispatch what it finds
    pub fn detect_contacts(&mut self) {
        let mut colliders = std::mem::take(&mut self.collider_scratch);
        colliders.clear();
        self.ship.colliders(&mut colliders);
        self.asteroids.colliders(&mut colliders);
        self.ufos.colliders(&mut colliders);
        self.tracker.detect(&colliders, &self.contact_table);
        self.collider_scratch = colliders;

        let ended = std::mem::take(&mut self.tracker.ended);
        for contact in &ended {
            self.contact_end(*contact);
        }
        self.tracker.ended = ended;

        let started = std::mem::take(&mut self.tracker.started);
        for contact in &started {
            self.contact_start(*contact);
        }
        self.tracker.started = started;
    }

    /// Positions of everything that can hurt the player
    pub fn collect_threats(&self, out: &mut Vec<Kinematics>) {
        out.clear();
        out.extend(self.asteroids.iter().map(|(_, a)| a.body.kinematics()));
        self.ufos.threats(out);
    }

    /// Apply a hit to an asteroid and follow through on score and wave chaining
    pub fn asteroid_hit(&mut self, id: AsteroidId, by_player: bool) {
        let result = self.asteroids.hit(&mut self.ctx, id, by_player);
        if matches!(result, AsteroidHit::Destroyed | AsteroidHit::Cleared) {
            self.ufos.forget_asteroid(id);
            if by_player {
                self.score += id.size.points();
            }
        }
        if result == AsteroidHit::Cleared {
            self.settle_waves();
        }
    }

    pub fn ufo_hit(&mut self, id: UfoId, by_player: bool) {
        let result = self.ufos.gattler_hit(&mut self.ctx, id, by_player);
        if matches!(result, UfoHit::Destroyed | UfoHit::Cleared) && by_player {
            self.score += id.size.points();
        }
        if result == UfoHit::Cleared {
            self.settle_waves();
        }
    }

    // --- Contact handlers ---

    fn on_gattler_asteroid(&mut self, round: EntityRef, asteroid: EntityRef) {
        let (EntityRef::GattlerRound(round), EntityRef::Asteroid(asteroid)) = (round, asteroid) else {
            panic!("gattler x asteroid handler got {round:?}, {asteroid:?}");
        };
        self.ship.gattler_hit(round);
        self.asteroid_hit(asteroid, true);
    }

    fn on_gattler_ufo(&mut self, round: EntityRef, ufo: EntityRef) {
        let (EntityRef::GattlerRound(round), EntityRef::Ufo(ufo)) = (round, ufo) else {
            panic!("gattler x ufo handler got {round:?}, {ufo:?}");
        };
        self.ship.gattler_hit(round);
        self.ufo_hit(ufo, true);
    }

    fn on_asteroid_asteroid(&mut self, a: EntityRef, b: EntityRef) {
        let (EntityRef::Asteroid(a), EntityRef::Asteroid(b)) = (a, b) else {
            panic!("asteroid x asteroid handler got {a:?}, {b:?}");
        };
        self.asteroids.collision(&mut self.ctx, a, b);
    }

    fn sensor_asteroid(sensor: EntityRef, asteroid: EntityRef) -> (UfoId, Obstacle) {
        let (EntityRef::Ufo(ufo), EntityRef::Asteroid(asteroid)) = (sensor, asteroid) else {
            panic!("sensor x asteroid handler got {sensor:?}, {asteroid:?}");
        };
        (ufo, Obstacle::Asteroid(asteroid))
    }

    fn on_sensor_asteroid_start(&mut self, sensor: EntityRef, asteroid: EntityRef) {
        let (ufo, obstacle) = Self::sensor_asteroid(sensor, asteroid);
        self.ufos.start_avoid(ufo, obstacle);
    }

    fn on_sensor_asteroid_end(&mut self, sensor: EntityRef, asteroid: EntityRef) {
        let (ufo, obstacle) = Self::sensor_asteroid(sensor, asteroid);
        self.ufos.end_avoid(ufo, obstacle);
    }

    fn sensor_pair(a: EntityRef, b: EntityRef) -> (UfoId, UfoId) {
        let (EntityRef::Ufo(a), EntityRef::Ufo(b)) = (a, b) else {
            panic!("sensor x sensor handler got {a:?}, {b:?}");
        };
        (a, b)
    }

    fn on_sensor_sensor_start(&mut self, a: EntityRef, b: EntityRef) {
        let (a, b) = Self::sensor_pair(a, b);
        self.ufos.start_avoid(a, Obstacle::Ufo(b));
        self.ufos.start_avoid(b, Obstacle::Ufo(a));
    }

    fn on_sensor_sensor_end(&mut self, a: EntityRef, b: EntityRef) {
        let (a, b) = Self::sensor_pair(a, b);
        self.ufos.end_avoid(a, Obstacle::Ufo(b));
        self.ufos.end_avoid(b, Obstacle::Ufo(a));
    }

    fn on_spaceship_collision(&mut self, ship: EntityRef, _other: EntityRef) {
        assert_eq!(ship, EntityRef::Spaceship, "spaceship handler got {ship:?}");
        self.ship.collision(&mut self.ctx);
    }

    fn on_shooter_asteroid(&mut self, shot: EntityRef, asteroid: EntityRef) {
        let (EntityRef::Shot(shot), EntityRef::Asteroid(asteroid)) = (shot, asteroid) else {
            panic!("shooter x asteroid handler got {shot:?}, {asteroid:?}");
        };
        self.ufos.shooter_hit(shot);
        self.asteroid_hit(asteroid, false);
    }

    fn on_shooter_spaceship(&mut self, shot: EntityRef, ship: EntityRef) {
        let (EntityRef::Shot(shot), EntityRef::Spaceship) = (shot, ship) else {
            panic!("shooter x spaceship handler got {shot:?}, {ship:?}");
        };
        self.ufos.shooter_hit(shot);
        self.ship.shooter_hit(&mut self.ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::signal::SignalState;

    fn one_rock_level() -> LevelConfig {
        let mut cfg = *LevelTable::standard().level(1).unwrap();
        cfg.asteroids.large.count = 1;
        cfg.asteroids.large.hits = 1;
        cfg.asteroids.small.count = 0;
        cfg.ufos.large.count = 0;
        cfg.ufos.small.count = 0;
        cfg
    }

    fn clear_field(state: &mut GameState) {
        while let Some(&id) = state.asteroids.ids().first() {
            state.asteroid_hit(id, true);
        }
    }

    #[test]
    fn test_asteroid_signal_chains_into_level_ending() {
        let mut state = GameState::new(3);
        state.new_game();
        let wave = state.start_level(1, &one_rock_level());

        clear_field(&mut state);
        // Resolving the asteroid signal synchronously told the enemy wave to end,
        // and with no craft flying the level is complete
        assert!(wave.asteroids_cleared.is_resolved());
        assert!(wave.ufos_cleared.is_resolved());
        assert!(state.level_complete());
        assert_eq!(state.phase, GamePhase::LevelCleared);
        assert_eq!(state.score, AsteroidSize::Large.points());

        let events = state.drain_events();
        let cleared_at = events.iter().position(|e| *e == GameEvent::AsteroidsCleared).unwrap();
        let level_at = events
            .iter()
            .position(|e| *e == GameEvent::LevelCleared { level: 1 })
            .unwrap();
        assert!(cleared_at < level_at);
    }

    #[test]
    fn test_enemy_signal_waits_for_level_ending() {
        let mut state = GameState::new(3);
        state.new_game();
        let mut cfg = one_rock_level();
        cfg.ufos.large.count = 1;
        cfg.ufos.large.timing = 0.5;
        cfg.ufos.large.hits = 1;
        let wave = state.start_level(1, &cfg);

        // Let the craft launch, then shoot it down before the asteroids are gone
        for _ in 0..60 {
            state.ufos.update(
                &mut state.ctx,
                &Default::default(),
                &state.asteroids,
                crate::consts::SIM_DT,
            );
        }
        let ufo = state.ufos.ids()[0];
        state.ufo_hit(ufo, true);
        assert!(state.ufos.is_empty());
        assert_eq!(wave.ufos_cleared.state(), SignalState::Pending);

        clear_field(&mut state);
        assert!(wave.ufos_cleared.is_resolved());
        assert_eq!(state.score, AsteroidSize::Large.points() + UfoSize::Large.points());
    }

    #[test]
    fn test_direct_asteroid_hit_still_ends_the_level() {
        let mut state = GameState::new(3);
        state.new_game();
        let wave = state.start_level(1, &one_rock_level());

        // Bypass asteroid_hit: the signal resolves with nobody listening yet
        let rock = state.asteroids.ids()[0];
        state.asteroids.hit(&mut state.ctx, rock, true);
        assert!(wave.asteroids_cleared.is_resolved());
        assert_eq!(wave.ufos_cleared.state(), SignalState::Pending);

        crate::sim::tick(&mut state, &Default::default(), crate::consts::SIM_DT);
        assert!(wave.ufos_cleared.is_resolved());
        assert!(state.level_complete());
        assert_eq!(state.phase, GamePhase::LevelCleared);

        // Settling again must not repeat the continuations
        state.settle_waves();
        let events = state.drain_events();
        let count = |e: &GameEvent| events.iter().filter(|x| *x == e).count();
        assert_eq!(count(&GameEvent::AsteroidsCleared), 1);
        assert_eq!(count(&GameEvent::LevelCleared { level: 1 }), 1);
    }

    #[test]
    fn test_reset_rejects_pending_signals() {
        let mut state = GameState::new(3);
        state.new_game();
        let wave = state.start_level(1, &one_rock_level());
        state.end_game();
        assert_eq!(wave.asteroids_cleared.state(), SignalState::Rejected);
        assert_eq!(wave.ufos_cleared.state(), SignalState::Rejected);
        assert!(state.asteroids.is_empty());
    }

    #[test]
    fn test_levels_run_off_the_table() {
        let mut state = GameState::new(3);
        state.new_game();
        let last = state.levels.playable_levels();
        for n in 1..=last {
            assert_eq!(state.next_level(), LevelStart::Started(n));
        }
        assert_eq!(state.next_level(), LevelStart::GameComplete);
        assert_eq!(state.phase, GamePhase::Complete);
    }

    #[test]
    fn test_stale_contacts_are_ignored() {
        let mut state = GameState::new(3);
        state.new_game();
        state.start_level(1, &one_rock_level());
        let rock = state.asteroids.ids()[0];
        state.asteroid_hit(rock, true);

        let contact = Contact {
            a: Collider::new(Layer::Spaceship, EntityRef::Spaceship),
            b: Collider::new(Layer::Asteroid, EntityRef::Asteroid(rock)),
        };
        let lives = state.ship.lives;
        state.contact_start(contact);
        assert_eq!(state.ship.lives, lives);
    }

    #[test]
    fn test_ship_asteroid_contact_costs_a_life() {
        let mut state = GameState::new(3);
        state.new_game();
        state.start_level(1, &one_rock_level());
        let rock = state.asteroids.ids()[0];
        let contact = Contact {
            a: Collider::new(Layer::Asteroid, EntityRef::Asteroid(rock)),
            b: Collider::new(Layer::Spaceship, EntityRef::Spaceship),
        };
        state.contact_start(contact);
        assert_eq!(state.ship.lives, state.settings.lives - 1);
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::PlayerHit { lives: state.ship.lives })
        );
    }

    #[test]
    fn test_sensor_contacts_feed_obstacles() {
        let mut state = GameState::new(3);
        state.new_game();
        let mut cfg = one_rock_level();
        cfg.ufos.large.count = 1;
        state.start_level(1, &cfg);
        let ufo = state
            .ufos
            .spawn(&mut state.ctx, UfoSize::Large, &cfg.ufos.large)
            .unwrap();
        let rock = state.asteroids.ids()[0];
        let contact = Contact {
            a: Collider::new(Layer::Asteroid, EntityRef::Asteroid(rock)),
            b: Collider::new(Layer::UfoSensor, EntityRef::Ufo(ufo)),
        };
        state.contact_start(contact);
        assert_eq!(state.ufos.get(ufo).unwrap().obstacles, vec![Obstacle::Asteroid(rock)]);
        state.contact_end(contact);
        assert!(state.ufos.get(ufo).unwrap().obstacles.is_empty());
    }
}
