//! Spacerocks headless runner
//!
//! Plays the level table on autopilot at the fixed timestep and logs progress.
//! Usage: `spacerocks [settings.json]`

use std::process::ExitCode;

use spacerocks::consts::SIM_DT;
use spacerocks::sim::{GameEvent, GameState, LevelStart, TickInput, tick};
use spacerocks::{ConfigError, SimSettings};

/// Give up on a level after this many simulated seconds
const LEVEL_TIMEOUT_SECS: f32 = 600.0;

fn load_settings() -> Result<SimSettings, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => SimSettings::load(path),
        None => Ok(SimSettings::default()),
    }
}

fn run(settings: SimSettings) -> Result<(), ConfigError> {
    let mut state = GameState::from_config(settings)?;
    log::info!(
        "Seed {}, playspace radius {}, {} levels",
        state.settings.seed,
        state.settings.playspace_radius,
        state.levels.playable_levels()
    );

    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };

    state.new_game();
    while let LevelStart::Started(level) = state.next_level() {
        while !state.level_complete() && state.ship.lives > 0 {
            tick(&mut state, &input, SIM_DT);
            for event in state.drain_events() {
                match event {
                    GameEvent::PlayerHit { lives } => log::info!("Hit, {lives} lives left"),
                    GameEvent::LevelCleared { level } => log::info!("Level {level} cleared"),
                    other => log::debug!("{other:?}"),
                }
            }
            if state.ctx.level_time > LEVEL_TIMEOUT_SECS {
                log::warn!("Level {level} timed out");
                break;
            }
        }
        if state.ship.lives == 0 || !state.level_complete() {
            break;
        }
    }

    log::info!(
        "Final score {} at level {} after {} ticks",
        state.score,
        state.level,
        state.time_ticks
    );
    state.end_game();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Spacerocks starting...");

    let result = load_settings().and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
