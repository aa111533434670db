//! Leading Edge entry point
//!
//! Runs a headless race: a simple hands-off pilot drives the player car (or
//! the CPU cars race alone in demo mode), frames are composed and
//! tessellated as a renderer would, and the result is logged.
//!
//! # Usage
//!
//! ```bash
//! leading-edge settings.json --seed 42 --record race.json
//! leading-edge --demo --seconds 60
//! leading-edge --verify race.json
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;

use leading_edge::audio::{AudioManager, CarSound, LogSoundTrigger};
use leading_edge::consts::*;
use leading_edge::renderer::{Viewport, compose, shapes};
use leading_edge::sim::{RaceState, TickInput, standings, tick};
use leading_edge::{RaceSettings, Replay, format_time};

/// Wall-clock frame length of the simulated display (50 Hz, so substep
/// counts vary from frame to frame)
const FRAME_DT: f32 = 1.0 / 50.0;

#[derive(Parser, Debug)]
#[command(name = "leading-edge")]
#[command(author, version, about = "Leading Edge - pseudo-3D arcade racer (headless)")]
struct Args {
    /// Race settings file (JSON); defaults are used if missing or invalid
    settings: Option<PathBuf>,

    /// CPU cars only, camera following the first car
    #[arg(long)]
    demo: bool,

    /// Race seed (default: current time)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many simulated seconds (default: laps x lap time limit)
    #[arg(long)]
    seconds: Option<f32>,

    /// Save a replay of the race to this file
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Re-run a saved replay and check it reproduces, then exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["demo", "record"])]
    verify: Option<PathBuf>,
}

/// Game instance holding all state
struct Game {
    state: RaceState,
    audio: AudioManager<LogSoundTrigger>,
    viewport: Viewport,
    accumulator: f32,
    replay: Option<Replay>,
    frames: u64,
    vertex_bytes: usize,
}

impl Game {
    fn new(seed: u64, settings: &RaceSettings, with_player: bool, record: bool) -> Self {
        let state = RaceState::new(seed, settings, with_player);
        let mut audio = AudioManager::new(LogSoundTrigger);
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);
        audio.set_muted(settings.muted);
        Self {
            viewport: Viewport::from_settings(settings),
            replay: record.then(|| Replay::new(seed, settings, with_player)),
            state,
            audio,
            accumulator: 0.0,
            frames: 0,
            vertex_bytes: 0,
        }
    }

    /// Steer back towards the middle of the road and against corners
    fn pilot(&self) -> TickInput {
        let Some(player) = self.state.player() else {
            return TickInput::default();
        };
        let drift = player.driver().map(|d| d.corner_drift).unwrap_or(0.0);
        TickInput {
            steer: (player.pos.x / 800.0 - drift * 0.5).clamp(-1.0, 1.0),
            accelerate: true,
            brake: false,
        }
    }

    /// Run simulation ticks
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.pilot();
            tick(&mut self.state, &input, SIM_DT);
            if let Some(replay) = &mut self.replay {
                replay.record(&input, &self.state);
            }
            self.accumulator -= SIM_DT;
            substeps += 1;

            let events = self.state.drain_events();
            self.audio.dispatch(&events);
            self.audio.update_loops(CarSound::from_state(&self.state, &input).as_ref());
        }
    }

    fn render(&mut self) {
        let list = compose(&self.state, &self.viewport);
        let vertices = shapes::draw_list(&list, &self.viewport);
        self.vertex_bytes = shapes::vertex_bytes(&vertices).len();
        self.frames += 1;
        if self.frames % 500 == 0 {
            log::debug!(
                "Frame {}: {} draw commands, {} vertex bytes",
                self.frames,
                list.len(),
                self.vertex_bytes
            );
        }
    }
}

fn report(state: &RaceState) {
    match state.player_position() {
        Some(position) if state.race_complete => {
            let outcome = if state.time_up { "Time up" } else { "Finished" };
            log::info!("{} in position {} of {}", outcome, position + 1, state.cars.len());
        }
        Some(position) => log::info!("Stopped in position {} of {}", position + 1, state.cars.len()),
        None => log::info!("Demo race stopped after {}", format_time(state.timer)),
    }
    for standing in standings(&state.cars).iter().take(5) {
        log::info!(
            "{:>2}. car {:>2}{} lap {} fastest {}",
            standing.position,
            standing.car_id,
            if standing.is_player { " (you)" } else { "" },
            standing.lap,
            standing.fastest_lap_text()
        );
    }
}

fn verify(path: &Path) -> bool {
    let replay = match Replay::load(path) {
        Ok(replay) => replay,
        Err(e) => {
            log::error!("Could not load replay: {}", e);
            return false;
        }
    };
    match replay.verify() {
        Ok(()) => {
            log::info!("Replay verified ({} samples)", replay.samples.len());
            true
        }
        Err(divergence) => {
            log::error!(
                "Replay diverged at tick {}: expected {:?}, got {:?}",
                divergence.expected.tick,
                divergence.expected,
                divergence.actual
            );
            false
        }
    }
}

fn main() {
    env_logger::init();
    log::info!("Leading Edge starting...");

    let options = Args::parse();

    if let Some(path) = &options.verify {
        std::process::exit(if verify(path) { 0 } else { 1 });
    }

    let settings = options
        .settings
        .as_deref()
        .map(RaceSettings::load_or_default)
        .unwrap_or_default();
    let seed = options.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });
    let max_seconds = options.seconds.unwrap_or(settings.laps as f32 * settings.lap_time_limit);
    log::info!("Detail: {}, seed {}", settings.detail.as_str(), seed);

    let mut game = Game::new(seed, &settings, !options.demo, options.record.is_some());
    while !game.state.race_complete && game.state.timer < max_seconds {
        game.update(FRAME_DT);
        game.render();
    }
    log::info!(
        "Ran {} frames ({} ticks), last frame {} vertex bytes",
        game.frames,
        game.state.time_ticks,
        game.vertex_bytes
    );
    game.audio.update_loops(None);
    report(&game.state);

    if let (Some(path), Some(replay)) = (&options.record, &game.replay) {
        if let Err(e) = replay.save(path) {
            log::error!("Could not save replay: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["leading-edge", "race.json", "--seed", "42", "--record", "out.json"]).unwrap();
        assert_eq!(args.settings, Some(PathBuf::from("race.json")));
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.record, Some(PathBuf::from("out.json")));
        assert!(!args.demo);

        let args = Args::try_parse_from(["leading-edge", "--demo", "--seconds", "12.5"]).unwrap();
        assert!(args.demo);
        assert_eq!(args.settings, None);
        assert_eq!(args.seconds, Some(12.5));
    }

    #[test]
    fn test_args_rejected() {
        assert!(Args::try_parse_from(["leading-edge", "--seed"]).is_err());
        assert!(Args::try_parse_from(["leading-edge", "--seed", "fast"]).is_err());
        assert!(Args::try_parse_from(["leading-edge", "--turbo"]).is_err());
        assert!(Args::try_parse_from(["leading-edge", "--verify", "a.json", "--demo"]).is_err());
    }

    #[test]
    fn test_game_runs_headless() {
        let settings = RaceSettings {
            num_cars: 4,
            ..RaceSettings::default()
        };
        let mut game = Game::new(7, &settings, true, true);
        for _ in 0..300 {
            game.update(FRAME_DT);
            game.render();
        }
        // 300 frames at 50 Hz is 6 seconds of 60 Hz ticks
        assert!((359..=360).contains(&game.state.time_ticks));
        assert!(game.vertex_bytes > 0);
        let replay = game.replay.as_ref().unwrap();
        assert_eq!(replay.inputs.len() as u64, game.state.time_ticks);
        assert_eq!(replay.verify(), Ok(()));
    }
}
