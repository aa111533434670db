//! Replay recording and verification
//!
//! A race is fully determined by its seed, settings and per-tick inputs, so
//! that's all a replay stores. Periodic samples of the followed car let a
//! re-run confirm it reproduced the recorded race.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::SIM_DT;
use crate::settings::{RaceSettings, SettingsError};
use crate::sim::state::RaceState;
use crate::sim::tick::{TickInput, tick};

/// Current replay file version
pub const REPLAY_VERSION: u32 = 1;
/// Ticks between samples (one per second)
pub const SAMPLE_INTERVAL: u64 = 60;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported replay version: {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid replay settings: {0}")]
    Settings(#[from] SettingsError),
}

/// Snapshot of the followed car
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub tick: u64,
    pub x: f32,
    pub z: f32,
    pub speed: f32,
    pub lap: u32,
}

impl Sample {
    pub fn capture(state: &RaceState) -> Option<Self> {
        let car = state.followed()?;
        Some(Self {
            tick: state.time_ticks,
            x: car.pos.x,
            z: car.pos.z,
            speed: car.speed,
            lap: car.laps.lap,
        })
    }

    /// Bit-for-bit equality (replays must reproduce exactly)
    pub fn matches(&self, other: &Sample) -> bool {
        self.tick == other.tick
            && self.x.to_bits() == other.x.to_bits()
            && self.z.to_bits() == other.z.to_bits()
            && self.speed.to_bits() == other.speed.to_bits()
            && self.lap == other.lap
    }
}

/// Where a re-run first disagreed with the recording
#[derive(Debug, Clone, PartialEq)]
pub struct Divergence {
    pub expected: Sample,
    /// `None` if the re-run produced no sample here
    pub actual: Option<Sample>,
}

/// A recorded race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    pub version: u32,
    pub seed: u64,
    pub settings: RaceSettings,
    pub with_player: bool,
    /// One per tick, in order
    pub inputs: Vec<TickInput>,
    pub samples: Vec<Sample>,
}

impl Replay {
    pub fn new(seed: u64, settings: &RaceSettings, with_player: bool) -> Self {
        Self {
            version: REPLAY_VERSION,
            seed,
            settings: settings.clone(),
            with_player,
            inputs: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// Start a race matching this replay
    pub fn start(&self) -> RaceState {
        RaceState::new(self.seed, &self.settings, self.with_player)
    }

    /// Record the input just passed to `tick`, sampling the state it produced
    pub fn record(&mut self, input: &TickInput, state: &RaceState) {
        self.inputs.push(*input);
        if state.time_ticks % SAMPLE_INTERVAL == 0 {
            if let Some(sample) = Sample::capture(state) {
                self.samples.push(sample);
            }
        }
    }

    /// Re-simulate the race, returning the final state and its samples
    pub fn run(&self) -> (RaceState, Vec<Sample>) {
        let mut state = self.start();
        let mut samples = Vec::with_capacity(self.samples.len());
        for input in &self.inputs {
            tick(&mut state, input, SIM_DT);
            state.events.clear();
            if state.time_ticks % SAMPLE_INTERVAL == 0 {
                samples.extend(Sample::capture(&state));
            }
        }
        (state, samples)
    }

    /// Re-simulate and compare against the recorded samples
    pub fn verify(&self) -> Result<(), Divergence> {
        let (_, actual) = self.run();
        for (i, expected) in self.samples.iter().enumerate() {
            match actual.get(i) {
                Some(sample) if sample.matches(expected) => {}
                other => {
                    log::warn!("Replay diverged at tick {}", expected.tick);
                    return Err(Divergence {
                        expected: *expected,
                        actual: other.copied(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let replay: Self = serde_json::from_str(json)?;
        if replay.version != REPLAY_VERSION {
            return Err(ReplayError::UnsupportedVersion(replay.version));
        }
        replay.settings.validate()?;
        Ok(replay)
    }

    pub fn save(&self, path: &Path) -> Result<(), ReplayError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Replay saved to {} ({} ticks)", path.display(), self.inputs.len());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let replay = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded replay from {} ({} ticks)", path.display(), replay.inputs.len());
        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(ticks: u32) -> Replay {
        let settings = RaceSettings {
            num_cars: 6,
            ..RaceSettings::default()
        };
        let mut replay = Replay::new(4242, &settings, true);
        let mut state = replay.start();
        for i in 0..ticks {
            let input = TickInput {
                steer: if (i / 90) % 2 == 0 { 0.4 } else { -0.4 },
                accelerate: true,
                brake: false,
            };
            tick(&mut state, &input, SIM_DT);
            replay.record(&input, &state);
        }
        replay
    }

    #[test]
    fn test_replay_reproduces_race() {
        let replay = recorded(600);
        assert_eq!(replay.inputs.len(), 600);
        assert_eq!(replay.samples.len(), 10);
        assert_eq!(replay.verify(), Ok(()));
    }

    #[test]
    fn test_tampered_input_diverges() {
        let mut replay = recorded(600);
        // Brake hard after the countdown
        for input in &mut replay.inputs[300..] {
            input.accelerate = false;
            input.brake = true;
        }
        let divergence = replay.verify().unwrap_err();
        assert_eq!(divergence.expected.tick, 360);
        assert!(divergence.actual.is_some());
    }

    #[test]
    fn test_truncated_replay_diverges() {
        let mut replay = recorded(300);
        replay.inputs.truncate(100);
        let divergence = replay.verify().unwrap_err();
        assert_eq!(divergence.expected.tick, 120);
        assert_eq!(divergence.actual, None);
    }

    #[test]
    fn test_json_round_trip_still_verifies() {
        let replay = recorded(360);
        let loaded = Replay::from_json(&replay.to_json().unwrap()).unwrap();
        assert_eq!(loaded.samples, replay.samples);
        assert_eq!(loaded.verify(), Ok(()));
    }

    #[test]
    fn test_unsupported_version() {
        let mut replay = recorded(1);
        replay.version = 99;
        let json = replay.to_json().unwrap();
        assert!(matches!(Replay::from_json(&json), Err(ReplayError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_edited_settings_rejected() {
        let mut replay = recorded(1);
        replay.settings.laps = 0;
        let json = replay.to_json().unwrap();
        assert!(matches!(
            Replay::from_json(&json),
            Err(ReplayError::Settings(SettingsError::Invalid(_)))
        ));
    }
}
