//! Race state and simulation events
//!
//! Everything `tick` reads or writes lives here, including the RNG, so a
//! race replays identically from its seed and inputs.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::car::Car;
use super::track::{Track, make_track};
use crate::consts::*;
use crate::remap;
use crate::settings::RaceSettings;

/// Width of the scrolling background image; its offset wraps within +/- this
pub const BACKGROUND_WIDTH: f32 = 1920.0;
/// Vertical position of the background relative to the horizon
pub const BACKGROUND_Y: f32 = 30.0;

/// Sprite sets available to CPU cars (the player is always 'a')
pub const CPU_LETTERS: [char; 4] = ['b', 'c', 'd', 'e'];

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    /// Start lights counting down; cars are frozen on the grid
    Countdown,
    Racing,
    /// Player finished or ran out of time; cars keep driving
    Complete,
}

/// Something that happened during a tick, for sound and UI
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RaceEvent {
    /// One second of the countdown passed
    CountdownBeep,
    Go,
    /// Player ran into something ahead or alongside
    Bump,
    /// Player was hit from behind
    BumpBehind,
    /// Player hit scenery
    Explosion,
    /// Player gained or lost a place at a noticeable speed difference
    Overtake,
    LapComplete { lap: u32, time: f32 },
    FastestLap,
    FinalLap,
    HitGrass,
    RaceComplete,
    TimeUp,
}

/// The viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pos: Vec3,
    /// Scroll position of the background, driven by track curvature
    pub background_offset: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pos: Vec3::new(0.0, CAMERA_HEIGHT, 0.0),
            background_offset: Vec2::new(-BACKGROUND_WIDTH / 2.0, BACKGROUND_Y),
        }
    }
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct RaceState {
    /// Race seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub settings: RaceSettings,
    pub track: Track,
    /// Kept in race order after each tick (leader first)
    pub cars: Vec<Car>,
    pub camera: Camera,
    /// Car the camera follows (the player, or the first car in demo mode)
    pub follow_car: u32,
    /// Countdown seconds remaining; the race runs once this reaches zero
    pub start_timer: f32,
    /// Seconds since the race was created
    pub timer: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub race_complete: bool,
    pub time_up: bool,
    /// The camera has no meaningful previous position yet
    pub first_frame: bool,
    /// Events raised since the last drain
    pub events: Vec<RaceEvent>,
}

impl RaceState {
    /// Create a race on the standard track
    ///
    /// Without a player the race starts immediately and the camera follows
    /// the first CPU car (title screen demo).
    pub fn new(seed: u64, settings: &RaceSettings, with_player: bool) -> Self {
        let track = make_track(settings.laps, settings.view_distance);
        Self::with_track(seed, settings, track, with_player)
    }

    /// Create a race on a given track
    pub fn with_track(seed: u64, settings: &RaceSettings, track: Track, with_player: bool) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let cars = grid(settings.num_cars, with_player, &mut rng);
        let follow_car = cars.first().map(|c| c.id).unwrap_or(0);

        log::info!(
            "Race created: seed {}, {} cars, {} laps, {} segments{}",
            seed,
            cars.len(),
            settings.laps,
            track.len(),
            if with_player { "" } else { " (demo)" }
        );

        Self {
            seed,
            rng,
            settings: settings.clone(),
            track,
            cars,
            camera: Camera::default(),
            follow_car,
            start_timer: if with_player { COUNTDOWN_SECS } else { 0.0 },
            timer: 0.0,
            time_ticks: 0,
            race_complete: false,
            time_up: false,
            first_frame: true,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> RacePhase {
        if self.race_complete {
            RacePhase::Complete
        } else if self.start_timer > 0.0 {
            RacePhase::Countdown
        } else {
            RacePhase::Racing
        }
    }

    pub fn car(&self, id: u32) -> Option<&Car> {
        self.cars.iter().find(|c| c.id == id)
    }

    pub fn player(&self) -> Option<&Car> {
        self.cars.iter().find(|c| c.is_player())
    }

    pub fn player_mut(&mut self) -> Option<&mut Car> {
        self.cars.iter_mut().find(|c| c.is_player())
    }

    pub fn followed(&self) -> Option<&Car> {
        self.car(self.follow_car)
    }

    /// Player's race position, 0 = leading
    pub fn player_position(&self) -> Option<usize> {
        self.cars.iter().position(|c| c.is_player())
    }

    pub fn push_event(&mut self, event: RaceEvent) {
        log::debug!("Race event: {:?}", event);
        self.events.push(event);
    }

    /// Take the events raised since the last call
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Lay out the starting grid, staggered left/right, player at the front
fn grid(num_cars: usize, with_player: bool, rng: &mut Pcg32) -> Vec<Car> {
    let last = num_cars.saturating_sub(1).max(1) as f32;
    (0..num_cars)
        .map(|i| {
            let z = GRID_FIRST_Z - i as f32 * GRID_CAR_SPACING;
            let x = if i % 2 == 0 { -GRID_X } else { GRID_X };
            let pos = Vec3::new(x, 0.0, z);
            if i == 0 && with_player {
                Car::new_player(0, pos, num_cars)
            } else {
                let t = i as f32;
                let target_speed = remap(t, 0.0, last, CPU_CAR_MIN_TARGET_SPEED, CPU_CAR_MAX_TARGET_SPEED);
                let accel = PLAYER_ACCELERATION_MAX * remap(t, 0.0, last, 1.5, 2.0);
                let letter = CPU_LETTERS[rng.random_range(0..CPU_LETTERS.len())];
                Car::new_cpu(i as u32, pos, letter, accel, target_speed, rng)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout() {
        let state = RaceState::new(7, &RaceSettings::default(), true);
        assert_eq!(state.cars.len(), NUM_CARS);
        assert!(state.cars[0].is_player());
        assert_eq!(state.cars.iter().filter(|c| c.is_player()).count(), 1);
        assert_eq!(state.cars[0].pos, Vec3::new(-GRID_X, 0.0, GRID_FIRST_Z));
        assert_eq!(state.cars[1].pos.x, GRID_X);
        assert!((state.cars[2].pos.z - (GRID_FIRST_Z - 2.0 * GRID_CAR_SPACING)).abs() < 1e-6);

        let last = state.cars.last().unwrap().autopilot().unwrap();
        assert_eq!(last.target_speed, CPU_CAR_MAX_TARGET_SPEED);
        assert_eq!(last.accel, PLAYER_ACCELERATION_MAX * 2.0);
        assert!(state.cars[1..].iter().all(|c| CPU_LETTERS.contains(&c.letter)));

        assert_eq!(state.phase(), RacePhase::Countdown);
        assert_eq!(state.follow_car, 0);
    }

    #[test]
    fn test_demo_race_has_no_player() {
        let state = RaceState::new(7, &RaceSettings::default(), false);
        assert!(state.player().is_none());
        assert_eq!(state.phase(), RacePhase::Racing);
        assert_eq!(state.followed().map(|c| c.id), Some(0));
        assert_eq!(state.cars[0].autopilot().unwrap().target_speed, CPU_CAR_MIN_TARGET_SPEED);
    }

    #[test]
    fn test_single_car_grid() {
        let settings = RaceSettings {
            num_cars: 1,
            ..RaceSettings::default()
        };
        let state = RaceState::new(1, &settings, false);
        assert_eq!(state.cars.len(), 1);
        assert!(state.cars[0].autopilot().unwrap().target_speed.is_finite());
    }

    #[test]
    fn test_drain_events() {
        let mut state = RaceState::new(1, &RaceSettings::default(), true);
        state.push_event(RaceEvent::Go);
        assert_eq!(state.drain_events(), vec![RaceEvent::Go]);
        assert!(state.events.is_empty());
    }
}
