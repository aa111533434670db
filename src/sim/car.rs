//! Cars: one record for every car, with a tagged control source
//!
//! Player-specific and CPU-specific state live in the `ControlSource`
//! variants; the dynamics code branches on the tag.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::track::Track;
use crate::consts::*;
use crate::{move_towards, remap_clamp, sign};

/// Source sprite size of a car (pixels) before the draw scale
pub const CAR_SPRITE_SIZE: glam::Vec2 = glam::Vec2::new(160.0, 84.0);
pub const CAR_DRAW_SCALE: f32 = 2.0;

/// Crash/reset progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrashState {
    #[default]
    Driving,
    /// Explosion animation, counted in ticks
    Exploding { ticks: u32 },
    /// Being walked back to the centre of the track
    Resetting,
}

/// Lap counting and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapTracker {
    /// Current lap, starting at 1
    pub lap: u32,
    pub lap_time: f32,
    pub race_time: f32,
    pub fastest_lap: Option<f32>,
    pub last_lap_was_fastest: bool,
    /// Index of the last start-line segment passed
    pub last_checkpoint: Option<usize>,
}

impl Default for LapTracker {
    fn default() -> Self {
        Self {
            lap: 1,
            lap_time: 0.0,
            race_time: 0.0,
            fastest_lap: None,
            last_lap_was_fastest: false,
            last_checkpoint: None,
        }
    }
}

/// A finished lap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapCompletion {
    /// The lap now being driven
    pub lap: u32,
    pub time: f32,
    pub fastest: bool,
}

impl LapTracker {
    pub fn advance_timers(&mut self, dt: f32) {
        self.lap_time += dt;
        self.race_time += dt;
    }

    /// Record passing a start-line segment
    ///
    /// The first start line seen only arms the tracker (driving from the grid
    /// to the line is not a lap), and staying on the same line does nothing.
    pub fn pass_checkpoint(&mut self, index: usize) -> Option<LapCompletion> {
        let completion = match self.last_checkpoint {
            Some(last) if last != index => {
                self.lap += 1;
                let time = self.lap_time;
                let fastest = self.fastest_lap.is_none_or(|best| time < best);
                if fastest {
                    self.fastest_lap = Some(time);
                }
                self.last_lap_was_fastest = fastest;
                self.lap_time = 0.0;
                Some(LapCompletion {
                    lap: self.lap,
                    time,
                    fastest,
                })
            }
            _ => None,
        };
        self.last_checkpoint = Some(index);
        completion
    }

    /// Check every segment from `from` to `to` inclusive for start lines
    pub fn cross_segments(&mut self, track: &Track, from: usize, to: usize) -> Option<LapCompletion> {
        let mut result = None;
        for index in from..=to {
            if track.get(index).is_some_and(|s| s.is_start_line) {
                if let Some(completion) = self.pass_checkpoint(index) {
                    result = Some(completion);
                }
            }
        }
        result
    }
}

/// Player-controlled car state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    /// 0..1, reduced when cornering hard at speed
    pub grip: f32,
    /// Lateral track offset the camera moved through last tick
    pub corner_drift: f32,
    pub braking: bool,
    pub grass_sound_timer: f32,
    /// Race position (0 = leading) at the end of the last tick
    pub prev_position: usize,
}

impl Driver {
    pub fn new(num_cars: usize) -> Self {
        Self {
            grip: 1.0,
            corner_drift: 0.0,
            braking: false,
            grass_sound_timer: 0.0,
            prev_position: num_cars.saturating_sub(1),
        }
    }
}

/// CPU-controlled car state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Autopilot {
    /// Speed change per second
    pub accel: f32,
    pub target_speed: f32,
    pub target_x: f32,
    /// Curvature of the segment ahead, for picking an angled sprite
    pub steering: f32,
    pub retarget_timer: f32,
}

/// Who drives a car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControlSource {
    Human(Driver),
    Ai(Autopilot),
}

/// A car on the track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: u32,
    /// x = lateral, y = unused, z = along the track (forward is -Z)
    pub pos: Vec3,
    pub speed: f32,
    /// Sprite set identity
    pub letter: char,
    /// Segment this car is registered on
    pub segment: Option<usize>,
    pub crash: CrashState,
    pub on_grass: bool,
    /// -1, 0 or 1: which way the car is steering this tick
    pub steer_direction: i8,
    pub laps: LapTracker,
    pub control: ControlSource,
}

/// Grip left at `speed` when cornering against the drift
pub fn grip_for_speed(speed: f32) -> f32 {
    remap_clamp(speed, LOSE_GRIP_SPEED, ZERO_GRIP_SPEED, 1.0, 0.0)
}

/// Grip for this tick
///
/// The corner pushes the car by `-corner_drift` in X; steering input moves
/// it by `-steer`. Grip only drops when the steering opposes the push
/// (`sign(steer) == -sign(corner_drift)`) above `LOSE_GRIP_SPEED`.
pub fn cornering_grip(speed: f32, steer: f32, corner_drift: f32) -> f32 {
    if corner_drift != 0.0 && speed > LOSE_GRIP_SPEED && sign(steer) == -sign(corner_drift) {
        grip_for_speed(speed)
    } else {
        1.0
    }
}

/// Frame-rate independent drag
pub fn apply_drag(speed: f32, dt: f32, on_grass: bool) -> f32 {
    let factor = if on_grass {
        DRAG_FACTOR - GRASS_DRAG
    } else {
        DRAG_FACTOR
    };
    speed * factor.powf(dt / SIM_DT)
}

impl Car {
    pub fn new_player(id: u32, pos: Vec3, num_cars: usize) -> Self {
        Self::new(id, pos, 'a', ControlSource::Human(Driver::new(num_cars)))
    }

    pub fn new_cpu(id: u32, pos: Vec3, letter: char, accel: f32, target_speed: f32, rng: &mut Pcg32) -> Self {
        let autopilot = Autopilot {
            accel,
            target_speed,
            target_x: pos.x,
            steering: 0.0,
            retarget_timer: rng.random_range(2.0..=4.0),
        };
        Self::new(id, pos, letter, ControlSource::Ai(autopilot))
    }

    fn new(id: u32, pos: Vec3, letter: char, control: ControlSource) -> Self {
        Self {
            id,
            pos,
            speed: 0.0,
            letter,
            segment: None,
            crash: CrashState::Driving,
            on_grass: false,
            steer_direction: 0,
            laps: LapTracker::default(),
            control,
        }
    }

    #[inline]
    pub fn is_player(&self) -> bool {
        matches!(self.control, ControlSource::Human(_))
    }

    #[inline]
    pub fn is_crashed(&self) -> bool {
        self.crash != CrashState::Driving
    }

    pub fn driver(&self) -> Option<&Driver> {
        match &self.control {
            ControlSource::Human(driver) => Some(driver),
            ControlSource::Ai(_) => None,
        }
    }

    pub fn driver_mut(&mut self) -> Option<&mut Driver> {
        match &mut self.control {
            ControlSource::Human(driver) => Some(driver),
            ControlSource::Ai(_) => None,
        }
    }

    pub fn autopilot(&self) -> Option<&Autopilot> {
        match &self.control {
            ControlSource::Ai(autopilot) => Some(autopilot),
            ControlSource::Human(_) => None,
        }
    }

    /// Move along the track
    pub fn advance(&mut self, dt: f32) {
        self.pos.z -= self.speed * dt;
    }

    /// Re-register on whichever segment our Z now falls in
    ///
    /// Off the end of the track the old registration is kept.
    pub fn sync_segment(&mut self, track: &mut Track) {
        if let Some(index) = track.segment_for_z(self.pos.z) {
            track.relocate_car(self.id, self.segment, index);
            self.segment = Some(index);
        }
    }

    /// Stop dead and start the reset sequence
    pub fn crash(&mut self, explode: bool) {
        self.speed = 0.0;
        self.crash = if explode {
            CrashState::Exploding { ticks: 0 }
        } else {
            CrashState::Resetting
        };
    }

    /// Advance the crash sequence; returns true once the car may drive again
    pub fn update_reset(&mut self, dt: f32) -> bool {
        match self.crash {
            CrashState::Driving => true,
            CrashState::Exploding { ticks } => {
                let ticks = ticks + 1;
                self.crash = if ticks >= EXPLODE_TICKS {
                    CrashState::Resetting
                } else {
                    CrashState::Exploding { ticks }
                };
                false
            }
            CrashState::Resetting => {
                self.pos.x = move_towards(self.pos.x, 0.0, RESET_SPEED_X * dt);
                if self.pos.x == 0.0 {
                    self.crash = CrashState::Driving;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Player controls, drag, corner drift and steering (before forward motion)
    pub fn drive_human(&mut self, steer: f32, accelerate: bool, brake: bool, race_complete: bool, dt: f32) {
        let ControlSource::Human(driver) = &mut self.control else {
            return;
        };
        let steer = steer.clamp(-1.0, 1.0);

        driver.braking = false;
        if !race_complete {
            if accelerate {
                let accel = if self.speed < HIGH_ACCEL_THRESHOLD {
                    PLAYER_ACCELERATION_MAX
                } else {
                    PLAYER_ACCELERATION_MIN
                };
                self.speed += accel * dt;
            } else if brake {
                driver.braking = true;
                self.speed = (self.speed - BRAKE_DECELERATION * dt).max(0.0);
            }
        }

        self.speed = apply_drag(self.speed, dt, self.on_grass);

        // Corners are only an illusion; without this the car would stick to the road
        if driver.corner_drift != 0.0 {
            driver.grip = cornering_grip(self.speed, steer, driver.corner_drift);
            if !race_complete {
                // corner_drift already reflects distance moved, so no dt here
                self.pos.x -= driver.corner_drift * CORNER_OFFSET_MULTIPLIER;
            }
        } else {
            driver.grip = 1.0;
        }

        self.steer_direction = 0;
        if self.speed > 0.0 && !race_complete {
            let x_move = steer * self.speed * STEERING_STRENGTH * driver.grip * dt;
            self.pos.x -= x_move;
            self.steer_direction = sign(x_move) as i8;
        }
    }

    /// CPU speed and lateral control (before forward motion)
    pub fn drive_ai(&mut self, race_complete: bool, player_speed: Option<f32>, dt: f32) {
        let ControlSource::Ai(autopilot) = &mut self.control else {
            return;
        };
        if race_complete {
            if let Some(speed) = player_speed {
                autopilot.target_speed = speed;
            }
        }
        self.speed = move_towards(self.speed, autopilot.target_speed, autopilot.accel * dt);
        self.pos.x = move_towards(self.pos.x, autopilot.target_x, CPU_STEER_SPEED_X * dt);
    }

    /// CPU bookkeeping after forward motion: steering sprite and periodic new targets
    ///
    /// Target speed drifts upwards on average so slow cars catch up and overtake.
    pub fn retarget_ai(&mut self, track: &Track, others: &[(u32, Vec3)], race_complete: bool, dt: f32, rng: &mut Pcg32) {
        let pos = self.pos;
        let car_id = self.id;
        let ControlSource::Ai(autopilot) = &mut self.control else {
            return;
        };

        let ahead = track.first_ahead(pos.z).and_then(|(index, _)| track.get(index));
        if let Some(segment) = ahead {
            autopilot.steering = segment.dx;
        }

        autopilot.retarget_timer -= dt;
        if autopilot.retarget_timer > 0.0 || race_complete {
            return;
        }

        autopilot.target_speed = (autopilot.target_speed + rng.random_range(-4.0..=6.0))
            .clamp(CPU_CAR_MIN_TARGET_SPEED, CPU_CAR_MAX_TARGET_SPEED);

        // Slow down for sharp corners, slightly randomly
        if let Some(cap) = ahead.and_then(|s| s.cpu_max_target_speed) {
            if autopilot.target_speed > cap {
                autopilot.target_speed = rng.random_range((cap - 3.0)..=cap);
            }
        }

        // Pick a lane away from nearby cars, with a bounded number of attempts
        let too_close = |target_x: f32| {
            others.iter().any(|&(other_id, other)| {
                other_id != car_id && (pos.z - other.z).abs() < 20.0 && (target_x - other.x).abs() < 300.0
            })
        };
        for _ in 0..CPU_RETARGET_ATTEMPTS {
            autopilot.target_x = rng.random_range(-CPU_TARGET_X_RANGE..=CPU_TARGET_X_RANGE);
            if !too_close(autopilot.target_x) {
                break;
            }
        }

        autopilot.retarget_timer = rng.random_range(2.0..=4.0);
    }
}
