//! Leading Edge - a pseudo-3D arcade racer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track, car physics, race state)
//! - `renderer`: Perspective projection and painter's-order draw list
//! - `audio`: Sound trigger interface fed by simulation events
//! - `replay`: Input recording and deterministic playback checks
//! - `settings`: Data-driven race configuration

pub mod audio;
pub mod renderer;
pub mod replay;
pub mod settings;
pub mod sim;

pub use replay::Replay;
pub use settings::{DetailPreset, RaceSettings};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default screen size the projector centres on
    pub const SCREEN_WIDTH: f32 = 960.0;
    pub const SCREEN_HEIGHT: f32 = 540.0;

    /// Camera-relative Z beyond which road geometry is not drawn
    pub const CLIPPING_PLANE: f32 = -0.25;
    /// Tighter plane for car sprites so close cars don't flicker
    pub const CLIPPING_PLANE_CARS: f32 = -0.08;

    /// Track geometry (world units)
    pub const SPACING: f32 = 1.0;
    pub const TRACK_W: f32 = 3000.0;
    pub const HALF_STRIPE_W: f32 = 25.0;
    pub const HALF_RUMBLE_STRIP_W: f32 = 250.0;
    pub const HALF_YELLOW_LINE_W: f32 = 80.0;
    pub const YELLOW_LINE_DISTANCE_FROM_EDGE: f32 = 150.0;
    pub const LAMP_X: f32 = TRACK_W / 2.0 + 300.0;
    pub const BILLBOARD_X: f32 = TRACK_W / 2.0 + 600.0;

    /// Section lengths in segments
    pub const SECTION_VERY_SHORT: usize = 25;
    pub const SECTION_SHORT: usize = 50;
    pub const SECTION_MEDIUM: usize = 100;
    pub const SECTION_LONG: usize = 200;

    /// Camera sits this far behind (positive Z) the car it follows
    pub const CAMERA_FOLLOW_DISTANCE: f32 = 2.0;
    pub const CAMERA_HEIGHT: f32 = 400.0;

    /// Player handling
    pub const LOSE_GRIP_SPEED: f32 = 50.0;
    pub const ZERO_GRIP_SPEED: f32 = 100.0;
    pub const PLAYER_ACCELERATION_MAX: f32 = 20.0;
    pub const PLAYER_ACCELERATION_MIN: f32 = 10.0;
    pub const HIGH_ACCEL_THRESHOLD: f32 = 30.0;
    pub const BRAKE_DECELERATION: f32 = 10.0;
    /// Higher = harder to corner
    pub const CORNER_OFFSET_MULTIPLIER: f32 = 5.8;
    /// Higher = steering has a stronger effect
    pub const STEERING_STRENGTH: f32 = 72.0;

    /// Per-frame speed retention at 60 Hz
    pub const DRAG_FACTOR: f32 = 0.9975;
    pub const GRASS_DRAG: f32 = 0.0025;
    /// Distance from the track edge (inside) at which a car counts as on grass
    pub const GRASS_MARGIN: f32 = 100.0;
    /// Beyond this lateral distance the car is put back on the track
    pub const MAX_OFF_TRACK_X: f32 = 6000.0;
    pub const GRASS_SOUND_REPEAT: f32 = 0.15;

    /// Crash handling
    pub const EXPLODE_TICKS: u32 = 32;
    pub const RESET_SPEED_X: f32 = 2000.0;

    /// CPU cars
    pub const CPU_CAR_MIN_TARGET_SPEED: f32 = 40.0;
    pub const CPU_CAR_MAX_TARGET_SPEED: f32 = 65.0;
    pub const CPU_STEER_SPEED_X: f32 = 400.0;
    pub const CPU_TARGET_X_RANGE: f32 = 1000.0;
    pub const CPU_RETARGET_ATTEMPTS: u32 = 20;

    /// Car-car collision window (X and Z axes are not the same scale)
    pub const COLLIDE_HALF_WIDTH: f32 = 260.0;
    pub const COLLIDE_DISTANCE_Z: f32 = 0.6;
    pub const SIDE_SWIPE_DISTANCE_Z: f32 = 0.2;
    pub const SIDE_SWIPE_PUSH: f32 = 50.0;
    /// Speed the rear car loses relative to the car it runs into
    pub const REAR_END_PENALTY: f32 = 3.0;
    /// Gap left between two cars after a rear-end collision
    pub const MIN_SEPARATION_Z: f32 = 0.72;

    /// Race setup
    pub const NUM_LAPS: u32 = 5;
    pub const NUM_CARS: usize = 20;
    pub const GRID_CAR_SPACING: f32 = 0.55;
    pub const GRID_FIRST_Z: f32 = -3.0;
    pub const GRID_X: f32 = 400.0;
    pub const COUNTDOWN_SECS: f32 = 3.999;
    /// Lap time at which the race is abandoned
    pub const LAP_TIME_LIMIT: f32 = 60.0 * 4.0;

    /// Default draw distance in segments
    pub const VIEW_DISTANCE: usize = 200;
}

/// Remap a value from one range to another (unclamped)
#[inline]
pub fn remap(value: f32, old_min: f32, old_max: f32, new_min: f32, new_max: f32) -> f32 {
    (new_max - new_min) * (value - old_min) / (old_max - old_min) + new_min
}

/// Like `remap`, but the result stays within the new range (either order)
#[inline]
pub fn remap_clamp(value: f32, old_min: f32, old_max: f32, new_min: f32, new_max: f32) -> f32 {
    let lower = new_min.min(new_max);
    let upper = new_min.max(new_max);
    remap(value, old_min, old_max, new_min, new_max).clamp(lower, upper)
}

/// Where `value` falls between `a` and `b`, clamped to [0, 1]
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Step `value` toward `target` by at most `step`, never overshooting
#[inline]
pub fn move_towards(value: f32, target: f32, step: f32) -> f32 {
    if value < target {
        (value + step).min(target)
    } else {
        (value - step).max(target)
    }
}

/// -1, 0 or 1 (unlike `f32::signum`, zero maps to zero)
#[inline]
pub fn sign(x: f32) -> i32 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Format seconds as `m:ss.mmm`
pub fn format_time(seconds: f32) -> String {
    let minutes = (seconds / 60.0).floor() as u32;
    format!("{}:{:06.3}", minutes, seconds % 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_towards_does_not_overshoot() {
        assert_eq!(move_towards(0.0, 50.0, 10.0), 10.0);
        assert_eq!(move_towards(45.0, 50.0, 10.0), 50.0);
        assert_eq!(move_towards(60.0, 50.0, 4.0), 56.0);
        assert_eq!(move_towards(52.0, 50.0, 4.0), 50.0);
    }

    #[test]
    fn test_remap_clamp_inverted_range() {
        assert_eq!(remap_clamp(75.0, 50.0, 100.0, 1.0, 0.0), 0.5);
        assert_eq!(remap_clamp(20.0, 50.0, 100.0, 1.0, 0.0), 1.0);
        assert_eq!(remap_clamp(150.0, 50.0, 100.0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_inverse_lerp() {
        assert_eq!(inverse_lerp(10.0, 20.0, 15.0), 0.5);
        assert_eq!(inverse_lerp(-1.0, 0.0, -1.0), 0.0);
        assert_eq!(inverse_lerp(0.0, -1.0, -0.25), 0.25);
        assert_eq!(inverse_lerp(3.0, 3.0, 7.0), 0.0);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(0.0), 0);
        assert_eq!(sign(-0.0), 0);
        assert_eq!(sign(2.5), 1);
        assert_eq!(sign(-0.1), -1);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(65.123), "1:05.123");
        assert_eq!(format_time(3.5), "0:03.500");
    }
}
