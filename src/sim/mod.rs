//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (cars sorted by position, ties by ID)
//! - No rendering or platform dependencies

pub mod car;
pub mod collision;
pub mod race;
pub mod state;
pub mod tick;
pub mod track;

pub use car::{Autopilot, Car, ControlSource, CrashState, Driver, LapTracker};
pub use collision::{Contact, ContactKind, resolve_car_collisions, scenery_hit};
pub use race::{Standing, standings};
pub use state::{Camera, RaceEvent, RacePhase, RaceState};
pub use tick::{TickInput, camera_offset_change, tick};
pub use track::{Scenery, SceneryKind, Track, TrackSegment, make_track};
