//! Fixed timestep simulation tick
//!
//! Advances the race deterministically: countdown, car updates, collisions,
//! track checks, race order and the camera.

use glam::{Vec2, Vec3};

use super::collision::{ContactKind, resolve_car_collisions, scenery_hit};
use super::race::{detect_overtake, sort_by_position};
use super::state::{BACKGROUND_WIDTH, RaceEvent, RaceState};
use super::track::Track;
use crate::consts::*;
use crate::format_time;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickInput {
    /// -1 (left) to 1 (right)
    pub steer: f32,
    pub accelerate: bool,
    pub brake: bool,
}

/// Advance the race by one fixed timestep
pub fn tick(state: &mut RaceState, input: &TickInput, dt: f32) {
    state.timer += dt;
    state.time_ticks += 1;

    update_countdown(state, dt);

    let old_camera_z = state.camera.pos.z;

    if state.start_timer <= 0.0 {
        let prev_ahead = drive_cars(state, input, dt);
        resolve_collisions(state);
        check_track(state, &prev_ahead);
        check_completion(state);

        sort_by_position(&mut state.cars);
        if detect_overtake(&mut state.cars) {
            state.push_event(RaceEvent::Overtake);
        }
    }

    follow_camera(state);

    // The camera has no meaningful previous position on the first frame
    let change = if state.first_frame {
        Vec2::ZERO
    } else {
        camera_offset_change(&state.track, old_camera_z, state.camera.pos.z)
    };
    let offset = &mut state.camera.background_offset;
    *offset += change;
    offset.x = wrap_background(offset.x);

    // Corners are drawn by shifting the road, so the player has to steer against them
    if let Some(driver) = state.player_mut().and_then(|car| car.driver_mut()) {
        driver.corner_drift = change.x;
    }

    state.first_frame = false;
}

/// Start lights: register cars on their segments so they're drawn, beep each second
fn update_countdown(state: &mut RaceState, dt: f32) {
    if state.start_timer <= 0.0 {
        return;
    }
    for car in state.cars.iter_mut() {
        car.sync_segment(&mut state.track);
    }
    let old = state.start_timer;
    state.start_timer = (state.start_timer - dt).max(0.0);
    if state.start_timer == 0.0 {
        log::info!("Race started");
        state.push_event(RaceEvent::Go);
    } else if old as u32 != state.start_timer as u32 {
        state.push_event(RaceEvent::CountdownBeep);
    }
}

/// Drive and move every car; returns each car's first-ahead segment before moving
fn drive_cars(state: &mut RaceState, input: &TickInput, dt: f32) -> Vec<Option<usize>> {
    let RaceState {
        track,
        cars,
        rng,
        race_complete,
        ..
    } = state;
    let race_complete = *race_complete;
    let player_speed = cars.iter().find(|c| c.is_player()).map(|c| c.speed);
    let others: Vec<(u32, Vec3)> = cars.iter().map(|c| (c.id, c.pos)).collect();

    let mut prev_ahead = Vec::with_capacity(cars.len());
    for car in cars.iter_mut() {
        prev_ahead.push(track.first_ahead(car.pos.z).map(|(index, _)| index));

        if !race_complete {
            car.laps.advance_timers(dt);
        }
        if let Some(driver) = car.driver_mut() {
            driver.grass_sound_timer -= dt;
        }
        if car.is_crashed() && !car.update_reset(dt) {
            continue;
        }

        if car.is_player() {
            car.drive_human(input.steer, input.accelerate, input.brake, race_complete, dt);
        } else {
            car.drive_ai(race_complete, player_speed, dt);
        }
        car.advance(dt);
        car.sync_segment(track);
        car.retarget_ai(track, &others, race_complete, dt, rng);
    }
    prev_ahead
}

fn resolve_collisions(state: &mut RaceState) {
    let contacts = resolve_car_collisions(&mut state.cars);
    if contacts.is_empty() {
        return;
    }
    for car in state.cars.iter_mut() {
        car.sync_segment(&mut state.track);
    }

    let Some(player_id) = state.player().map(|c| c.id) else {
        return;
    };
    for contact in contacts {
        let event = if contact.kind == ContactKind::RearEnd && contact.front_id == player_id {
            RaceEvent::BumpBehind
        } else if contact.rear_id == player_id || contact.front_id == player_id {
            RaceEvent::Bump
        } else {
            continue;
        };
        state.push_event(event);
    }
}

/// Scenery, checkpoints and grass, against the segment ahead of each car
fn check_track(state: &mut RaceState, prev_ahead: &[Option<usize>]) {
    let num_laps = state.settings.laps;
    let mut events = Vec::new();

    for (car, prev) in state.cars.iter_mut().zip(prev_ahead) {
        if car.is_crashed() {
            continue;
        }
        let Some((ahead, _)) = state.track.first_ahead(car.pos.z) else {
            continue;
        };
        let Some(segment) = state.track.get(ahead) else {
            continue;
        };
        let is_player = car.is_player();

        if scenery_hit(&state.track, ahead, car.pos.x) {
            car.crash(true);
            if is_player {
                events.push(RaceEvent::Explosion);
            }
        }

        // Collisions can push a car back, so never walk the range backwards
        let from = prev.unwrap_or(ahead).min(ahead);
        if let Some(done) = car.laps.cross_segments(&state.track, from, ahead) {
            if is_player {
                log::info!("Lap {} finished in {}", done.lap - 1, format_time(done.time));
                events.push(RaceEvent::LapComplete {
                    lap: done.lap,
                    time: done.time,
                });
                if done.fastest {
                    events.push(RaceEvent::FastestLap);
                }
                if done.lap == num_laps {
                    events.push(RaceEvent::FinalLap);
                }
            }
        }

        car.on_grass = car.pos.x.abs() + GRASS_MARGIN > segment.half_width();
        if car.on_grass {
            if let Some(driver) = car.driver_mut() {
                if driver.grass_sound_timer <= 0.0 {
                    driver.grass_sound_timer = GRASS_SOUND_REPEAT;
                    events.push(RaceEvent::HitGrass);
                }
            }
            // Way too far off the track: put the car back
            if car.pos.x.abs() > MAX_OFF_TRACK_X {
                car.crash(false);
            }
        }
    }

    for event in events {
        state.push_event(event);
    }
}

/// End the race when the player finishes the last lap or a lap drags on too long
fn check_completion(state: &mut RaceState) {
    if state.race_complete {
        return;
    }
    let Some(player) = state.player() else {
        return;
    };
    let (lap, lap_time, race_time) = (player.laps.lap, player.laps.lap_time, player.laps.race_time);

    if lap_time >= state.settings.lap_time_limit {
        log::info!("Time up on lap {}", lap);
        state.time_up = true;
        state.race_complete = true;
        state.push_event(RaceEvent::TimeUp);
    } else if lap > state.settings.laps {
        log::info!("Race complete in {}", format_time(race_time));
        state.race_complete = true;
        state.push_event(RaceEvent::RaceComplete);
    }
}

fn follow_camera(state: &mut RaceState) {
    if let Some(pos) = state.followed().map(|car| car.pos) {
        state.camera.pos = Vec3::new(pos.x, CAMERA_HEIGHT, pos.z + CAMERA_FOLLOW_DISTANCE);
    }
}

/// Track offset the camera passed through moving from `old_z` to `new_z`
///
/// Each segment's offsets are applied in proportion to how much of it the
/// movement covered, so the result is the same whether the distance is
/// travelled in one tick or several. Moving backwards, or either end being
/// off the track, gives no change.
pub fn camera_offset_change(track: &Track, old_z: f32, new_z: f32) -> Vec2 {
    let distance = old_z - new_z;
    if distance <= 0.0 {
        return Vec2::ZERO;
    }
    let (Some((prev_ahead, _)), Some((new_ahead, _))) = (track.first_ahead(old_z), track.first_ahead(new_z))
    else {
        return Vec2::ZERO;
    };
    let offsets = |index: usize| track.get(index).map(|s| s.offsets()).unwrap_or(Vec2::ZERO);

    if new_ahead > prev_ahead {
        let old_boundary = (old_z / SPACING).floor() * SPACING;
        let new_boundary = (new_z / SPACING).floor() * SPACING + SPACING;
        let fraction_first = ((old_z - old_boundary) / SPACING).clamp(0.0, 1.0);
        let fraction_last = ((new_boundary - new_z) / SPACING).clamp(0.0, 1.0);

        let passed: Vec2 = (prev_ahead + 1..new_ahead).map(offsets).sum();
        offsets(prev_ahead) * fraction_first + offsets(new_ahead) * fraction_last + passed
    } else {
        offsets(prev_ahead) * (distance / SPACING).clamp(0.0, 1.0)
    }
}

/// Keep the background scroll within +/- its width
fn wrap_background(x: f32) -> f32 {
    if x.abs() > BACKGROUND_WIDTH {
        x % BACKGROUND_WIDTH
    } else {
        x
    }
}
