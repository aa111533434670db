//! Road compositor: turns the race state into a painter's-order draw list
//!
//! Segments are visited nearest first, accumulating curvature offsets as
//! they go. Each segment's polygons, scenery and cars are queued, then the
//! whole queue is reversed so the far distance is drawn first and nearer
//! things paint over it.

use glam::{Vec2, Vec3};

use super::projection::{Viewport, project, project_sprite};
use super::vertex::colors;
use crate::consts::*;
use crate::remap;
use crate::remap_clamp;
use crate::sim::car::{CAR_DRAW_SCALE, CAR_SPRITE_SIZE, Car, CrashState};
use crate::sim::state::RaceState;
use crate::sim::track::{Rgb, SceneryKind, TrackSegment, WalkStep};

/// Which part of the road a polygon belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Stripe,
    YellowLine,
    Road,
    Rumble,
    Trackside,
}

/// Animation frame of a car sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarFrame {
    Stopped,
    Rolling,
    Braking,
    /// Explosion animation frame
    Exploding(u32),
}

/// Which image a sprite command shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteId {
    Scenery(SceneryKind),
    /// Start gantry showing countdown lights 0-5
    StartLights(u32),
    Car {
        letter: char,
        /// Viewing angle, -4 (seen turning hard left) to 4
        angle: i32,
        frame: CarFrame,
    },
}

/// One draw operation in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Polygon {
        surface: Surface,
        points: [Vec2; 4],
        colour: Rgb,
    },
    Sprite {
        sprite: SpriteId,
        /// Top-left corner
        pos: Vec2,
        size: Vec2,
    },
}

/// A frame's worth of drawing, in painter's order
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    /// Flat fill behind everything
    pub sky: Rgb,
    /// Top-left of the scrolling background image
    pub background_offset: Vec2,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn sprites(&self) -> impl Iterator<Item = (&SpriteId, Vec2, Vec2)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Sprite { sprite, pos, size } => Some((sprite, *pos, *size)),
            DrawCommand::Polygon { .. } => None,
        })
    }
}

/// Screen positions of one segment's cross-section
#[derive(Debug, Clone, Copy)]
struct Edges {
    left: Vec2,
    right: Vec2,
    stripe_left: Vec2,
    stripe_right: Vec2,
    rumble_left: Vec2,
    rumble_right: Vec2,
    yellow_left_outer: Vec2,
    yellow_left_inner: Vec2,
    yellow_right_outer: Vec2,
    yellow_right_inner: Vec2,
}

impl Edges {
    /// Project a segment's cross-section; every point shares one depth, so
    /// either all of them are visible or none are
    fn project(segment: &TrackSegment, z: f32, offset: Vec3, camera: Vec3, viewport: &Viewport) -> Option<Self> {
        let at = |x: f32| project(Vec3::new(x, 0.0, z) + offset, camera, viewport, CLIPPING_PLANE);
        // +X is screen left
        let left = segment.half_width();
        let right = -left;
        let yellow_left_outer = left - YELLOW_LINE_DISTANCE_FROM_EDGE;
        let yellow_right_outer = right + YELLOW_LINE_DISTANCE_FROM_EDGE;
        Some(Self {
            left: at(left)?,
            right: at(right)?,
            stripe_left: at(HALF_STRIPE_W)?,
            stripe_right: at(-HALF_STRIPE_W)?,
            rumble_left: at(left + HALF_RUMBLE_STRIP_W)?,
            rumble_right: at(right - HALF_RUMBLE_STRIP_W)?,
            yellow_left_outer: at(yellow_left_outer)?,
            yellow_left_inner: at(yellow_left_outer - HALF_YELLOW_LINE_W)?,
            yellow_right_outer: at(yellow_right_outer)?,
            yellow_right_inner: at(yellow_right_outer + HALF_YELLOW_LINE_W)?,
        })
    }
}

/// Frame of the start gantry lights
///
/// Counts up through 0-4 during the countdown, then flashes between 4 and 5
/// every half second.
pub fn start_lights_frame(start_timer: f32, timer: f32) -> u32 {
    if start_timer > 0.0 {
        remap(start_timer, 4.0, 0.0, 0.0, 4.0) as u32
    } else if (timer * 2.0) as u64 % 2 == 0 {
        4
    } else {
        5
    }
}

/// Which angled sprite to show for a CPU car
///
/// The further away and the more central the car, the straighter it looks;
/// the curvature of the road ahead adds to the angle. The followed car (demo
/// mode) is limited to the shallow angles the player's car uses.
pub fn cpu_sprite_angle(pos: Vec3, camera: Vec3, steering: f32, followed: bool) -> i32 {
    let z_distance = (camera.z - pos.z).max(1.0);
    let offset = (pos.x - camera.x) / z_distance - steering * 10.0;
    let angle = remap_clamp(offset, -200.0, 200.0, -4.0, 4.0) as i32;
    if followed { angle.clamp(-1, 1) } else { angle }
}

fn car_frame(car: &Car) -> CarFrame {
    match car.crash {
        CrashState::Exploding { ticks } => CarFrame::Exploding(ticks / 2),
        _ if car.speed == 0.0 => CarFrame::Stopped,
        _ if car.driver().is_some_and(|d| d.braking) => CarFrame::Braking,
        _ => CarFrame::Rolling,
    }
}

/// Keep a polygon only if some of it is above the bottom of the screen
fn push_polygon(out: &mut Vec<DrawCommand>, viewport: &Viewport, surface: Surface, points: [Vec2; 4], colour: Rgb) {
    if points.iter().any(|p| p.y < viewport.height) {
        out.push(DrawCommand::Polygon {
            surface,
            points,
            colour,
        });
    }
}

/// Build the draw list for the current camera
pub fn compose(state: &RaceState, viewport: &Viewport) -> DrawList {
    let camera = state.camera.pos;
    let detail = state.settings.detail;
    let mut commands = Vec::new();
    let mut prev: Option<Edges> = None;

    for (n, step) in state.track.walk(camera.z, state.settings.view_distance).enumerate() {
        let Some(segment) = state.track.get(step.index) else {
            break;
        };
        let i = step.index;
        let offset = Vec3::new(step.offset.x, step.offset.y, 0.0);
        let edges = Edges::project(segment, step.z, offset, camera, viewport);

        if let Some(edges) = edges {
            if let Some(prev) = prev {
                let out = &mut commands;
                // Stripe 3 segments on, 3 off
                if (i / 3) % 2 == 0 {
                    let points = [edges.stripe_left, edges.stripe_right, prev.stripe_right, prev.stripe_left];
                    push_polygon(out, viewport, Surface::Stripe, points, colors::STRIPE);
                }
                if detail.guide_lines_enabled() {
                    let points = [
                        prev.yellow_left_outer,
                        edges.yellow_left_outer,
                        edges.yellow_left_inner,
                        prev.yellow_left_inner,
                    ];
                    push_polygon(out, viewport, Surface::YellowLine, points, colors::YELLOW_LINE);
                    let points = [
                        prev.yellow_right_outer,
                        edges.yellow_right_outer,
                        edges.yellow_right_inner,
                        prev.yellow_right_inner,
                    ];
                    push_polygon(out, viewport, Surface::YellowLine, points, colors::YELLOW_LINE);
                }

                let points = [prev.left, edges.left, edges.right, prev.right];
                push_polygon(out, viewport, Surface::Road, points, segment.colour);

                if detail.rumble_enabled() {
                    let colour = if (i / 2) % 2 == 0 { colors::RUMBLE_1 } else { colors::RUMBLE_2 };
                    let points = [prev.rumble_left, prev.left, edges.left, edges.rumble_left];
                    push_polygon(out, viewport, Surface::Rumble, points, colour);
                    let points = [prev.rumble_right, prev.right, edges.right, edges.rumble_right];
                    push_polygon(out, viewport, Surface::Rumble, points, colour);
                }

                if detail.trackside_enabled() {
                    let colour = if (i / 5) % 2 == 0 { colors::TRACKSIDE_1 } else { colors::TRACKSIDE_2 };
                    let points = [
                        edges.left,
                        prev.left,
                        Vec2::new(0.0, prev.left.y),
                        Vec2::new(0.0, edges.left.y),
                    ];
                    push_polygon(out, viewport, Surface::Trackside, points, colour);
                    let edge = viewport.width - 1.0;
                    let points = [
                        edges.right,
                        prev.right,
                        Vec2::new(edge, prev.right.y),
                        Vec2::new(edge, edges.right.y),
                    ];
                    push_polygon(out, viewport, Surface::Trackside, points, colour);
                }
            }
            prev = Some(edges);
        }

        if detail.scenery_enabled() {
            let steps_ahead = (n + 1) as f32;
            add_scenery(&mut commands, state, segment, &step, steps_ahead, viewport);
        }
        add_cars(&mut commands, state, segment, &step, viewport);
    }

    commands.reverse();

    let background_offset = state.camera.background_offset;
    DrawList {
        sky: if background_offset.y > 0.0 {
            colors::SKY_HIGH
        } else {
            colors::SKY_LOW
        },
        background_offset,
        commands,
    }
}

fn add_scenery(
    out: &mut Vec<DrawCommand>,
    state: &RaceState,
    segment: &TrackSegment,
    step: &WalkStep,
    steps_ahead: f32,
    viewport: &Viewport,
) {
    let camera = state.camera.pos;
    for scenery in &segment.scenery {
        if steps_ahead * SPACING >= scenery.max_draw_distance || camera.z - step.z <= scenery.min_draw_distance {
            continue;
        }
        let pos = Vec3::new(scenery.x + step.offset.x, step.offset.y, step.z);
        let Some(projected) = project_sprite(pos, scenery.size * scenery.scale, camera, viewport, CLIPPING_PLANE)
        else {
            continue;
        };
        // Scenery right next to the camera scales to enormous sizes
        if projected.size.x >= viewport.width * 2.0 {
            log::debug!("Skipping oversized {:?} on segment {}", scenery.kind, step.index);
            continue;
        }
        let sprite = match scenery.kind {
            SceneryKind::StartGantry => SpriteId::StartLights(start_lights_frame(state.start_timer, state.timer)),
            kind => SpriteId::Scenery(kind),
        };
        out.push(DrawCommand::Sprite {
            sprite,
            pos: projected.top_left(),
            size: projected.size,
        });
    }
}

/// Cars on this segment, furthest first once the list is reversed
fn add_cars(out: &mut Vec<DrawCommand>, state: &RaceState, segment: &TrackSegment, step: &WalkStep, viewport: &Viewport) {
    let camera = state.camera.pos;
    let size = CAR_SPRITE_SIZE * CAR_DRAW_SCALE;
    let mut cars_to_draw: Vec<(f32, DrawCommand)> = Vec::new();

    for car in segment.cars.iter().filter_map(|&id| state.car(id)) {
        let followed = car.id == state.follow_car;
        let mut car_offset = Vec3::new(step.offset.x, step.offset.y, 0.0);

        // Part-way along the segment: ease towards the next one so the car
        // starts turning as it reaches it
        if car.pos.z.rem_euclid(SPACING) != 0.0 {
            let fraction = crate::inverse_lerp(step.z, step.z - SPACING, car.pos.z);
            let next = state.track.get(step.index + 1).map(|s| s.offsets()).unwrap_or(Vec2::ZERO);
            car_offset += Vec3::new(fraction * next.x, fraction * next.y, -fraction * SPACING);
            car_offset += Vec3::new(step.delta.x, step.delta.y, 0.0) * fraction;
        }

        // The followed car would turn before the camera does if offset
        if followed {
            car_offset.x = 0.0;
            car_offset.y = 0.0;
        }

        let pos = Vec3::new(car.pos.x, 0.0, step.z) + car_offset;
        let angle = match car.autopilot() {
            Some(autopilot) => cpu_sprite_angle(pos, camera, autopilot.steering, followed),
            None => car.steer_direction as i32,
        };

        let Some(projected) = project_sprite(pos, size, camera, viewport, CLIPPING_PLANE_CARS) else {
            continue;
        };
        if projected.size.x >= viewport.width {
            log::debug!("Skipping oversized car {}", car.id);
            continue;
        }
        let sprite = SpriteId::Car {
            letter: car.letter,
            angle,
            frame: car_frame(car),
        };
        cars_to_draw.push((
            car.pos.z,
            DrawCommand::Sprite {
                sprite,
                pos: projected.top_left(),
                size: projected.size,
            },
        ));
    }

    // Nearest first here; reversal puts the furthest first
    cars_to_draw.sort_by(|a, b| b.0.total_cmp(&a.0));
    out.extend(cars_to_draw.into_iter().map(|(_, command)| command));
}
