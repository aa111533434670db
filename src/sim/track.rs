//! Track model: segments, scenery and procedural lap generation
//!
//! The track is a list of segments spaced `SPACING` apart along -Z. Each
//! segment stores how its lateral/vertical position differs from the previous
//! one; curves and hills only exist once those deltas are accumulated while
//! walking away from the camera. Because the camera looks down -Z, positive X
//! is to the left on screen.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::inverse_lerp;

/// 8-bit RGB colour
pub type Rgb = [u8; 3];

pub const TRACK_COLOUR: Rgb = [35, 96, 198];
pub const START_LINE_COLOUR: Rgb = [255, 255, 255];

/// Source sprite sizes (pixels) of the scenery art
pub const BILLBOARD_SIZE: Vec2 = Vec2::new(400.0, 240.0);
pub const LAMP_SIZE: Vec2 = Vec2::new(480.0, 420.0);
pub const GANTRY_SIZE: Vec2 = Vec2::new(1600.0, 360.0);

/// Billboard artwork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillboardArt {
    Billboard00,
    Billboard01,
    Billboard02,
    Billboard03,
    ArrowLeft,
    ArrowRight,
}

/// What a scenery item is (determines its sprite)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneryKind {
    Billboard(BillboardArt),
    LampLeft,
    LampRight,
    StartGantry,
}

/// Lateral range, relative to the scenery's anchor, that crashes a car
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionZone {
    pub left: f32,
    pub right: f32,
}

impl CollisionZone {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// A static trackside decoration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenery {
    pub kind: SceneryKind,
    /// Lateral world position of the anchor (bottom centre)
    pub x: f32,
    /// Source sprite size before scaling
    pub size: Vec2,
    pub scale: f32,
    /// Only drawn when further than this from the camera
    pub min_draw_distance: f32,
    /// Only drawn when fewer than this many segments ahead
    pub max_draw_distance: f32,
    pub collision_zones: Vec<CollisionZone>,
}

impl Scenery {
    pub fn billboard(x: f32, art: BillboardArt, view_distance: usize) -> Self {
        let scale = 2.0;
        let half_width = BILLBOARD_SIZE.x / 2.0 * scale;
        Self {
            kind: SceneryKind::Billboard(art),
            x,
            size: BILLBOARD_SIZE,
            scale,
            min_draw_distance: 0.0,
            max_draw_distance: (view_distance / 2) as f32,
            collision_zones: vec![CollisionZone::new(-half_width, half_width)],
        }
    }

    pub fn lamp_left(view_distance: usize) -> Self {
        Self {
            kind: SceneryKind::LampLeft,
            x: LAMP_X,
            size: LAMP_SIZE,
            scale: 2.0,
            min_draw_distance: 0.0,
            max_draw_distance: (view_distance / 2) as f32,
            collision_zones: vec![CollisionZone::new(350.0, 1200.0)],
        }
    }

    pub fn lamp_right(view_distance: usize) -> Self {
        Self {
            kind: SceneryKind::LampRight,
            x: -LAMP_X,
            size: LAMP_SIZE,
            scale: 2.0,
            min_draw_distance: 0.0,
            max_draw_distance: (view_distance / 2) as f32,
            collision_zones: vec![CollisionZone::new(-1200.0, -350.0)],
        }
    }

    pub fn start_gantry(view_distance: usize) -> Self {
        Self {
            kind: SceneryKind::StartGantry,
            x: 0.0,
            size: GANTRY_SIZE,
            scale: 4.0,
            min_draw_distance: 1.0,
            max_draw_distance: view_distance as f32,
            collision_zones: vec![
                CollisionZone::new(-3000.0, -2400.0),
                CollisionZone::new(2400.0, 3000.0),
            ],
        }
    }

    /// True if lateral position `x` is strictly inside any collision zone
    pub fn collides_at(&self, x: f32) -> bool {
        self.collision_zones
            .iter()
            .any(|zone| self.x + zone.left < x && x < self.x + zone.right)
    }
}

/// One slice of track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Lateral offset relative to the previous segment
    pub dx: f32,
    /// Vertical offset relative to the previous segment
    pub dy: f32,
    /// Full road width
    pub width: f32,
    pub colour: Rgb,
    /// CPU cars won't target a speed above this while on this segment
    pub cpu_max_target_speed: Option<f32>,
    pub scenery: Vec<Scenery>,
    /// Crossing this segment counts toward lap completion
    pub is_start_line: bool,
    /// Ids of cars currently on this segment
    #[serde(skip)]
    pub cars: Vec<u32>,
}

impl Default for TrackSegment {
    fn default() -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            width: TRACK_W,
            colour: TRACK_COLOUR,
            cpu_max_target_speed: None,
            scenery: Vec::new(),
            is_start_line: false,
            cars: Vec::new(),
        }
    }
}

impl TrackSegment {
    pub fn with_offsets(dx: f32, dy: f32) -> Self {
        Self {
            dx,
            dy,
            ..Default::default()
        }
    }

    pub fn start_line(view_distance: usize) -> Self {
        Self {
            colour: START_LINE_COLOUR,
            scenery: vec![Scenery::start_gantry(view_distance)],
            is_start_line: true,
            ..Default::default()
        }
    }

    #[inline]
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    #[inline]
    pub fn offsets(&self) -> Vec2 {
        Vec2::new(self.dx, self.dy)
    }
}

/// World Z position of segment `index`
#[inline]
pub fn segment_z(index: usize) -> f32 {
    -(index as f32) * SPACING
}

/// The full generated track
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    segments: Vec<TrackSegment>,
}

impl Track {
    pub fn new(segments: Vec<TrackSegment>) -> Self {
        Self { segments }
    }

    /// Build a track from bare `(dx, dy)` deltas
    pub fn from_offsets(offsets: &[(f32, f32)]) -> Self {
        Self::new(
            offsets
                .iter()
                .map(|&(dx, dy)| TrackSegment::with_offsets(dx, dy))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TrackSegment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    fn checked_index(&self, index: f32) -> Option<usize> {
        if !index.is_finite() || index < 0.0 {
            return None;
        }
        let index = index as usize;
        (index < self.segments.len()).then_some(index)
    }

    /// Segment a car at `z` is on. Segment 0 covers Z 0 to -0.999, etc.
    pub fn segment_for_z(&self, z: f32) -> Option<usize> {
        self.checked_index(-(z / SPACING).trunc())
    }

    /// Index and Z of the first segment at or ahead of `z`
    pub fn first_ahead(&self, z: f32) -> Option<(usize, f32)> {
        let index = self.checked_index(-(z / SPACING).floor())?;
        Some((index, segment_z(index)))
    }

    /// Move a car's registration from one segment to another
    pub fn relocate_car(&mut self, car_id: u32, from: Option<usize>, to: usize) {
        if from == Some(to) {
            return;
        }
        if let Some(old) = from.and_then(|i| self.segments.get_mut(i)) {
            old.cars.retain(|&id| id != car_id);
        }
        if let Some(new) = self.segments.get_mut(to) {
            new.cars.push(car_id);
        }
    }

    /// Walk up to `count` segments ahead of `camera_z`, accumulating offsets
    pub fn walk(&self, camera_z: f32, count: usize) -> OffsetWalk<'_> {
        let start = self.first_ahead(camera_z);
        let first_fraction = start
            .map(|(_, piece_z)| inverse_lerp(piece_z - SPACING, piece_z, camera_z - SPACING))
            .unwrap_or(0.0);
        OffsetWalk {
            track: self,
            next: start.map(|(index, _)| index),
            remaining: count,
            first_fraction,
            first: true,
            delta: Vec2::ZERO,
            offset: Vec2::ZERO,
        }
    }
}

/// A segment visited during an offset walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkStep {
    pub index: usize,
    /// Segment's world Z
    pub z: f32,
    /// Running sum of segment deltas (the local curvature)
    pub delta: Vec2,
    /// Running sum of `delta`: where this segment is drawn relative to straight ahead
    pub offset: Vec2,
}

/// Iterator produced by [`Track::walk`]
pub struct OffsetWalk<'a> {
    track: &'a Track,
    next: Option<usize>,
    remaining: usize,
    first_fraction: f32,
    first: bool,
    delta: Vec2,
    offset: Vec2,
}

impl Iterator for OffsetWalk<'_> {
    type Item = WalkStep;

    fn next(&mut self) -> Option<WalkStep> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.next?;
        let segment = self.track.get(index)?;
        self.remaining -= 1;
        self.next = Some(index + 1);

        if self.first {
            // Interpolate into the first segment so corners don't judder
            self.delta = segment.offsets() * self.first_fraction;
            self.first = false;
        } else {
            self.delta += segment.offsets();
        }
        self.offset += self.delta;

        Some(WalkStep {
            index,
            z: segment_z(index),
            delta: self.delta,
            offset: self.offset,
        })
    }
}

/// Billboards every `interval` segments, otherwise lamps every 30
fn generate_scenery(
    i: usize,
    art: BillboardArt,
    interval: usize,
    lamps: bool,
    view_distance: usize,
) -> Vec<Scenery> {
    if i % interval == 0 {
        vec![
            Scenery::billboard(BILLBOARD_X, art, view_distance),
            Scenery::billboard(-BILLBOARD_X, art, view_distance),
        ]
    } else if lamps && i % 30 == 0 {
        vec![
            Scenery::lamp_left(view_distance),
            Scenery::lamp_right(view_distance),
        ]
    } else {
        Vec::new()
    }
}

/// Builder for one lap's worth of sections
struct LapBuilder<'a> {
    segments: &'a mut Vec<TrackSegment>,
    view_distance: usize,
}

impl LapBuilder<'_> {
    /// Append `count` segments; `make` receives the index within the section
    fn section(&mut self, count: usize, mut make: impl FnMut(usize) -> TrackSegment) {
        self.segments.extend((0..count).map(&mut make));
    }

    /// Section with fixed offsets and the usual billboard/lamp pattern
    fn scenic(&mut self, count: usize, dx: f32, dy: f32, art: BillboardArt) {
        let view_distance = self.view_distance;
        self.section(count, |i| TrackSegment {
            dx,
            dy,
            scenery: generate_scenery(i, art, 40, true, view_distance),
            ..Default::default()
        });
    }

    /// Section with chevron arrows every 10 segments and a CPU speed cap
    fn chevrons(&mut self, count: usize, dx: f32, cpu_cap: f32, art: BillboardArt, lamps: bool) {
        let view_distance = self.view_distance;
        self.section(count, |i| TrackSegment {
            dx,
            cpu_max_target_speed: Some(cpu_cap),
            scenery: generate_scenery(i, art, 10, lamps, view_distance),
            ..Default::default()
        });
    }
}

/// Procedurally generate the race track: one lap layout repeated `laps + 1` times
///
/// Negative X offsets turn right from the camera's point of view.
pub fn make_track(laps: u32, view_distance: usize) -> Track {
    use BillboardArt::*;

    let mut segments = Vec::new();
    for _ in 0..=laps {
        let mut lap = LapBuilder {
            segments: &mut segments,
            view_distance,
        };

        lap.scenic(15, 0.0, 0.0, Billboard02);
        lap.section(1, |_| TrackSegment::start_line(view_distance));
        lap.section(SECTION_SHORT, |_| TrackSegment::default());

        // Mild right turn followed by short straight
        lap.scenic(SECTION_MEDIUM, -4.0, 0.0, Billboard00);
        lap.scenic(SECTION_SHORT, 0.0, 0.0, Billboard01);

        // Slight downward slope into a moderate right hand turn
        lap.scenic(SECTION_VERY_SHORT, 0.0, -1.0, Billboard00);
        lap.scenic(SECTION_VERY_SHORT, 0.0, -2.0, Billboard00);
        lap.scenic(SECTION_VERY_SHORT, -2.0, -1.0, Billboard00);
        lap.scenic(SECTION_VERY_SHORT, -5.0, 0.0, Billboard03);
        lap.scenic(SECTION_MEDIUM, -10.0, 0.0, Billboard03);

        lap.scenic(SECTION_SHORT, 0.0, 0.0, Billboard00);

        // Medium-sharp left turn, slight upward slope
        lap.section(SECTION_MEDIUM, |i| TrackSegment {
            dx: 13.0,
            dy: 1.0,
            scenery: generate_scenery(i, ArrowLeft, 10, true, view_distance),
            ..Default::default()
        });

        lap.scenic(SECTION_MEDIUM, 0.0, 0.0, Billboard02);

        // Small hill
        lap.scenic(SECTION_MEDIUM, 0.0, 2.0, Billboard02);

        // Slightly down and to the right
        lap.scenic(SECTION_LONG, -3.0, -1.0, Billboard01);

        // Steep downward curve
        lap.scenic(SECTION_MEDIUM, 0.0, -4.0, Billboard00);

        lap.scenic(SECTION_LONG, 0.0, 2.0, Billboard03);

        // Left and up, gradually tightening
        for j in 1..10 {
            lap.scenic(SECTION_VERY_SHORT, j as f32, j as f32, Billboard00);
        }

        // Downward curve, increasing then easing
        for j in 1..10 {
            lap.scenic(SECTION_VERY_SHORT, 0.0, -(j as f32), Billboard00);
        }

        // Straight with chevrons at the end; CPU cars slow down here
        lap.section(SECTION_MEDIUM, |_| TrackSegment {
            cpu_max_target_speed: Some(60.0),
            ..Default::default()
        });
        lap.chevrons(SECTION_SHORT, 0.0, 58.0, ArrowRight, false);
        lap.chevrons(SECTION_SHORT, 0.0, 58.0, ArrowRight, false);

        // Sharp right turn, easing off at the end
        lap.chevrons(SECTION_SHORT, -15.0, 55.0, ArrowRight, false);
        lap.chevrons(SECTION_SHORT, -13.0, 57.0, ArrowRight, false);
        lap.scenic(SECTION_SHORT, -11.0, 0.0, Billboard00);
        lap.scenic(SECTION_SHORT, -9.0, 0.0, Billboard00);

        lap.scenic(SECTION_MEDIUM, 0.0, 0.0, Billboard00);

        // Cosine hills
        lap.section(SECTION_LONG, |i| TrackSegment {
            dy: (i as f32 / 20.0).cos() * 5.0,
            scenery: generate_scenery(i, Billboard00, 40, true, view_distance),
            ..Default::default()
        });

        // Mild upward slope so the background scroll roughly returns to where it started
        lap.scenic(SECTION_LONG, 0.0, 0.25, Billboard03);
        lap.scenic(SECTION_SHORT, 0.0, 0.0, Billboard03);
    }

    log::debug!("Generated track: {} segments, {} laps", segments.len(), laps);
    Track::new(segments)
}
