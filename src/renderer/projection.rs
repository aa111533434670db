//! Perspective projection from world space to screen pixels
//!
//! The camera looks down -Z with no rotation, so projection is a divide by
//! depth. Because depth is negative in front of the camera, world +X lands
//! on the left of the screen.

use glam::{Vec2, Vec3};

use crate::settings::RaceSettings;

/// Screen the projector maps onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Pixels per world unit at depth 1
    pub scale: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
        }
    }

    pub fn from_settings(settings: &RaceSettings) -> Self {
        Self::new(settings.screen_width, settings.screen_height)
    }

    #[inline]
    pub fn centre(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// A sprite after projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedSprite {
    /// Screen position of the anchor point (bottom centre of the sprite)
    pub pos: Vec2,
    /// Size in pixels at this depth
    pub size: Vec2,
}

impl ProjectedSprite {
    /// Where to blit the sprite so it stands on its anchor point
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.pos.x - self.size.x / 2.0, self.pos.y - self.size.y)
    }
}

/// Project a world point to the screen
///
/// Returns `None` for points at or behind `clipping_plane` (a camera-relative
/// Z, negative in front of the camera).
pub fn project(point: Vec3, camera: Vec3, viewport: &Viewport, clipping_plane: f32) -> Option<Vec2> {
    let p = point - camera;
    if p.z >= clipping_plane {
        return None;
    }
    Some(Vec2::new(p.x / p.z, p.y / p.z) * viewport.scale + viewport.centre())
}

/// Project a sprite anchored at `point`, scaling `size` by distance
pub fn project_sprite(
    point: Vec3,
    size: Vec2,
    camera: Vec3,
    viewport: &Viewport,
    clipping_plane: f32,
) -> Option<ProjectedSprite> {
    let pos = project(point, camera, viewport, clipping_plane)?;
    let depth = camera.z - point.z;
    Some(ProjectedSprite {
        pos,
        size: size * viewport.scale / depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use proptest::prelude::*;

    fn viewport() -> Viewport {
        Viewport::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    #[test]
    fn test_known_projection() {
        let camera = Vec3::new(0.0, CAMERA_HEIGHT, 0.0);
        let p = project(Vec3::new(1500.0, 0.0, -10.0), camera, &viewport(), CLIPPING_PLANE).unwrap();
        // +X is on the left, the road is below the horizon
        assert_eq!(p, Vec2::new(480.0 - 150.0, 270.0 + 40.0));

        let sprite = project_sprite(Vec3::new(0.0, 0.0, -10.0), Vec2::new(400.0, 240.0), camera, &viewport(), CLIPPING_PLANE)
            .unwrap();
        assert_eq!(sprite.size, Vec2::new(40.0, 24.0));
        assert_eq!(sprite.top_left(), Vec2::new(460.0, 310.0 - 24.0));
    }

    #[test]
    fn test_clip_plane_is_invisible() {
        let camera = Vec3::new(0.0, CAMERA_HEIGHT, -5.0);
        let on_plane = Vec3::new(0.0, 0.0, -5.0 + CLIPPING_PLANE);
        assert_eq!(project(on_plane, camera, &viewport(), CLIPPING_PLANE), None);
        assert_eq!(project(Vec3::new(0.0, 0.0, -4.0), camera, &viewport(), CLIPPING_PLANE), None);
        assert!(project(on_plane, camera, &viewport(), CLIPPING_PLANE_CARS).is_some());
    }

    #[test]
    fn test_scale_applies() {
        let camera = Vec3::ZERO;
        let doubled = Viewport {
            scale: 2.0,
            ..viewport()
        };
        let p = project(Vec3::new(-10.0, 0.0, -1.0), camera, &doubled, CLIPPING_PLANE).unwrap();
        assert_eq!(p, Vec2::new(480.0 + 20.0, 270.0));
    }

    proptest! {
        #[test]
        fn prop_projection_is_pure_and_clipped(
            x in -5000.0f32..5000.0,
            y in -1000.0f32..1000.0,
            z in -300.0f32..10.0,
            cam_z in -300.0f32..0.0,
        ) {
            let camera = Vec3::new(0.0, CAMERA_HEIGHT, cam_z);
            let point = Vec3::new(x, y, z);
            let first = project(point, camera, &viewport(), CLIPPING_PLANE);
            prop_assert_eq!(first, project(point, camera, &viewport(), CLIPPING_PLANE));
            prop_assert_eq!(first.is_none(), z - cam_z >= CLIPPING_PLANE);
        }
    }
}
