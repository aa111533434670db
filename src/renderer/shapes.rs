//! Triangle generation for draw lists
//!
//! Converts screen-pixel draw commands into vertex data in normalised device
//! coordinates (x right, y up, -1..1), ready for a vertex buffer.

use glam::Vec2;

use super::compositor::{DrawCommand, DrawList, SpriteId};
use super::projection::Viewport;
use super::vertex::{Vertex, colors, rgba};

/// Map a screen pixel (origin top-left, y down) to NDC
#[inline]
pub fn to_ndc(point: Vec2, viewport: &Viewport) -> [f32; 2] {
    [
        point.x / viewport.width * 2.0 - 1.0,
        1.0 - point.y / viewport.height * 2.0,
    ]
}

/// Generate vertices for a filled quad (fan of two triangles)
pub fn quad(points: &[Vec2; 4], color: [f32; 4], viewport: &Viewport) -> [Vertex; 6] {
    let v = points.map(|p| {
        let [x, y] = to_ndc(p, viewport);
        Vertex::new(x, y, color)
    });
    [v[0], v[1], v[2], v[0], v[2], v[3]]
}

/// Generate vertices for an axis-aligned rectangle
pub fn rect(top_left: Vec2, size: Vec2, color: [f32; 4], viewport: &Viewport) -> [Vertex; 6] {
    let points = [
        top_left,
        top_left + Vec2::new(size.x, 0.0),
        top_left + size,
        top_left + Vec2::new(0.0, size.y),
    ];
    quad(&points, color, viewport)
}

/// Flat color standing in for a sprite's texture
fn sprite_color(sprite: &SpriteId) -> [f32; 4] {
    match sprite {
        SpriteId::Car { .. } => rgba(colors::SPRITE_CAR),
        SpriteId::Scenery(_) => rgba(colors::SPRITE_SCENERY),
        SpriteId::StartLights(_) => rgba(colors::SPRITE_LIGHTS),
    }
}

/// Generate vertices for a whole draw list, preserving painter's order
///
/// The sky fill comes first so everything else draws over it.
pub fn draw_list(list: &DrawList, viewport: &Viewport) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((list.len() + 1) * 6);

    let screen = Vec2::new(viewport.width, viewport.height);
    vertices.extend(rect(Vec2::ZERO, screen, rgba(list.sky), viewport));

    for command in &list.commands {
        match command {
            DrawCommand::Polygon { points, colour, .. } => {
                vertices.extend(quad(points, rgba(*colour), viewport));
            }
            DrawCommand::Sprite { sprite, pos, size } => {
                vertices.extend(rect(*pos, *size, sprite_color(sprite), viewport));
            }
        }
    }

    vertices
}

/// Raw bytes for uploading to a vertex buffer
pub fn vertex_bytes(vertices: &[Vertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::compositor::Surface;

    fn viewport() -> Viewport {
        Viewport::new(200.0, 100.0)
    }

    #[test]
    fn test_ndc_corners() {
        assert_eq!(to_ndc(Vec2::ZERO, &viewport()), [-1.0, 1.0]);
        assert_eq!(to_ndc(Vec2::new(200.0, 100.0), &viewport()), [1.0, -1.0]);
        assert_eq!(to_ndc(Vec2::new(100.0, 50.0), &viewport()), [0.0, 0.0]);
    }

    #[test]
    fn test_draw_list_tessellation() {
        let list = DrawList {
            sky: colors::SKY_LOW,
            background_offset: Vec2::ZERO,
            commands: vec![
                DrawCommand::Polygon {
                    surface: Surface::Road,
                    points: [
                        Vec2::new(0.0, 100.0),
                        Vec2::new(50.0, 50.0),
                        Vec2::new(150.0, 50.0),
                        Vec2::new(200.0, 100.0),
                    ],
                    colour: colors::STRIPE,
                },
                DrawCommand::Sprite {
                    sprite: SpriteId::StartLights(2),
                    pos: Vec2::new(50.0, 0.0),
                    size: Vec2::new(100.0, 50.0),
                },
            ],
        };
        let vertices = draw_list(&list, &viewport());
        assert_eq!(vertices.len(), 18);
        // Sky first, then the list in order
        assert_eq!(vertices[0].color, rgba(colors::SKY_LOW));
        assert_eq!(vertices[6].color, rgba(colors::STRIPE));
        assert_eq!(vertices[12].color, rgba(colors::SPRITE_LIGHTS));
        assert_eq!(vertices[12].position, [-0.5, 1.0]);
        assert_eq!(vertex_bytes(&vertices).len(), 18 * Vertex::STRIDE);
    }
}
