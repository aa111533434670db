//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

use crate::sim::track::Rgb;

/// Simple 2D vertex with position (normalised device coordinates) and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    /// Size of one vertex in a vertex buffer
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();
}

/// Opaque float color from an 8-bit RGB triple
pub fn rgba(rgb: Rgb) -> [f32; 4] {
    [
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
        1.0,
    ]
}

/// Colors for the road and sky
pub mod colors {
    use crate::sim::track::Rgb;

    pub const TRACKSIDE_1: Rgb = [0, 77, 180];
    pub const TRACKSIDE_2: Rgb = [50, 77, 170];
    pub const STRIPE: Rgb = [70, 192, 255];
    pub const YELLOW_LINE: Rgb = [0, 161, 88]; // Looks yellow at night
    pub const RUMBLE_1: Rgb = [0, 116, 255];
    pub const RUMBLE_2: Rgb = [0, 58, 135];
    /// Sky fill when the background has scrolled down
    pub const SKY_HIGH: Rgb = [0, 20, 117];
    pub const SKY_LOW: Rgb = [0, 77, 180];
    /// Placeholder fills for sprites when no textures are loaded
    pub const SPRITE_CAR: Rgb = [220, 40, 60];
    pub const SPRITE_SCENERY: Rgb = [240, 240, 240];
    pub const SPRITE_LIGHTS: Rgb = [255, 200, 0];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 6 * 4);
        let vertices = [Vertex::new(0.5, -0.5, rgba(colors::STRIPE))];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), Vertex::STRIDE);
    }

    #[test]
    fn test_rgba() {
        assert_eq!(rgba([255, 0, 51]), [1.0, 0.0, 0.2, 1.0]);
    }
}
