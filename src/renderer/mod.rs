//! Rendering module
//!
//! Projects the track, scenery and cars into a painter's-order draw list and
//! tessellates it into vertex data. No GPU or windowing code lives here.

pub mod compositor;
pub mod projection;
pub mod shapes;
pub mod vertex;

pub use compositor::{DrawCommand, DrawList, SpriteId, Surface, compose};
pub use projection::{ProjectedSprite, Viewport, project, project_sprite};
pub use vertex::Vertex;
