mod frame;
mod null_renderer;
mod primitives;

pub use frame::DrawingFrame;
pub use null_renderer::NullRenderer;
pub use primitives::{
    EllipsePrimitive, LinePrimitive, PolygonPrimitive, TextHAlign, TextPrimitive,
};

use crate::error::DrawingResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized `DrawingFrame`, so rasterization stays
/// isolated from anchors, interaction and alert logic.
pub trait Renderer {
    fn render(&mut self, frame: &DrawingFrame) -> DrawingResult<()>;
}
