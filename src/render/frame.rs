use crate::core::Viewport;
use crate::error::{DrawingError, DrawingResult};
use crate::render::{EllipsePrimitive, LinePrimitive, PolygonPrimitive, TextPrimitive};

/// Backend-agnostic scene for one drawing-tool pass.
///
/// Filled polygons are painted first, then ellipses, lines and texts.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingFrame {
    pub viewport: Viewport,
    pub polygons: Vec<PolygonPrimitive>,
    pub ellipses: Vec<EllipsePrimitive>,
    pub lines: Vec<LinePrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl DrawingFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            polygons: Vec::new(),
            ellipses: Vec::new(),
            lines: Vec::new(),
            texts: Vec::new(),
        }
    }

    pub fn validate(&self) -> DrawingResult<()> {
        if !self.viewport.is_valid() {
            return Err(DrawingError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }

        for polygon in &self.polygons {
            polygon.validate()?;
        }
        for ellipse in &self.ellipses {
            ellipse.validate()?;
        }
        for line in &self.lines {
            line.validate()?;
        }
        for text in &self.texts {
            text.validate()?;
        }

        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
            && self.polygons.is_empty()
            && self.ellipses.is_empty()
            && self.texts.is_empty()
    }
}
