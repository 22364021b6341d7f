use crate::error::DrawingResult;
use crate::render::{DrawingFrame, Renderer};

/// No-op renderer used by tests and headless engine usage.
///
/// It still validates frame content so tests can catch invalid geometry before
/// a real backend is plugged in.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub last_line_count: usize,
    pub last_polygon_count: usize,
    pub last_ellipse_count: usize,
    pub last_text_count: usize,
    pub frames_rendered: usize,
}

impl Renderer for NullRenderer {
    fn render(&mut self, frame: &DrawingFrame) -> DrawingResult<()> {
        frame.validate()?;
        self.last_line_count = frame.lines.len();
        self.last_polygon_count = frame.polygons.len();
        self.last_ellipse_count = frame.ellipses.len();
        self.last_text_count = frame.texts.len();
        self.frames_rendered += 1;
        Ok(())
    }
}
