use crate::core::PixelPoint;
use crate::error::{DrawingError, DrawingResult};
use crate::style::{Color, DashStyle};

/// Draw command for one line segment in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePrimitive {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke_width: f64,
    pub color: Color,
    pub dash: DashStyle,
}

impl LinePrimitive {
    #[must_use]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64, stroke_width: f64, color: Color) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            stroke_width,
            color,
            dash: DashStyle::Solid,
        }
    }

    #[must_use]
    pub fn between(from: PixelPoint, to: PixelPoint, stroke_width: f64, color: Color) -> Self {
        Self::new(from.x, from.y, to.x, to.y, stroke_width, color)
    }

    #[must_use]
    pub fn with_dash(mut self, dash: DashStyle) -> Self {
        self.dash = dash;
        self
    }

    pub fn validate(self) -> DrawingResult<()> {
        if !self.x1.is_finite()
            || !self.y1.is_finite()
            || !self.x2.is_finite()
            || !self.y2.is_finite()
        {
            return Err(DrawingError::InvalidData(
                "line coordinates must be finite".to_owned(),
            ));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(DrawingError::InvalidData(
                "line stroke width must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}

/// Filled closed polygon in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonPrimitive {
    pub points: Vec<PixelPoint>,
    pub fill_color: Color,
}

impl PolygonPrimitive {
    #[must_use]
    pub fn new(points: Vec<PixelPoint>, fill_color: Color) -> Self {
        Self { points, fill_color }
    }

    pub fn validate(&self) -> DrawingResult<()> {
        if self.points.len() < 3 {
            return Err(DrawingError::InvalidData(
                "polygon needs at least three points".to_owned(),
            ));
        }
        if self.points.iter().any(|point| !point.is_finite()) {
            return Err(DrawingError::InvalidData(
                "polygon coordinates must be finite".to_owned(),
            ));
        }
        self.fill_color.validate()
    }
}

/// Axis-aligned ellipse outline with optional fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsePrimitive {
    pub center: PixelPoint,
    pub radius_x: f64,
    pub radius_y: f64,
    pub stroke_width: f64,
    pub stroke_color: Color,
    pub fill_color: Option<Color>,
}

impl EllipsePrimitive {
    pub fn validate(self) -> DrawingResult<()> {
        if !self.center.is_finite()
            || !self.radius_x.is_finite()
            || !self.radius_y.is_finite()
            || self.radius_x < 0.0
            || self.radius_y < 0.0
        {
            return Err(DrawingError::InvalidData(
                "ellipse geometry must be finite with radii >= 0".to_owned(),
            ));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(DrawingError::InvalidData(
                "ellipse stroke width must be finite and > 0".to_owned(),
            ));
        }
        if let Some(fill) = self.fill_color {
            fill.validate()?;
        }
        self.stroke_color.validate()
    }
}

/// Horizontal text alignment relative to `TextPrimitive::x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextHAlign {
    Left,
    Center,
    Right,
}

/// Draw command for one label in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrimitive {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size_px: f64,
    pub color: Color,
    pub h_align: TextHAlign,
}

impl TextPrimitive {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        x: f64,
        y: f64,
        font_size_px: f64,
        color: Color,
        h_align: TextHAlign,
    ) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size_px,
            color,
            h_align,
        }
    }

    pub fn validate(&self) -> DrawingResult<()> {
        if self.text.is_empty() {
            return Err(DrawingError::InvalidData(
                "text primitive must not be empty".to_owned(),
            ));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(DrawingError::InvalidData(
                "text coordinates must be finite".to_owned(),
            ));
        }
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(DrawingError::InvalidData(
                "font size must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}
