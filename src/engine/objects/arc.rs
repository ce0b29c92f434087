use crate::error::RenderError;
use crate::surface::{Rgba, Surface};

use super::{Draw, Fields};

/// Outline of a circle segment; `start` and `end` are radians.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub start: f64,
    pub end: f64,
    pub color: Rgba,
}

impl Arc {
    pub fn from_fields(f: &Fields) -> Result<Self, RenderError> {
        Ok(Self {
            x: f.number("x")?,
            y: f.number("y")?,
            radius: f.number("radius")?,
            start: f.number("start")?,
            end: f.number("end")?,
            color: f.color("color")?,
        })
    }
}

impl Draw for Arc {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.set_color(self.color);
        surface.stroke_arc(self.x, self.y, self.radius, self.start, self.end);
    }
}
