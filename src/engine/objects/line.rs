use crate::error::RenderError;
use crate::surface::{Point, Rgba, Surface};

use super::{Draw, Fields};

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub color: Rgba,
}

impl Line {
    pub fn from_fields(f: &Fields) -> Result<Self, RenderError> {
        Ok(Self {
            start: f.point("startPoint")?,
            end: f.point("endPoint")?,
            color: f.color("color")?,
        })
    }
}

impl Draw for Line {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.set_color(self.color);
        surface.stroke_line(self.start.x, self.start.y, self.end.x, self.end.y);
    }
}
