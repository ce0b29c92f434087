use crate::error::RenderError;
use crate::surface::{Rgba, Surface};

use super::{Draw, Fields};

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: Rgba,
}

impl Rectangle {
    pub fn from_fields(f: &Fields) -> Result<Self, RenderError> {
        Ok(Self {
            x: f.number("x")?,
            y: f.number("y")?,
            width: f.number("width")?,
            height: f.number("height")?,
            color: f.color("color")?,
        })
    }
}

impl Draw for Rectangle {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.set_color(self.color);
        surface.fill_rect(self.x, self.y, self.width, self.height);
    }
}
