use crate::error::RenderError;
use crate::surface::{Rgba, Surface};

use super::{Draw, Fields};

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: Rgba,
}

impl Circle {
    pub fn from_fields(f: &Fields) -> Result<Self, RenderError> {
        Ok(Self {
            x: f.number("x")?,
            y: f.number("y")?,
            radius: f.number("radius")?,
            color: f.color("color")?,
        })
    }
}

impl Draw for Circle {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.set_color(self.color);
        surface.fill_circle(self.x, self.y, self.radius);
    }
}
