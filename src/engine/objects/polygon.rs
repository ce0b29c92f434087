use crate::error::RenderError;
use crate::surface::{Point, Rgba, Surface};

use super::{Draw, Fields};

/// Filled closed path through arbitrary points.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub color: Rgba,
}

impl Polygon {
    pub fn from_fields(f: &Fields) -> Result<Self, RenderError> {
        let points = f.points("points")?;
        if points.len() < 3 {
            return Err(RenderError::FieldType {
                shape: "polygon",
                field: "points".into(),
                expected: "at least 3 points",
                found: format!("{} points", points.len()),
            });
        }
        Ok(Self {
            points,
            color: f.color("color")?,
        })
    }
}

impl Draw for Polygon {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.set_color(self.color);
        surface.fill_path(&self.points);
    }
}

/// Regular polygon with `n` sides and circumradius `r`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplePolygon {
    pub x: f64,
    pub y: f64,
    pub n: usize,
    pub r: f64,
    pub rotation: f64,
    pub color: Rgba,
}

/// Most sides a simple polygon may have.
pub const MAX_SIDES: usize = 1024;

impl SimplePolygon {
    pub fn from_fields(f: &Fields) -> Result<Self, RenderError> {
        let n = f.count("n")?;
        if !(3..=MAX_SIDES).contains(&n) {
            return Err(RenderError::FieldType {
                shape: "simple-polygon",
                field: "n".into(),
                expected: "between 3 and 1024 sides",
                found: n.to_string(),
            });
        }
        Ok(Self {
            x: f.number("x")?,
            y: f.number("y")?,
            n,
            r: f.number("r")?,
            rotation: f.optional_number("rotation")?.unwrap_or(0.0),
            color: f.color("color")?,
        })
    }
}

impl Draw for SimplePolygon {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.set_color(self.color);
        surface.fill_regular_polygon(self.n, self.x, self.y, self.r, self.rotation);
    }
}
