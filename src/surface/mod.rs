//! The drawing surface the engine renders onto.
//!
//! The engine only depends on the `Surface` capability set; `Canvas` is the
//! in-memory implementation used by the player and the headless commands.

mod canvas;

pub use canvas::Canvas;

use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Composite `self` over `dst` (source-over).
    pub fn over(self, dst: Rgba) -> Rgba {
        if self.a == 255 {
            return self;
        }
        if self.a == 0 {
            return dst;
        }
        let sa = self.a as f64 / 255.0;
        let da = dst.a as f64 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        let channel = |s: u8, d: u8| {
            let v = (s as f64 * sa + d as f64 * da * (1.0 - sa)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgba {
            r: channel(self.r, dst.r),
            g: channel(self.g, dst.g),
            b: channel(self.b, dst.b),
            a: (out_a * 255.0).round() as u8,
        }
    }
}

impl From<image::Rgba<u8>> for Rgba {
    fn from(p: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = p.0;
        Rgba { r, g, b, a }
    }
}

impl From<Rgba> for image::Rgba<u8> {
    fn from(c: Rgba) -> Self {
        image::Rgba([c.r, c.g, c.b, c.a])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(pub String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex color `{}`", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Rgba {
    type Err = ParseColorError;

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, or `#rrggbbaa` (the `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        let rgba = match hex.len() {
            3 | 4 => Rgba {
                r: nibble(0).map_err(|_| err())?,
                g: nibble(1).map_err(|_| err())?,
                b: nibble(2).map_err(|_| err())?,
                a: if hex.len() == 4 { nibble(3).map_err(|_| err())? } else { 255 },
            },
            6 | 8 => Rgba {
                r: byte(0).map_err(|_| err())?,
                g: byte(2).map_err(|_| err())?,
                b: byte(4).map_err(|_| err())?,
                a: if hex.len() == 8 { byte(6).map_err(|_| err())? } else { 255 },
            },
            _ => return Err(err()),
        };
        Ok(rgba)
    }
}

/// Primitive fill/stroke operations in surface pixel space.
///
/// Angles are radians, measured clockwise from the positive x axis (y grows
/// downward).
pub trait Surface {
    fn set_color(&mut self, color: Rgba);
    fn fill_circle(&mut self, x: f64, y: f64, r: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_arc(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64);
    fn stroke_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    fn fill_path(&mut self, points: &[Point]);

    /// Fill a regular `sides`-gon centred on (x, y) with circumradius `r`.
    ///
    /// With zero rotation the first vertex points up; even-sided polygons are
    /// turned half a step so they rest on a flat edge.
    fn fill_regular_polygon(&mut self, sides: usize, x: f64, y: f64, r: f64, rotation: f64) {
        if sides < 3 {
            return;
        }
        self.fill_path(&regular_polygon(sides, x, y, r, rotation));
    }
}

pub fn regular_polygon(sides: usize, x: f64, y: f64, r: f64, rotation: f64) -> Vec<Point> {
    let step = TAU / sides as f64;
    let mut start = rotation - PI / 2.0;
    if sides % 2 == 0 {
        start += step / 2.0;
    }
    (0..sides)
        .map(|i| {
            let a = start + step * i as f64;
            Point::new(x + r * a.cos(), y + r * a.sin())
        })
        .collect()
}
