use std::f64::consts::TAU;

use image::RgbaImage;

use super::{Point, Rgba, Surface};

/// Half the stroke width, in pixels. Strokes are one pixel wide.
const HALF_STROKE: f64 = 0.5;

/// An RGBA image with a small point-sampling rasterizer on top.
///
/// A pixel is covered when its centre falls inside the shape.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    color: Rgba,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba::BLACK.into()),
            color: Rgba::WHITE,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn clear(&mut self, color: Rgba) {
        let fill: image::Rgba<u8> = color.into();
        for p in self.pixels.pixels_mut() {
            *p = fill;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.pixels.get_pixel_checked(x, y).map(|p| Rgba::from(*p))
    }

    fn blend(&mut self, x: i64, y: i64) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if let Some(p) = self.pixels.get_pixel_mut_checked(x, y) {
            *p = self.color.over(Rgba::from(*p)).into();
        }
    }

    /// Visit every in-bounds pixel whose centre lies in the box and passes `inside`.
    fn cover(&mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64, inside: impl Fn(f64, f64) -> bool) {
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return;
        }
        let x0 = (min_x.floor() as i64).max(0);
        let y0 = (min_y.floor() as i64).max(0);
        let x1 = (max_x.ceil() as i64).min(self.width() as i64 - 1);
        let y1 = (max_y.ceil() as i64).min(self.height() as i64 - 1);
        for py in y0..=y1 {
            for px in x0..=x1 {
                if inside(px as f64 + 0.5, py as f64 + 0.5) {
                    self.blend(px, py);
                }
            }
        }
    }
}

impl Surface for Canvas {
    fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    fn fill_circle(&mut self, x: f64, y: f64, r: f64) {
        let r2 = r * r;
        self.cover(x - r, y - r, x + r, y + r, |cx, cy| {
            (cx - x).powi(2) + (cy - y).powi(2) <= r2
        });
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let (left, right) = if w < 0.0 { (x + w, x) } else { (x, x + w) };
        let (top, bottom) = if h < 0.0 { (y + h, y) } else { (y, y + h) };
        self.cover(left, top, right, bottom, |cx, cy| {
            cx >= left && cx < right && cy >= top && cy < bottom
        });
    }

    fn stroke_arc(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64) {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let full = hi - lo >= TAU;
        let reach = r + HALF_STROKE;
        self.cover(x - reach, y - reach, x + reach, y + reach, |cx, cy| {
            let (dx, dy) = (cx - x, cy - y);
            if ((dx * dx + dy * dy).sqrt() - r).abs() > HALF_STROKE {
                return false;
            }
            if full {
                return true;
            }
            let angle = lo + (dy.atan2(dx) - lo).rem_euclid(TAU);
            angle <= hi
        });
    }

    fn stroke_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let (dx, dy) = (x2 - x1, y2 - y1);
        let len2 = dx * dx + dy * dy;
        self.cover(
            x1.min(x2) - HALF_STROKE,
            y1.min(y2) - HALF_STROKE,
            x1.max(x2) + HALF_STROKE,
            y1.max(y2) + HALF_STROKE,
            |cx, cy| {
                let t = if len2 == 0.0 {
                    0.0
                } else {
                    (((cx - x1) * dx + (cy - y1) * dy) / len2).clamp(0.0, 1.0)
                };
                let (px, py) = (x1 + t * dx, y1 + t * dy);
                ((cx - px).powi(2) + (cy - py).powi(2)).sqrt() <= HALF_STROKE
            },
        );
    }

    fn fill_path(&mut self, points: &[Point]) {
        if points.len() < 3 {
            return;
        }
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        self.cover(min_x, min_y, max_x, max_y, |cx, cy| winding(points, cx, cy) != 0);
    }
}

/// Non-zero winding number of the closed path around (x, y).
fn winding(points: &[Point], x: f64, y: f64) -> i32 {
    let mut wn = 0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let side = (b.x - a.x) * (y - a.y) - (x - a.x) * (b.y - a.y);
        if a.y <= y {
            if b.y > y && side > 0.0 {
                wn += 1;
            }
        } else if b.y <= y && side < 0.0 {
            wn -= 1;
        }
    }
    wn
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(canvas: &Canvas, x: u32, y: u32) -> bool {
        canvas.pixel(x, y) != Some(Rgba::BLACK)
    }

    #[test]
    fn test_fill_rect_covers_pixel_centres() {
        let mut c = Canvas::new(8, 8);
        c.set_color(Rgba::opaque(255, 0, 0));
        c.fill_rect(2.0, 2.0, 3.0, 2.0);
        assert_eq!(c.pixel(2, 2), Some(Rgba::opaque(255, 0, 0)));
        assert!(lit(&c, 4, 3));
        assert!(!lit(&c, 5, 3));
        assert!(!lit(&c, 2, 4));
        assert!(!lit(&c, 1, 2));
    }

    #[test]
    fn test_fill_circle() {
        let mut c = Canvas::new(16, 16);
        c.fill_circle(8.0, 8.0, 3.0);
        assert!(lit(&c, 8, 8));
        assert!(lit(&c, 7, 7));
        assert!(!lit(&c, 4, 4));
        assert!(!lit(&c, 12, 8));
    }

    #[test]
    fn test_off_canvas_shapes_are_clipped() {
        let mut c = Canvas::new(4, 4);
        c.fill_circle(-10.0, -10.0, 3.0);
        c.fill_rect(2.0, 2.0, 100.0, 100.0);
        assert!(lit(&c, 3, 3));
        assert!(!lit(&c, 0, 0));
    }

    #[test]
    fn test_fill_path_triangle() {
        let mut c = Canvas::new(10, 10);
        c.fill_path(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)]);
        assert!(lit(&c, 1, 1));
        assert!(!lit(&c, 8, 8));
    }

    #[test]
    fn test_stroke_line_horizontal() {
        let mut c = Canvas::new(10, 10);
        c.stroke_line(1.0, 5.5, 8.0, 5.5);
        for x in 1..8 {
            assert!(lit(&c, x, 5), "pixel {x} should be on the line");
        }
        assert!(!lit(&c, 4, 3));
        assert!(!lit(&c, 9, 5));
    }

    #[test]
    fn test_stroke_arc_quarter() {
        let mut c = Canvas::new(20, 20);
        // Quarter from +x axis to +y axis (down-right quadrant).
        c.stroke_arc(10.0, 10.0, 6.0, 0.0, std::f64::consts::FRAC_PI_2);
        assert!(lit(&c, 15, 10));
        assert!(lit(&c, 10, 15));
        assert!(!lit(&c, 4, 10));
        assert!(!lit(&c, 10, 4));
        assert!(!lit(&c, 10, 10));
    }

    #[test]
    fn test_clear_resets_pixels() {
        let mut c = Canvas::new(2, 2);
        c.fill_rect(0.0, 0.0, 2.0, 2.0);
        c.clear(Rgba::BLACK);
        assert!(!lit(&c, 0, 0));
    }
}
