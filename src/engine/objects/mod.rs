//! Shape variants and object dispatch.
//!
//! Each shape lives in its own module with its struct definition, schema
//! (`from_fields`), and `Draw` implementation side by side. Object type tags
//! are looked up in a fixed registry on every render.

mod arc;
mod circle;
mod line;
mod polygon;
mod rect;

pub use arc::Arc;
pub use circle::Circle;
pub use line::Line;
pub use polygon::{Polygon, SimplePolygon};
pub use rect::Rectangle;

use crate::error::RenderError;
use crate::surface::{Point, Rgba, Surface};

use super::expr::ExpressionEngine;
use super::resolve::{self, Properties, Resolved};
use super::source::SceneObject;
use super::value::{Env, Value};

/// Draw a constructed shape onto a surface.
pub trait Draw {
    fn draw(&self, surface: &mut dyn Surface);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Rectangle(Rectangle),
    Arc(Arc),
    Line(Line),
    Polygon(Polygon),
    SimplePolygon(SimplePolygon),
}

impl Draw for Shape {
    fn draw(&self, surface: &mut dyn Surface) {
        match self {
            Shape::Circle(s) => s.draw(surface),
            Shape::Rectangle(s) => s.draw(surface),
            Shape::Arc(s) => s.draw(surface),
            Shape::Line(s) => s.draw(surface),
            Shape::Polygon(s) => s.draw(surface),
            Shape::SimplePolygon(s) => s.draw(surface),
        }
    }
}

type Constructor = fn(&Fields) -> Result<Shape, RenderError>;

/// Registered type tags. `simple` is the legacy spelling of `simple-polygon`.
const REGISTRY: &[(&str, &str, Constructor)] = &[
    ("circle", "circle", circle),
    ("rectangle", "rectangle", rectangle),
    ("arc", "arc", arc),
    ("line", "line", line),
    ("polygon", "polygon", polygon),
    ("simple-polygon", "simple-polygon", simple_polygon),
    ("simple", "simple-polygon", simple_polygon),
];

fn circle(f: &Fields) -> Result<Shape, RenderError> {
    Circle::from_fields(f).map(Shape::Circle)
}

fn rectangle(f: &Fields) -> Result<Shape, RenderError> {
    Rectangle::from_fields(f).map(Shape::Rectangle)
}

fn arc(f: &Fields) -> Result<Shape, RenderError> {
    Arc::from_fields(f).map(Shape::Arc)
}

fn line(f: &Fields) -> Result<Shape, RenderError> {
    Line::from_fields(f).map(Shape::Line)
}

fn polygon(f: &Fields) -> Result<Shape, RenderError> {
    Polygon::from_fields(f).map(Shape::Polygon)
}

fn simple_polygon(f: &Fields) -> Result<Shape, RenderError> {
    SimplePolygon::from_fields(f).map(Shape::SimplePolygon)
}

pub fn is_registered(tag: &str) -> bool {
    REGISTRY.iter().any(|(t, _, _)| *t == tag)
}

impl Shape {
    /// Build the shape registered under `tag` from resolved properties.
    pub fn construct(tag: &str, props: &Properties) -> Result<Shape, RenderError> {
        let (_, shape, constructor) = REGISTRY
            .iter()
            .find(|(t, _, _)| *t == tag)
            .ok_or_else(|| RenderError::UnknownType(tag.to_string()))?;
        constructor(&Fields::new(shape, props))
    }
}

impl SceneObject {
    /// Resolve, construct, and draw this object.
    pub fn render(
        &self,
        env: &Env,
        engine: &dyn ExpressionEngine,
        surface: &mut dyn Surface,
    ) -> Result<(), RenderError> {
        let props = resolve::resolve(&self.properties, env, engine)?;
        Shape::construct(&self.kind, &props)?.draw(surface);
        Ok(())
    }
}

/// Typed access to a resolved property map, checked against one shape's
/// schema. Extra keys are ignored.
pub struct Fields<'a> {
    shape: &'static str,
    prefix: String,
    props: &'a Properties,
}

impl<'a> Fields<'a> {
    fn new(shape: &'static str, props: &'a Properties) -> Self {
        Self {
            shape,
            prefix: String::new(),
            props,
        }
    }

    fn nested(&self, key: &str, props: &'a Properties) -> Fields<'a> {
        Fields {
            shape: self.shape,
            prefix: self.path(key),
            props,
        }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }

    fn missing(&self, key: &str) -> RenderError {
        RenderError::MissingField {
            shape: self.shape,
            field: self.path(key),
        }
    }

    fn mismatch(&self, key: &str, expected: &'static str, found: &Resolved) -> RenderError {
        let found = match found {
            Resolved::Value(v) => format!("{} {v}", v.kind()),
            Resolved::Object(_) => "an object".to_string(),
            Resolved::List(_) => "a list".to_string(),
        };
        RenderError::FieldType {
            shape: self.shape,
            field: self.path(key),
            expected,
            found,
        }
    }

    pub fn number(&self, key: &str) -> Result<f64, RenderError> {
        self.optional_number(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn optional_number(&self, key: &str) -> Result<Option<f64>, RenderError> {
        match self.props.get(key) {
            None => Ok(None),
            Some(Resolved::Value(v)) => match v.as_f64() {
                Some(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(self.mismatch(key, "a finite number", &Resolved::Value(v.clone()))),
            },
            Some(other) => Err(self.mismatch(key, "a number", other)),
        }
    }

    /// Whole number, accepting integral floats such as `6.0`.
    pub fn count(&self, key: &str) -> Result<usize, RenderError> {
        let n = self.number(key)?;
        if n.fract() == 0.0 && n >= 0.0 {
            Ok(n as usize)
        } else {
            Err(self.mismatch(key, "a whole number", &Resolved::Value(Value::Float(n))))
        }
    }

    /// Hex color; defaults to white when absent.
    pub fn color(&self, key: &str) -> Result<Rgba, RenderError> {
        match self.props.get(key) {
            None => Ok(Rgba::WHITE),
            Some(Resolved::Value(Value::Text(s))) => {
                s.parse().map_err(|_| RenderError::InvalidColor(s.clone()))
            }
            Some(other) => Err(self.mismatch(key, "a hex color string", other)),
        }
    }

    pub fn point(&self, key: &str) -> Result<Point, RenderError> {
        match self.props.get(key) {
            None => Err(self.missing(key)),
            Some(Resolved::Object(p)) => self.nested(key, p).xy(),
            Some(other) => Err(self.mismatch(key, "a point", other)),
        }
    }

    pub fn points(&self, key: &str) -> Result<Vec<Point>, RenderError> {
        match self.props.get(key) {
            None => Err(self.missing(key)),
            Some(Resolved::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, p)| self.nested(&format!("{key}[{i}]"), p).xy())
                .collect(),
            Some(other) => Err(self.mismatch(key, "a list of points", other)),
        }
    }

    fn xy(&self) -> Result<Point, RenderError> {
        Ok(Point::new(self.number("x")?, self.number("y")?))
    }
}
