//! Engine: the scene model and its per-frame render pass.
//!
//! A render pass first advances every animation (which writes interpolated
//! values into the scene environment), then resolves and draws every object
//! against the updated environment. The engine never deals with terminals;
//! it only talks to a `Surface`.

pub mod animation;
pub mod expr;
pub mod objects;
pub mod resolve;
pub mod source;
pub mod value;
pub mod watch;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{RenderError, TimingError};
use crate::surface::Surface;

use animation::Animation;
use expr::{Evalexpr, ExpressionEngine};
use source::{FrameSize, SceneDocument, SceneObject};
use value::Env;

/// A loaded scene. Replaced wholesale on reload; only the environment and
/// the animations' playback positions change afterwards.
pub struct Scene {
    frame: FrameSize,
    initial_env: Env,
    env: Env,
    objects: Vec<SceneObject>,
    animations: Vec<Animation>,
    engine: Arc<dyn ExpressionEngine>,
    epoch: Instant,
}

/// An object that failed to render during a pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("object `{name}`: {error}")]
pub struct ObjectFailure {
    pub name: String,
    #[source]
    pub error: RenderError,
}

/// Outcome of one render pass. Failures never stop the pass.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub failures: Vec<ObjectFailure>,
    pub animation_errors: Vec<TimingError>,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.animation_errors.is_empty()
    }
}

impl Scene {
    pub fn from_document(document: SceneDocument) -> Self {
        let SceneDocument {
            frame,
            env,
            objects,
            mut animations,
            ..
        } = document;

        for animation in &mut animations {
            if !animation.sort_keyframes() {
                tracing::warn!(animation = %animation.name, "keyframes were out of order; sorted by time");
            }
        }
        for object in &objects {
            if !objects::is_registered(&object.kind) {
                tracing::warn!(object = %object.name, kind = %object.kind, "unknown object type");
            }
        }

        Self {
            frame,
            initial_env: env.clone(),
            env,
            objects,
            animations,
            engine: Arc::new(Evalexpr),
            epoch: Instant::now(),
        }
    }

    /// Swap the expression engine.
    pub fn with_engine(mut self, engine: Arc<dyn ExpressionEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    /// Time since the scene started playing.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Rewind: restore the document's environment and restart every animation.
    pub fn restart(&mut self) {
        self.env = self.initial_env.clone();
        for animation in &mut self.animations {
            animation.played_at = None;
        }
        self.epoch = Instant::now();
    }

    /// Render the frame for the current wall-clock time.
    pub fn render(&mut self, surface: &mut dyn Surface) -> RenderReport {
        let now = self.elapsed();
        self.render_at(surface, now)
    }

    /// Render the frame at `now` (time since the scene epoch).
    pub fn render_at(&mut self, surface: &mut dyn Surface, now: Duration) -> RenderReport {
        let mut report = RenderReport {
            animation_errors: self.advance(now),
            ..Default::default()
        };

        for object in &self.objects {
            if let Err(error) = object.render(&self.env, self.engine.as_ref(), surface) {
                tracing::debug!(object = %object.name, %error, "object failed to render");
                report.failures.push(ObjectFailure {
                    name: object.name.clone(),
                    error,
                });
            }
        }
        report
    }

    /// Advance every animation in declaration order. Returns this frame's
    /// animation errors.
    pub fn advance(&mut self, now: Duration) -> Vec<TimingError> {
        let mut errors = Vec::new();
        for animation in &mut self.animations {
            if let Err(e) = animation.advance(&mut self.env, now, self.engine.as_ref()) {
                tracing::debug!(error = %e, "animation failed this frame");
                errors.push(e);
            }
        }
        errors
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("frame", &self.frame)
            .field("env", &self.env)
            .field("objects", &self.objects.len())
            .field("animations", &self.animations.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::engine::source::SceneSource;
    use crate::engine::value::Value;
    use crate::error::ExpressionError;
    use crate::surface::{Canvas, Rgba};

    fn scene(yaml: &str) -> Scene {
        Scene::from_document(SceneSource::parse(yaml, Path::new("test.yml")).unwrap())
    }

    const BOUNCE: &str = r##"
version: 1
env:
  x: 0
  size: 2
frame: { width: 16, height: 8 }
objects:
  - name: ball
    type: rectangle
    properties: { x: "x", y: "0", width: "size", height: "size", color: '"#ff0000"' }
  - name: ghost
    type: hexagon
    properties: { x: "1" }
  - name: marker
    type: rectangle
    properties: { x: "14", y: "6", width: "2", height: "2" }
animations:
  - name: slide
    duration: 1
    keyframes:
      - { time: 0, properties: { x: "0" } }
      - { time: 1, properties: { x: "10" } }
"##;

    #[test]
    fn test_render_pass_advances_then_draws() {
        let mut s = scene(BOUNCE);
        let mut canvas = Canvas::new(s.width(), s.height());
        s.render_at(&mut canvas, Duration::ZERO);
        let report = s.render_at(&mut canvas, Duration::from_millis(500));

        assert_eq!(s.env().get("x"), Some(&Value::Int(5)));
        assert_eq!(canvas.pixel(5, 0), Some(Rgba::opaque(255, 0, 0)));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "ghost");
    }

    #[test]
    fn test_unknown_type_does_not_stop_later_objects() {
        let mut s = scene(BOUNCE);
        let mut canvas = Canvas::new(s.width(), s.height());
        let report = s.render_at(&mut canvas, Duration::ZERO);

        assert_eq!(
            report.failures[0].error,
            RenderError::UnknownType("hexagon".into())
        );
        assert_eq!(canvas.pixel(15, 7), Some(Rgba::WHITE));
    }

    #[test]
    fn test_later_animation_wins_key_collision() {
        let mut s = scene(
            r#"
frame: { width: 4, height: 4 }
animations:
  - name: first
    keyframes: [{ time: 0, properties: { x: 1 } }, { time: 1, properties: { x: 2 } }]
  - name: second
    keyframes: [{ time: 0, properties: { x: 100 } }, { time: 1, properties: { x: 200 } }]
"#,
        );
        s.advance(Duration::ZERO);
        assert_eq!(s.env().get("x"), Some(&Value::Int(100)));
    }

    #[test]
    fn test_skipped_animation_is_reported() {
        let mut s = scene(
            r#"
frame: { width: 4, height: 4 }
animations:
  - name: broken
    duration: "undefined_var"
    keyframes: [{ time: 0, properties: { x: 1 } }]
"#,
        );
        let report = s.render_at(&mut Canvas::new(4, 4), Duration::ZERO);
        assert_eq!(report.animation_errors.len(), 1);
        assert!(report.failures.is_empty());
        assert!(!report.is_clean());
        assert_eq!(s.env().get("x"), None);
    }

    #[test]
    fn test_restart_restores_environment() {
        let mut s = scene(BOUNCE);
        s.advance(Duration::ZERO);
        s.advance(Duration::from_millis(800));
        assert_eq!(s.env().get("x"), Some(&Value::Int(8)));

        s.restart();
        assert_eq!(s.env().get("x"), Some(&Value::Int(0)));
        assert!(s.animations().iter().all(|a| a.played_at.is_none()));
    }

    #[test]
    fn test_keyframes_sorted_on_load() {
        let s = scene(
            r#"
frame: { width: 4, height: 4 }
animations:
  - name: backwards
    keyframes: [{ time: 2 }, { time: 0 }, { time: 1 }]
"#,
        );
        let times: Vec<f64> = s.animations()[0].keyframes.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
    }

    /// Answers every expression with the same number.
    struct Constant(i64);

    impl ExpressionEngine for Constant {
        fn evaluate(&self, _source: &str, _env: &Env) -> Result<Value, ExpressionError> {
            Ok(Value::Int(self.0))
        }
    }

    #[test]
    fn test_custom_expression_engine() {
        let mut s = scene(
            r#"
frame: { width: 8, height: 8 }
objects:
  - name: box
    type: rectangle
    properties: { x: "left", y: "top", width: "w", height: "h" }
"#,
        )
        .with_engine(Arc::new(Constant(3)));
        let mut canvas = Canvas::new(8, 8);
        let report = s.render_at(&mut canvas, Duration::ZERO);

        assert!(report.is_clean());
        assert_eq!(canvas.pixel(3, 3), Some(Rgba::WHITE));
        assert_eq!(canvas.pixel(5, 5), Some(Rgba::WHITE));
        assert_eq!(canvas.pixel(6, 6), Some(Rgba::BLACK));
        assert_eq!(canvas.pixel(2, 2), Some(Rgba::BLACK));
    }
}
