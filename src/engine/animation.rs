//! Keyframe animation clock.
//!
//! Each animation tracks when its current loop started (`played_at`). Every
//! frame it finds the keyframe interval containing "now", interpolates the
//! keyframe properties, and writes them into the scene environment. Later
//! animations overwrite keys written by earlier ones.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{ExpressionError, TimingError};

use super::expr::ExpressionEngine;
use super::source::{optional_scalar_source, scalar_source};
use super::value::{Env, Value};

fn default_repeat() -> String {
    "false".into()
}

fn default_delay() -> String {
    "0".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Animation {
    #[serde(default)]
    pub name: String,
    /// Loop length in seconds. Defaults to the last keyframe's time.
    #[serde(default, deserialize_with = "optional_scalar_source")]
    pub duration: Option<String>,
    #[serde(default = "default_repeat", deserialize_with = "scalar_source")]
    pub repeat: String,
    /// Pause in seconds between the end of one loop and the next.
    #[serde(default = "default_delay", deserialize_with = "scalar_source")]
    pub delay: String,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    /// Start of the current loop, relative to the scene epoch.
    #[serde(skip)]
    pub played_at: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Keyframe {
    /// Seconds from the start of the loop.
    pub time: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, KeyframeValue>,
}

/// A keyframe property as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyframeValue {
    Literal(Value),
    /// Evaluated each frame; if evaluation fails the source is used as text.
    Expression(String),
    /// Null: keep the previous keyframe's value.
    Hold,
}

impl<'de> Deserialize<'de> for KeyframeValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match Option::<Raw>::deserialize(d)? {
            None => KeyframeValue::Hold,
            Some(Raw::Bool(b)) => KeyframeValue::Literal(Value::Bool(b)),
            Some(Raw::Int(v)) => KeyframeValue::Literal(Value::Int(v)),
            Some(Raw::Float(v)) => KeyframeValue::Literal(Value::Float(v)),
            Some(Raw::Text(s)) => KeyframeValue::Expression(s),
        })
    }
}

impl KeyframeValue {
    /// `Ok(None)` for `Hold`. A string that is not a valid expression, or a
    /// single undefined word such as `#ff0000`, is taken as literal text.
    fn evaluate(&self, env: &Env, engine: &dyn ExpressionEngine) -> Result<Option<Value>, ExpressionError> {
        match self {
            KeyframeValue::Literal(v) => Ok(Some(v.clone())),
            KeyframeValue::Expression(source) => match engine.evaluate(source, env) {
                Ok(v) => Ok(Some(v)),
                Err(ExpressionError::Compile { .. }) => Ok(Some(Value::Text(source.clone()))),
                Err(_) if is_bare_word(source) => Ok(Some(Value::Text(source.clone()))),
                Err(e) => Err(e),
            },
            KeyframeValue::Hold => Ok(None),
        }
    }
}

fn is_bare_word(source: &str) -> bool {
    let word = source.trim();
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '#' | '_' | '.' | ':'))
}

/// Blend two keyframe values. Numbers interpolate linearly and are exact at
/// both ends; an integer pair stays integral. Anything else switches to
/// `target` at once.
pub fn interpolate(prev: &Value, target: &Value, progress: f64) -> Value {
    let lerp = |a: f64, b: f64| a * (1.0 - progress) + b * progress;
    match (prev, target) {
        (Value::Int(a), Value::Int(b)) => Value::Int(lerp(*a as f64, *b as f64).round() as i64),
        _ => match (prev.as_f64(), target.as_f64()) {
            (Some(a), Some(b)) => Value::Float(lerp(a, b)),
            _ => target.clone(),
        },
    }
}

impl Animation {
    /// Sort keyframes by time (stable). Returns false if they were unsorted.
    pub fn sort_keyframes(&mut self) -> bool {
        let sorted = self.keyframes.windows(2).all(|w| w[0].time <= w[1].time);
        if !sorted {
            self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        sorted
    }

    /// Advance playback to `now` and write this frame's values into `env`.
    ///
    /// A timing expression that cannot be evaluated skips the animation for
    /// this frame; `env` and the playback position are left untouched. A
    /// keyframe property that fails to evaluate keeps its previous value while
    /// the other properties still update, and the first such failure is
    /// returned.
    pub fn advance(
        &mut self,
        env: &mut Env,
        now: Duration,
        engine: &dyn ExpressionEngine,
    ) -> Result<(), TimingError> {
        let duration = match &self.duration {
            Some(source) => self.seconds("duration", source, env, engine)?,
            None => Duration::try_from_secs_f64(self.keyframes.last().map_or(0.0, |k| k.time))
                .unwrap_or(Duration::ZERO),
        };
        let repeat = self.flag("repeat", &self.repeat, env, engine)?;
        let delay = self.seconds("delay", &self.delay, env, engine)?;

        // A loop end past `Duration::MAX` never comes around.
        let loop_ends = |start: Duration| {
            start
                .checked_add(duration)
                .and_then(|t| t.checked_add(delay))
                .is_some_and(|end| now >= end)
        };
        let played_at = match self.played_at {
            Some(start) if !(repeat && loop_ends(start)) => start,
            _ => {
                self.played_at = Some(now);
                now
            }
        };
        let elapsed = now.saturating_sub(played_at).as_secs_f64();

        let Some(idx) = self.keyframes.iter().position(|k| k.time >= elapsed) else {
            return Ok(());
        };
        let keyframe = &self.keyframes[idx];

        let mut updates = Vec::with_capacity(keyframe.properties.len());
        let mut failed = None;
        let mut fail = |key: &str, source: ExpressionError| {
            tracing::debug!(animation = %self.name, property = key, error = %source, "keyframe property skipped");
            failed.get_or_insert(TimingError::Property {
                animation: self.name.clone(),
                property: key.to_string(),
                source,
            });
        };

        if idx == 0 {
            // Rest state: keyframe 0 holds its own values.
            for (key, value) in &keyframe.properties {
                match value.evaluate(env, engine) {
                    Ok(Some(v)) => updates.push((key.clone(), v)),
                    Ok(None) => {}
                    Err(e) => fail(key, e),
                }
            }
        } else {
            let prev = &self.keyframes[idx - 1];
            let span = keyframe.time - prev.time;
            let progress = if span > 0.0 {
                ((elapsed - prev.time) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };

            for (key, value) in &keyframe.properties {
                let from = match prev.properties.get(key).map(|p| p.evaluate(env, engine)) {
                    Some(Err(e)) => {
                        fail(key, e);
                        continue;
                    }
                    Some(Ok(v)) => v,
                    None => None,
                };
                let to = match value.evaluate(env, engine) {
                    Ok(v) => v,
                    Err(e) => {
                        fail(key, e);
                        continue;
                    }
                };
                let next = match (from, to) {
                    (Some(from), Some(to)) => interpolate(&from, &to, progress),
                    (Some(from), None) => from,
                    (None, Some(to)) => to,
                    (None, None) => continue,
                };
                updates.push((key.clone(), next));
            }
        }

        for (key, value) in updates {
            env.set(key, value);
        }
        match failed {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn evaluate(
        &self,
        field: &'static str,
        source: &str,
        env: &Env,
        engine: &dyn ExpressionEngine,
    ) -> Result<Value, TimingError> {
        engine
            .evaluate(source, env)
            .map_err(|source| TimingError::Evaluation {
                animation: self.name.clone(),
                field,
                source,
            })
    }

    fn seconds(
        &self,
        field: &'static str,
        source: &str,
        env: &Env,
        engine: &dyn ExpressionEngine,
    ) -> Result<Duration, TimingError> {
        let value = self.evaluate(field, source, env, engine)?;
        value
            .as_f64()
            .filter(|s| *s >= 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .ok_or_else(|| TimingError::Type {
                animation: self.name.clone(),
                field,
                expected: "a non-negative number of seconds",
                found: value.to_string(),
            })
    }

    fn flag(
        &self,
        field: &'static str,
        source: &str,
        env: &Env,
        engine: &dyn ExpressionEngine,
    ) -> Result<bool, TimingError> {
        let value = self.evaluate(field, source, env, engine)?;
        value.as_bool().ok_or_else(|| TimingError::Type {
            animation: self.name.clone(),
            field,
            expected: "a boolean",
            found: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::expr::Evalexpr;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn anim(yaml: &str) -> Animation {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn step(a: &mut Animation, env: &mut Env, at: f64) {
        a.advance(env, secs(at), &Evalexpr).unwrap();
    }

    const SLIDE: &str = r#"
name: slide
duration: "1"
keyframes:
  - time: 0
    properties: { x: "0" }
  - time: 1
    properties: { x: "100" }
"#;

    #[test]
    fn test_halfway_interpolation() {
        let mut a = anim(SLIDE);
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        assert_eq!(env.get("x"), Some(&Value::Int(0)));
        step(&mut a, &mut env, 0.5);
        assert_eq!(env.get("x"), Some(&Value::Int(50)));
    }

    #[test]
    fn test_first_advance_starts_playback() {
        let mut a = anim(SLIDE);
        let mut env = Env::new();
        assert_eq!(a.played_at, None);
        step(&mut a, &mut env, 3.0);
        assert_eq!(a.played_at, Some(secs(3.0)));
        step(&mut a, &mut env, 3.25);
        assert_eq!(env.get("x"), Some(&Value::Int(25)));
    }

    #[test]
    fn test_interpolation_boundaries_are_exact() {
        let (a, b) = (Value::Float(0.1), Value::Float(0.3));
        assert_eq!(interpolate(&a, &b, 0.0), Value::Float(0.1));
        assert_eq!(interpolate(&a, &b, 1.0), Value::Float(0.3));
        assert_eq!(interpolate(&Value::Int(-7), &Value::Int(9), 1.0), Value::Int(9));
        assert_eq!(interpolate(&Value::Int(2), &Value::Float(4.0), 0.5), Value::Float(3.0));
    }

    #[test]
    fn test_text_switches_without_blending() {
        let mut a = anim(
            r##"
name: blink
keyframes:
  - time: 0
    properties: { color: "#ff0000" }
  - time: 1
    properties: { color: "#00ff00" }
"##,
        );
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        assert_eq!(env.get("color"), Some(&Value::Text("#ff0000".into())));
        step(&mut a, &mut env, 0.01);
        assert_eq!(env.get("color"), Some(&Value::Text("#00ff00".into())));
        step(&mut a, &mut env, 0.6);
        assert_eq!(env.get("color"), Some(&Value::Text("#00ff00".into())));
    }

    #[test]
    fn test_values_freeze_after_completion() {
        let mut a = anim(SLIDE);
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        step(&mut a, &mut env, 0.9);
        let frozen = env.clone();
        step(&mut a, &mut env, 1.5);
        assert_eq!(env, frozen);
        step(&mut a, &mut env, 30.0);
        assert_eq!(env, frozen);
        assert_eq!(a.played_at, Some(Duration::ZERO));
    }

    #[test]
    fn test_repeat_restarts_after_delay() {
        let mut a = anim(SLIDE);
        a.repeat = "true".into();
        a.delay = "0.5".into();
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        step(&mut a, &mut env, 1.2);
        assert_eq!(a.played_at, Some(Duration::ZERO));
        step(&mut a, &mut env, 1.5);
        assert_eq!(a.played_at, Some(secs(1.5)));
        assert_eq!(env.get("x"), Some(&Value::Int(0)));
        step(&mut a, &mut env, 2.0);
        assert_eq!(env.get("x"), Some(&Value::Int(50)));
    }

    #[test]
    fn test_timing_failure_skips_frame() {
        let mut a = anim(SLIDE);
        a.duration = Some("loop_length".into());
        let mut env = Env::new();
        let err = a
            .advance(&mut env, secs(0.0), &Evalexpr)
            .unwrap_err();
        assert!(matches!(err, TimingError::Evaluation { field: "duration", .. }));
        assert_eq!(a.played_at, None);
        assert!(env.is_empty());

        // Recovers once the variable exists.
        env.set("loop_length", 1_i64);
        step(&mut a, &mut env, 0.0);
        assert_eq!(env.get("x"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_timing_type_errors() {
        let mut a = anim(SLIDE);
        a.repeat = "1".into();
        let err = a
            .advance(&mut Env::new(), Duration::ZERO, &Evalexpr)
            .unwrap_err();
        assert!(matches!(err, TimingError::Type { field: "repeat", .. }));

        let mut a = anim(SLIDE);
        a.delay = "-1".into();
        let err = a
            .advance(&mut Env::new(), Duration::ZERO, &Evalexpr)
            .unwrap_err();
        assert!(matches!(err, TimingError::Type { field: "delay", .. }));
    }

    #[test]
    fn test_hold_and_missing_previous() {
        let mut a = anim(
            r#"
name: mixed
keyframes:
  - time: 0
    properties: { x: 10, y: 1.5 }
  - time: 1
    properties: { x: ~, z: 7 }
"#,
        );
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        step(&mut a, &mut env, 0.5);
        assert_eq!(env.get("x"), Some(&Value::Int(10)));
        assert_eq!(env.get("z"), Some(&Value::Int(7)));
        assert_eq!(env.get("y"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_hold_without_previous_value_leaves_env() {
        let mut a = anim(
            r#"
name: sparse
keyframes:
  - time: 0
    properties: { x: 1 }
  - time: 1
    properties: { x: 3, w: ~ }
"#,
        );
        let mut env: Env = [("w", "kept")].into_iter().collect();
        step(&mut a, &mut env, 0.0);
        step(&mut a, &mut env, 0.5);
        assert_eq!(env.get("x"), Some(&Value::Int(2)));
        assert_eq!(env.get("w"), Some(&Value::Text("kept".into())));

        let mut fresh = Env::new();
        a.played_at = None;
        step(&mut a, &mut fresh, 0.0);
        step(&mut a, &mut fresh, 0.5);
        assert_eq!(fresh.get("w"), None);
    }

    #[test]
    fn test_runtime_failure_keeps_previous_value() {
        let mut a = anim(
            r#"
name: broken
keyframes:
  - time: 0
    properties: { x: 5, y: 0 }
  - time: 1
    properties: { x: "speed * 2", y: 10 }
"#,
        );
        let mut env: Env = [("x", 3_i64)].into_iter().collect();
        step(&mut a, &mut env, 0.0);
        assert_eq!(env.get("x"), Some(&Value::Int(5)));

        let err = a.advance(&mut env, secs(0.5), &Evalexpr).unwrap_err();
        assert!(matches!(
            err,
            TimingError::Property { ref property, source: ExpressionError::Runtime { .. }, .. } if property == "x"
        ));
        assert_eq!(env.get("x"), Some(&Value::Int(5)));
        assert_eq!(env.get("y"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_bare_words_and_malformed_source_become_text() {
        let mut a = anim(
            r##"
name: words
keyframes:
  - time: 0
    properties: { color: "#ff8800", label: "hello", odd: "(1 +" }
"##,
        );
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        assert_eq!(env.get("color"), Some(&Value::Text("#ff8800".into())));
        assert_eq!(env.get("label"), Some(&Value::Text("hello".into())));
        assert_eq!(env.get("odd"), Some(&Value::Text("(1 +".into())));
    }

    #[test]
    fn test_huge_loop_never_restarts() {
        let mut a = anim(SLIDE);
        a.duration = Some("10000000000000000000.0".into());
        a.delay = "10000000000000000000.0".into();
        a.repeat = "true".into();
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        step(&mut a, &mut env, 0.05);
        assert_eq!(a.played_at, Some(Duration::ZERO));
    }

    #[test]
    fn test_middle_interval_uses_previous_keyframe_time() {
        let mut a = anim(
            r#"
name: steps
keyframes:
  - { time: 0, properties: { x: 0.0 } }
  - { time: 1, properties: { x: 10.0 } }
  - { time: 2, properties: { x: 20.0 } }
  - { time: 4, properties: { x: 0.0 } }
"#,
        );
        let mut env = Env::new();
        step(&mut a, &mut env, 0.0);
        step(&mut a, &mut env, 1.5);
        assert_eq!(env.get("x"), Some(&Value::Float(15.0)));
        step(&mut a, &mut env, 3.0);
        assert_eq!(env.get("x"), Some(&Value::Float(10.0)));
    }

    #[test]
    fn test_keyframe_expressions_read_environment() {
        let mut a = anim(
            r#"
name: follow
keyframes:
  - { time: 0, properties: { x: "base" } }
  - { time: 2, properties: { x: "base * 3" } }
"#,
        );
        let mut env: Env = [("base", 10_i64)].into_iter().collect();
        step(&mut a, &mut env, 0.0);
        step(&mut a, &mut env, 1.0);
        assert_eq!(env.get("x"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_sort_keyframes() {
        let mut a = anim(SLIDE);
        assert!(a.sort_keyframes());
        a.keyframes.swap(0, 1);
        assert!(!a.sort_keyframes());
        assert_eq!(a.keyframes[0].time, 0.0);
    }
}
