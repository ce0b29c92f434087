//! Scene document types for the human-authored YAML format, and the loader.
//!
//! These types describe *what exists* and *how it changes over time*. Every
//! property value and every animation timing field is an expression evaluated
//! against the scene environment at render time.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LoadError;

use super::animation::Animation;
use super::value::Env;
use super::watch::{SceneWatcher, WatchConfig};
use super::Scene;

#[derive(Debug, Clone, Deserialize)]
pub struct SceneDocument {
    #[serde(default, deserialize_with = "scalar_source")]
    pub version: String,
    #[serde(default)]
    pub env: Env,
    pub frame: FrameSize,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub animations: Vec<Animation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// A drawable entry of the scene: a type tag plus an unresolved property tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SceneObject {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: PropertyTree,
}

pub type PropertyTree = BTreeMap<String, PropertyNode>;

/// One node of a property tree, as decoded from the document.
///
/// Decoding goes by shape only; which shape a key must have is checked by the
/// resolver (`points` is a list, `startPoint`/`endPoint` are nested objects,
/// everything else is an expression).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyNode {
    Expression(#[serde(deserialize_with = "scalar_source")] String),
    Nested(PropertyTree),
    List(Vec<PropertyNode>),
}

impl PropertyNode {
    pub fn expr(source: impl Into<String>) -> Self {
        PropertyNode::Expression(source.into())
    }
}

/// Accept a string, number, or boolean and keep it as expression source text.
///
/// Lets authors write `radius: 4` instead of `radius: "4"`.
pub(crate) fn scalar_source<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{Error, Visitor};

    struct ScalarVisitor;

    impl Visitor<'_> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an expression string, number, or boolean")
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_bool<E: Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        // Debug keeps the decimal point, so `5.0` stays a float expression.
        fn visit_f64<E: Error>(self, v: f64) -> Result<String, E> {
            Ok(format!("{v:?}"))
        }
    }

    d.deserialize_any(ScalarVisitor)
}

pub(crate) fn optional_scalar_source<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Source(#[serde(deserialize_with = "scalar_source")] String);

    Ok(Option::<Source>::deserialize(d)?.map(|s| s.0))
}

/// Loads scene documents from disk and watches them for changes.
pub struct SceneSource;

impl SceneSource {
    /// Read and decode a scene file.
    pub fn load(path: impl AsRef<Path>) -> Result<Scene, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&text, path)?;
        tracing::info!(
            path = %path.display(),
            version = %document.version,
            objects = document.objects.len(),
            animations = document.animations.len(),
            "loaded scene"
        );
        Ok(Scene::from_document(document))
    }

    /// Decode a scene document. `path` is only used for error reporting.
    pub fn parse(text: &str, path: &Path) -> Result<SceneDocument, LoadError> {
        if text.trim().is_empty() {
            return Err(LoadError::Empty(path.to_path_buf()));
        }
        serde_yaml::from_str(text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Start a background watcher that delivers a fresh `Scene` every time
    /// the file changes. Dropping the returned handle stops it.
    pub fn watch(path: impl AsRef<Path>, config: WatchConfig) -> Result<SceneWatcher, LoadError> {
        SceneWatcher::spawn(path.as_ref(), config)
    }
}
