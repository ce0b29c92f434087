//! Error types for scene loading, expression evaluation, and rendering.

use std::path::PathBuf;

/// Failure to turn a file on disk into a `Scene`.
///
/// Fatal to one load attempt only; a watcher keeps the previous scene.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read scene file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scene file {0:?} is empty")]
    Empty(PathBuf),

    #[error("failed to parse scene file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to watch scene file {path:?}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Failure reported by an `ExpressionEngine`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("failed to compile `{expression}`: {message}")]
    Compile { expression: String, message: String },

    #[error("failed to evaluate `{expression}`: {message}")]
    Runtime { expression: String, message: String },
}

/// Failure to resolve one key of a property tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    #[error("property `{path}`: {source}")]
    Expression {
        path: String,
        #[source]
        source: ExpressionError,
    },

    #[error("property `{0}` must be an expression")]
    NotAnExpression(String),

    #[error("property `{0}` must be a nested object")]
    NotAnObject(String),

    #[error("property `{0}` must be a list of objects")]
    NotAList(String),
}

/// Failure to render a single object. Never aborts the rest of the pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("unknown object type `{0}`")]
    UnknownType(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("{shape} is missing required property `{field}`")]
    MissingField { shape: &'static str, field: String },

    #[error("{shape} property `{field}` expects {expected}, got {found}")]
    FieldType {
        shape: &'static str,
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("invalid color `{0}`")]
    InvalidColor(String),
}

/// Failure while advancing an animation.
///
/// Non-fatal. A bad duration, repeat, or delay skips the animation for the
/// current frame; a bad keyframe property only skips that property.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimingError {
    #[error("animation `{animation}` {field}: {source}")]
    Evaluation {
        animation: String,
        field: &'static str,
        #[source]
        source: ExpressionError,
    },

    #[error("animation `{animation}` {field} must be {expected}, got {found}")]
    Type {
        animation: String,
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("animation `{animation}` property `{property}`: {source}")]
    Property {
        animation: String,
        property: String,
        #[source]
        source: ExpressionError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        let err = RenderError::MissingField {
            shape: "circle",
            field: "radius".into(),
        };
        assert_eq!(err.to_string(), "circle is missing required property `radius`");
    }

    #[test]
    fn test_resolution_error_is_transparent() {
        let err: RenderError = ResolutionError::NotAList("points".into()).into();
        assert_eq!(err.to_string(), "property `points` must be a list of objects");
    }
}
