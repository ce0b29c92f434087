//! The seam between the scene engine and the expression language.
//!
//! The engine only needs `evaluate(source, env)`. The default implementation
//! compiles with `evalexpr` and runs the program against a context built from
//! the environment.

use evalexpr::{
    build_operator_tree, ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, Node,
};

use crate::error::ExpressionError;

use super::value::{Env, Value};

type ExprValue = evalexpr::Value<DefaultNumericTypes>;

/// Evaluates expression source text against an environment.
pub trait ExpressionEngine: Send + Sync {
    fn evaluate(&self, source: &str, env: &Env) -> Result<Value, ExpressionError>;
}

/// `evalexpr`-backed engine. Supports arithmetic, comparisons, boolean logic,
/// string literals in double quotes, and the `math::*` builtins.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evalexpr;

impl ExpressionEngine for Evalexpr {
    fn evaluate(&self, source: &str, env: &Env) -> Result<Value, ExpressionError> {
        let program: Node<DefaultNumericTypes> =
            build_operator_tree::<DefaultNumericTypes>(source).map_err(|e| {
                ExpressionError::Compile {
                    expression: source.to_string(),
                    message: e.to_string(),
                }
            })?;

        let runtime = |message: String| ExpressionError::Runtime {
            expression: source.to_string(),
            message,
        };

        let mut context = HashMapContext::<DefaultNumericTypes>::new();
        for (key, value) in env.iter() {
            context
                .set_value(key.clone(), to_expr_value(value))
                .map_err(|e| runtime(e.to_string()))?;
        }

        match program.eval_with_context(&context) {
            Ok(ExprValue::Int(v)) => Ok(Value::Int(v)),
            Ok(ExprValue::Float(v)) => Ok(Value::Float(v)),
            Ok(ExprValue::Boolean(b)) => Ok(Value::Bool(b)),
            Ok(ExprValue::String(s)) => Ok(Value::Text(s)),
            Ok(other) => Err(runtime(format!("unsupported result {other}"))),
            Err(e) => Err(runtime(e.to_string())),
        }
    }
}

fn to_expr_value(value: &Value) -> ExprValue {
    match value {
        Value::Bool(b) => ExprValue::Boolean(*b),
        Value::Int(v) => ExprValue::Int(*v),
        Value::Float(v) => ExprValue::Float(*v),
        Value::Text(s) => ExprValue::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        let env = Env::new();
        assert_eq!(Evalexpr.evaluate("5", &env), Ok(Value::Int(5)));
        assert_eq!(Evalexpr.evaluate("2.5", &env), Ok(Value::Float(2.5)));
        assert_eq!(Evalexpr.evaluate("true", &env), Ok(Value::Bool(true)));
        assert_eq!(
            Evalexpr.evaluate("\"#00ff00\"", &env),
            Ok(Value::Text("#00ff00".into()))
        );
    }

    #[test]
    fn test_reads_environment() {
        let env: Env = [("x", Value::Int(10)), ("scale", Value::Float(1.5))]
            .into_iter()
            .collect();
        assert_eq!(Evalexpr.evaluate("x * scale", &env), Ok(Value::Float(15.0)));
        assert_eq!(Evalexpr.evaluate("x > 5", &env), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_unknown_variable_is_runtime_error() {
        let err = Evalexpr.evaluate("missing + 1", &Env::new()).unwrap_err();
        assert!(matches!(err, ExpressionError::Runtime { .. }));
    }

    #[test]
    fn test_malformed_is_compile_error() {
        let err = Evalexpr.evaluate("(1 + ", &Env::new()).unwrap_err();
        assert!(matches!(err, ExpressionError::Compile { .. }));
    }
}
