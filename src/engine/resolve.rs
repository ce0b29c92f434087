//! Property resolution: evaluate a property tree against the environment.

use std::collections::BTreeMap;

use crate::error::ResolutionError;

use super::expr::ExpressionEngine;
use super::source::{PropertyNode, PropertyTree};
use super::value::{Env, Value};

/// A concrete value produced from one property node.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    Object(Properties),
    List(Vec<Properties>),
}

pub type Properties = BTreeMap<String, Resolved>;

/// Resolve every key of `tree`. Pure: reads `env`, writes nothing.
pub fn resolve(
    tree: &PropertyTree,
    env: &Env,
    engine: &dyn ExpressionEngine,
) -> Result<Properties, ResolutionError> {
    resolve_at("", tree, env, engine)
}

fn resolve_at(
    prefix: &str,
    tree: &PropertyTree,
    env: &Env,
    engine: &dyn ExpressionEngine,
) -> Result<Properties, ResolutionError> {
    let mut out = Properties::new();
    for (key, node) in tree {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let resolved = match (key.as_str(), node) {
            ("points", PropertyNode::List(items)) => {
                let mut points = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    match item {
                        PropertyNode::Nested(tree) => {
                            points.push(resolve_at(&item_path, tree, env, engine)?)
                        }
                        _ => return Err(ResolutionError::NotAnObject(item_path)),
                    }
                }
                Resolved::List(points)
            }
            ("points", _) => return Err(ResolutionError::NotAList(path)),
            ("startPoint" | "endPoint", PropertyNode::Nested(tree)) => {
                Resolved::Object(resolve_at(&path, tree, env, engine)?)
            }
            ("startPoint" | "endPoint", _) => return Err(ResolutionError::NotAnObject(path)),
            (_, PropertyNode::Expression(source)) => match engine.evaluate(source, env) {
                Ok(value) => Resolved::Value(value),
                Err(source) => return Err(ResolutionError::Expression { path, source }),
            },
            (_, _) => return Err(ResolutionError::NotAnExpression(path)),
        };
        out.insert(key.clone(), resolved);
    }
    Ok(out)
}
