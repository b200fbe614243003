//! Projection of in-memory data onto a compiled selection.
//!
//! The projector walks a data value alongside its shape and keeps only what
//! the descriptor selects. Two output modes:
//!
//! ```text
//! data:     { "titulo": "El cuervo", "precio": 15.99, "autor": { "nombre": "Poe", "ci": 1 } }
//! Nested:   { "titulo": "El cuervo", "autor": { "nombre": "Poe" } }
//! Flatten:  { "titulo": "El cuervo", "autor.nombre": "Poe" }
//! ```
//!
//! Nothing here fails. Null data, or data whose structure disagrees with the
//! shape, projects to `None` at that subtree and siblings are unaffected.
//! Descriptors are only read, so one descriptor can serve any number of
//! projections.

mod flatten;

use serde_json::{Map, Value};

use crate::query::QueryObject;
use crate::selection::{Compiler, SelectionDescriptor};
use crate::shape::{Shape, ShapeNode};

/// Output layout of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Keep the nesting of the shape.
    #[default]
    Nested,
    /// Write every kept field into one object under a dotted path.
    Flatten,
}

impl ProjectionMode {
    pub fn from_flatten(flatten: bool) -> Self {
        if flatten {
            ProjectionMode::Flatten
        } else {
            ProjectionMode::Nested
        }
    }
}

/// Projects data through a shape and a descriptor compiled for it.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    shape: &'a ShapeNode,
    descriptor: &'a SelectionDescriptor,
}

impl<'a> Projector<'a> {
    pub fn new(shape: &'a ShapeNode, descriptor: &'a SelectionDescriptor) -> Self {
        Self { shape, descriptor }
    }

    /// Project `data`, returning `None` when nothing is left to show.
    pub fn project(&self, data: &Value, mode: ProjectionMode) -> Option<Value> {
        match mode {
            ProjectionMode::Nested => copy_node(data, self.shape, self.descriptor),
            ProjectionMode::Flatten => flatten::flatten_root(data, self.shape, self.descriptor),
        }
    }
}

/// Project `data` through `shape` and `descriptor`.
pub fn project(
    data: &Value,
    shape: &ShapeNode,
    descriptor: &SelectionDescriptor,
    mode: ProjectionMode,
) -> Option<Value> {
    Projector::new(shape, descriptor).project(data, mode)
}

/// Compile `query` against `shape`, then project `data` with the result.
///
/// Without a shape there is nothing to filter against and `data` comes back
/// unchanged.
pub fn filter_top(
    data: &Value,
    shape: Option<&ShapeNode>,
    query: &QueryObject,
    mode: ProjectionMode,
) -> Option<Value> {
    let Some(shape) = shape else {
        return Some(data.clone());
    };
    let descriptor = Compiler::new(shape.shape()).compile(query);
    project(data, shape, &descriptor, mode)
}

fn copy_node(data: &Value, node: &ShapeNode, descriptor: &SelectionDescriptor) -> Option<Value> {
    if data.is_null() {
        return None;
    }
    match node {
        ShapeNode::Field(_) => None,
        ShapeNode::One(shape) => copy_object(data, shape, descriptor),
        ShapeNode::Many(shape) => {
            let Some(items) = data.as_array() else {
                tracing::trace!("expected a sequence for a multi-valued shape, got {}", kind(data));
                return None;
            };
            let copied = items
                .iter()
                .filter_map(|item| copy_object(item, shape, descriptor))
                .collect();
            Some(Value::Array(copied))
        }
    }
}

fn copy_object(data: &Value, shape: &Shape, descriptor: &SelectionDescriptor) -> Option<Value> {
    let object = data.as_object()?;
    let mut result = Map::new();

    for (key, node) in shape.iter() {
        if node.is_field() {
            if descriptor.selects(key) {
                if let Some(value) = object.get(key) {
                    result.insert(key.to_string(), value.clone());
                }
            }
            continue;
        }

        let Some(child) = descriptor.child(key) else {
            continue;
        };
        if let Some(value) = object
            .get(key)
            .and_then(|value| copy_node(value, node, &child))
        {
            result.insert(key.to_string(), value);
        }
    }

    (!result.is_empty()).then_some(Value::Object(result))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
