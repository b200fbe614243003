//! Output shapes.
//!
//! A shape is the template a caller supplies to describe the result tree:
//! which keys are plain fields, which are relations, and whether a relation
//! yields one object or many.
//!
//! Shapes can be built in code or read from JSON:
//!
//! ```text
//! [{                          <- multi-valued root
//!   "id_libro": "pk",         <- field marker (primary key)
//!   "titulo": true,           <- field marker
//!   "fid_autor": "fk",        <- field marker (foreign key)
//!   "autor": { ... },         <- single-valued relation
//!   "libros": [{ ... }]       <- multi-valued relation
//! }]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sifter::shape::{Shape, ShapeNode};
//!
//! let libro = ShapeNode::Many(
//!     Shape::new()
//!         .primary_key("id_libro")
//!         .field("titulo")
//!         .field("precio")
//!         .one("autor", Shape::new().primary_key("id_autor").field("nombre")),
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while reading a shape from JSON.
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("Invalid field marker for '{key}': {value}")]
    InvalidMarker { key: String, value: String },

    #[error("Multi-valued relation '{0}' must hold exactly one object")]
    InvalidMany(String),

    #[error("Shape root must be an object or a one-element array holding an object")]
    InvalidRoot,

    #[error("Failed to parse shape JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ShapeResult<T> = Result<T, ShapeError>;

// ============================================================================
// Field markers
// ============================================================================

/// Key role of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Primary,
    Foreign,
}

/// A shape leaf: a real, directly copyable data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldMarker {
    pub key: Option<KeyKind>,
}

impl FieldMarker {
    pub fn plain() -> Self {
        Self { key: None }
    }

    pub fn primary_key() -> Self {
        Self {
            key: Some(KeyKind::Primary),
        }
    }

    pub fn foreign_key() -> Self {
        Self {
            key: Some(KeyKind::Foreign),
        }
    }

    /// Returns true for primary and foreign keys.
    pub fn is_key(&self) -> bool {
        self.key.is_some()
    }
}

// ============================================================================
// Shape tree
// ============================================================================

/// One node of a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeNode {
    /// A plain field.
    Field(FieldMarker),
    /// A single-valued relation.
    One(Shape),
    /// A multi-valued relation.
    Many(Shape),
}

impl ShapeNode {
    pub fn is_field(&self) -> bool {
        matches!(self, ShapeNode::Field(_))
    }

    pub fn is_relation(&self) -> bool {
        !self.is_field()
    }

    /// The object template of a relation, regardless of cardinality.
    pub fn shape(&self) -> Option<&Shape> {
        match self {
            ShapeNode::Field(_) => None,
            ShapeNode::One(shape) | ShapeNode::Many(shape) => Some(shape),
        }
    }

    /// Read a root shape from a JSON value.
    ///
    /// The root must be an object (single result) or a one-element array
    /// holding an object (many results).
    pub fn from_json(value: &Value) -> ShapeResult<Self> {
        match value {
            Value::Object(map) => Ok(ShapeNode::One(Shape::from_json_object(map)?)),
            Value::Array(items) => match items.as_slice() {
                [Value::Object(map)] => Ok(ShapeNode::Many(Shape::from_json_object(map)?)),
                _ => Err(ShapeError::InvalidRoot),
            },
            _ => Err(ShapeError::InvalidRoot),
        }
    }

    /// Read a root shape from JSON text.
    pub fn from_json_str(source: &str) -> ShapeResult<Self> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_json(&value)
    }

    fn from_json_entry(key: &str, value: &Value) -> ShapeResult<Self> {
        match value {
            Value::Bool(true) => Ok(ShapeNode::Field(FieldMarker::plain())),
            Value::String(tag) => match tag.to_ascii_lowercase().as_str() {
                "field" => Ok(ShapeNode::Field(FieldMarker::plain())),
                "pk" | "primary" => Ok(ShapeNode::Field(FieldMarker::primary_key())),
                "fk" | "foreign" => Ok(ShapeNode::Field(FieldMarker::foreign_key())),
                _ => Err(ShapeError::InvalidMarker {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            },
            Value::Object(map) => Ok(ShapeNode::One(Shape::from_json_object(map)?)),
            Value::Array(items) => match items.as_slice() {
                [Value::Object(map)] => Ok(ShapeNode::Many(Shape::from_json_object(map)?)),
                _ => Err(ShapeError::InvalidMany(key.to_string())),
            },
            _ => Err(ShapeError::InvalidMarker {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// An object template: ordered keys, each a field or a relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    entries: Vec<(String, ShapeNode)>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain field.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.with(name, ShapeNode::Field(FieldMarker::plain()))
    }

    /// Add a primary-key field.
    pub fn primary_key(self, name: impl Into<String>) -> Self {
        self.with(name, ShapeNode::Field(FieldMarker::primary_key()))
    }

    /// Add a foreign-key field.
    pub fn foreign_key(self, name: impl Into<String>) -> Self {
        self.with(name, ShapeNode::Field(FieldMarker::foreign_key()))
    }

    /// Add a single-valued relation.
    pub fn one(self, name: impl Into<String>, shape: Shape) -> Self {
        self.with(name, ShapeNode::One(shape))
    }

    /// Add a multi-valued relation.
    pub fn many(self, name: impl Into<String>, shape: Shape) -> Self {
        self.with(name, ShapeNode::Many(shape))
    }

    fn with(mut self, name: impl Into<String>, node: ShapeNode) -> Self {
        self.insert(name, node);
        self
    }

    /// Insert a node, replacing an existing key in place.
    pub fn insert(&mut self, name: impl Into<String>, node: ShapeNode) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = node,
            None => self.entries.push((name, node)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ShapeNode> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    /// The field marker under `name`, if `name` is a field.
    pub fn field_marker(&self, name: &str) -> Option<&FieldMarker> {
        match self.get(name) {
            Some(ShapeNode::Field(marker)) => Some(marker),
            _ => None,
        }
    }

    /// The relation node under `name`, if `name` is a relation.
    pub fn relation(&self, name: &str) -> Option<&ShapeNode> {
        self.get(name).filter(|node| node.is_relation())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShapeNode)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Field markers in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldMarker)> {
        self.iter().filter_map(|(key, node)| match node {
            ShapeNode::Field(marker) => Some((key, marker)),
            _ => None,
        })
    }

    /// Relations in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &ShapeNode)> {
        self.iter().filter(|(_, node)| node.is_relation())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_json_object(map: &Map<String, Value>) -> ShapeResult<Self> {
        let mut shape = Shape::new();
        for (key, value) in map {
            shape.insert(key.clone(), ShapeNode::from_json_entry(key, value)?);
        }
        Ok(shape)
    }
}
