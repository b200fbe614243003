//! Flatten mode: every kept field lands in one object under a dotted path.
//!
//! Relation names become path segments (`autor.nombre`); elements of a
//! multi-valued relation contribute their index (`libros.0.titulo`). A
//! multi-valued root yields one flat object per element, without the index.

use serde_json::{Map, Value};

use crate::selection::SelectionDescriptor;
use crate::shape::{Shape, ShapeNode};

pub(super) fn flatten_root(
    data: &Value,
    node: &ShapeNode,
    descriptor: &SelectionDescriptor,
) -> Option<Value> {
    if data.is_null() {
        return None;
    }
    match node {
        ShapeNode::Field(_) => None,
        ShapeNode::One(shape) => {
            let mut out = Map::new();
            flatten_object(data, shape, descriptor, "", &mut out);
            Some(Value::Object(out))
        }
        ShapeNode::Many(shape) => {
            let rows = data
                .as_array()?
                .iter()
                .map(|item| {
                    let mut out = Map::new();
                    flatten_object(item, shape, descriptor, "", &mut out);
                    Value::Object(out)
                })
                .collect();
            Some(Value::Array(rows))
        }
    }
}

fn flatten_node(
    data: &Value,
    node: &ShapeNode,
    descriptor: &SelectionDescriptor,
    path: &str,
    out: &mut Map<String, Value>,
) {
    match node {
        ShapeNode::Field(_) => {}
        ShapeNode::One(shape) => flatten_object(data, shape, descriptor, path, out),
        ShapeNode::Many(shape) => {
            let Some(items) = data.as_array() else {
                return;
            };
            for (index, item) in items.iter().enumerate() {
                let item_path = join_path(path, &index.to_string());
                flatten_object(item, shape, descriptor, &item_path, out);
            }
        }
    }
}

fn flatten_object(
    data: &Value,
    shape: &Shape,
    descriptor: &SelectionDescriptor,
    path: &str,
    out: &mut Map<String, Value>,
) {
    let Some(object) = data.as_object() else {
        return;
    };

    for (key, node) in shape.iter() {
        if node.is_field() {
            if descriptor.selects(key) {
                if let Some(value) = object.get(key) {
                    out.insert(join_path(path, key), value.clone());
                }
            }
            continue;
        }

        let Some(child) = descriptor.child(key) else {
            continue;
        };
        match object.get(key) {
            Some(value) if !value.is_null() => {
                flatten_node(value, node, &child, &join_path(path, key), out)
            }
            _ => {}
        }
    }
}

fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}
