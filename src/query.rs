//! Query objects.
//!
//! A query object carries the caller's request: the selection string
//! (`fields`), the ordering string (`order`), paging passthroughs, and any
//! other key, which is read as a filter on the dotted attribute path it names
//! (`titulo=El cuervo`, `autor.nombre=Poe`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys with a fixed meaning; every other key is a filter path.
pub const RESERVED_KEYS: [&str; 6] = ["fields", "order", "limit", "offset", "col", "distinct"];

/// The request a descriptor is compiled from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueryObject {
    /// Selection string. Absent means "all".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,

    /// Comma-separated, optionally dash-prefixed, dot-path fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<Value>,

    /// Filters keyed by dotted attribute path.
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl QueryObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a query from raw key/value pairs, e.g. a decoded query string.
    ///
    /// Values stay text; `limit` and `offset` become numbers when they parse
    /// as one, and `distinct` becomes a boolean for `true`/`false`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = QueryObject::new();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "fields" => query.fields = Some(value),
                "order" => query.order = Some(value),
                "limit" => query.limit = Some(number_or_text(value)),
                "offset" => query.offset = Some(number_or_text(value)),
                "col" => query.col = Some(Value::String(value)),
                "distinct" => query.distinct = Some(bool_or_text(value)),
                other => {
                    query.filters.insert(other.to_string(), Value::String(value));
                }
            }
        }
        query
    }

    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(Value::from(limit));
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(Value::from(offset));
        self
    }

    /// Add a filter on a dotted attribute path.
    pub fn with_filter(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(path.into(), value.into());
        self
    }

    /// The filter value for `path`, ignoring null and empty-string values.
    pub fn filter(&self, path: &str) -> Option<&Value> {
        self.filters.get(path).filter(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
    }
}

fn number_or_text(value: String) -> Value {
    match value.trim().parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(value),
    }
}

fn bool_or_text(value: String) -> Value {
    match value.trim() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value),
    }
}
