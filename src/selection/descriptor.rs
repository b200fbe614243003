//! Selection descriptors.
//!
//! A descriptor is the compiled form of a selection string: which attributes
//! to keep, which associations to traverse, which filters apply, and how to
//! sort. It serializes in the layout a data-access layer consumes:
//!
//! ```text
//! {
//!   "attributes": ["titulo", "precio"],
//!   "include": [{ "attributes": ["nombre"], "association": "autor" }],
//!   "order": [["autor", "nombre", "DESC"]]
//! }
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// Filters
// ============================================================================

/// A filter value: one scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Many(Vec<Value>),
    One(Value),
}

impl FilterValue {
    /// Inline filter text from a selection token.
    pub fn text(value: impl Into<String>) -> Self {
        FilterValue::One(Value::String(value.into()))
    }

    /// Convert a query-object value; strings holding commas become lists.
    pub fn from_query_value(value: &Value) -> Self {
        match value {
            Value::String(s) if s.contains(',') => FilterValue::Many(
                s.split(',')
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            Value::Array(items) => FilterValue::Many(items.clone()),
            other => FilterValue::One(other.clone()),
        }
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ordering entry: a dot-split path plus a direction.
///
/// Serializes as a flat list with the direction last: `["autor", "nombre", "DESC"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub path: Vec<String>,
    pub dir: SortDir,
}

impl OrderSpec {
    pub fn new(path: Vec<String>, dir: SortDir) -> Self {
        Self { path, dir }
    }

    /// Path segments followed by the direction token.
    pub fn to_segments(&self) -> Vec<String> {
        let mut segments = self.path.clone();
        segments.push(self.dir.to_string());
        segments
    }
}

impl Serialize for OrderSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.path.len() + 1))?;
        for segment in &self.path {
            seq.serialize_element(segment)?;
        }
        seq.serialize_element(self.dir.as_str())?;
        seq.end()
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Compiled selection for one level of the result tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SelectionDescriptor {
    /// Attributes to keep, unique, in first-seen order.
    pub attributes: Vec<String>,

    /// Every attribute is selected (minus `excluded`); set when there was
    /// nothing to enumerate them from.
    #[serde(rename = "allAttributes", skip_serializing_if = "is_false")]
    pub all_attributes: bool,

    /// Attributes explicitly negated with a leading `-`.
    #[serde(rename = "exclude", skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<String>,

    #[serde(rename = "where", skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterValue>,

    /// `Some(true)` when a filter came from the query object, `Some(false)`
    /// when all filters are inline selection tokens.
    #[serde(rename = "required", skip_serializing_if = "Option::is_none")]
    pub filters_required: Option<bool>,

    #[serde(rename = "include", skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<SelectionDescriptor>,

    /// Every association not listed in `includes` is selected in full.
    #[serde(rename = "includeAll", skip_serializing_if = "is_false")]
    pub include_all: bool,

    #[serde(rename = "association", skip_serializing_if = "Option::is_none")]
    pub association_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl SelectionDescriptor {
    /// A descriptor selecting every attribute and every association.
    pub fn everything() -> Self {
        Self {
            all_attributes: true,
            include_all: true,
            ..Self::default()
        }
    }

    /// Whether attribute `name` is kept at this level.
    pub fn selects(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
            || (self.all_attributes && !self.excluded.iter().any(|e| e == name))
    }

    /// The child descriptor compiled for association `name`.
    pub fn include(&self, name: &str) -> Option<&SelectionDescriptor> {
        self.includes
            .iter()
            .find(|child| child.association_name.as_deref() == Some(name))
    }

    /// The descriptor governing association `name`, if it is selected at all.
    pub fn child(&self, name: &str) -> Option<Cow<'_, SelectionDescriptor>> {
        match self.include(name) {
            Some(child) => Some(Cow::Borrowed(child)),
            None if self.include_all => Some(Cow::Owned(SelectionDescriptor::everything())),
            None => None,
        }
    }

    /// Whether filters on this level must match.
    pub fn filters_required(&self) -> bool {
        self.filters_required.unwrap_or(false)
    }

    /// True when nothing at all is selected.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && !self.all_attributes
            && self.includes.is_empty()
            && !self.include_all
    }
}
