//! Per-level accumulator used while compiling one nesting level.
//!
//! Each recursive compile frame owns its own builder; siblings never share one.

use std::collections::BTreeMap;

use super::descriptor::FilterValue;

/// A relation requested at this level, with every body it was requested with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RelationRequest {
    pub name: String,
    /// `(body, offset of the body in the root selection string)`.
    pub segments: Vec<(String, usize)>,
}

#[derive(Debug, Default)]
pub(crate) struct LevelBuilder {
    pub attributes: Vec<String>,
    pub excluded: Vec<String>,
    pub excluded_relations: Vec<String>,
    pub filters: BTreeMap<String, FilterValue>,
    pub relations: Vec<RelationRequest>,
    pub all_requested: bool,
}

impl LevelBuilder {
    /// A builder for a level selected with `all` and nothing else.
    pub fn all() -> Self {
        Self {
            all_requested: true,
            ..Self::default()
        }
    }

    pub fn request_all(&mut self) {
        self.all_requested = true;
    }

    pub fn include(&mut self, name: &str) {
        push_unique(&mut self.attributes, name);
    }

    pub fn exclude(&mut self, name: &str) {
        push_unique(&mut self.excluded, name);
    }

    pub fn exclude_relation(&mut self, name: &str) {
        push_unique(&mut self.excluded_relations, name);
    }

    pub fn filter(&mut self, name: &str, value: &str) {
        self.filters
            .insert(name.to_string(), FilterValue::text(value));
    }

    /// Record a relation body; repeated relations merge into one request.
    pub fn relation(&mut self, name: &str, body: &str, offset: usize) {
        let segment = (body.to_string(), offset);
        match self.relations.iter_mut().find(|r| r.name == name) {
            Some(existing) => existing.segments.push(segment),
            None => self.relations.push(RelationRequest {
                name: name.to_string(),
                segments: vec![segment],
            }),
        }
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.iter().any(|r| r.name == name)
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}
