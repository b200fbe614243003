//! In-memory model registry.
//!
//! Models are declared in code or loaded from TOML:
//!
//! ```toml
//! [[models]]
//! name = "libro"
//! attributes = [
//!     { name = "id_libro", key = "primary" },
//!     { name = "titulo" },
//!     { name = "fid_autor", key = "foreign" },
//! ]
//! associations = [
//!     { name = "autor", target = "autor" },
//! ]
//!
//! [[models]]
//! name = "autor"
//! attributes = [{ name = "id_autor", key = "primary" }, { name = "nombre" }]
//! associations = [{ name = "libros", target = "libro", kind = "many" }]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::provider::SchemaProvider;
use crate::shape::KeyKind;

/// Errors raised while loading or validating a registry.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read schema file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse schema file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Model not found: {0}")]
    UnknownModel(String),

    #[error("Duplicate model name: {0}")]
    DuplicateModel(String),

    #[error("Association '{model}.{association}' targets undefined model '{target}'")]
    UnknownTarget {
        model: String,
        association: String,
        target: String,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// A model attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttributeDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyKind>,
}

/// Cardinality of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationKind {
    #[default]
    One,
    Many,
}

/// A named association to another model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssociationDef {
    /// Alias the association is requested by.
    pub name: String,

    /// Name of the target model in the registry.
    pub target: String,

    #[serde(default)]
    pub kind: AssociationKind,
}

/// A model: ordered attributes plus associations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelDef {
    pub name: String,

    #[serde(default)]
    pub attributes: Vec<AttributeDef>,

    #[serde(default)]
    pub associations: Vec<AssociationDef>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn attribute(self, name: impl Into<String>) -> Self {
        self.with_attribute(name, None)
    }

    pub fn primary_key(self, name: impl Into<String>) -> Self {
        self.with_attribute(name, Some(KeyKind::Primary))
    }

    pub fn foreign_key(self, name: impl Into<String>) -> Self {
        self.with_attribute(name, Some(KeyKind::Foreign))
    }

    /// Single-valued association `name` to model `target`.
    pub fn belongs_to(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_association(name, target, AssociationKind::One)
    }

    /// Multi-valued association `name` to model `target`.
    pub fn has_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_association(name, target, AssociationKind::Many)
    }

    fn with_attribute(mut self, name: impl Into<String>, key: Option<KeyKind>) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            key,
        });
        self
    }

    fn with_association(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        kind: AssociationKind,
    ) -> Self {
        self.associations.push(AssociationDef {
            name: name.into(),
            target: target.into(),
            kind,
        });
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn get_association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }
}

/// A set of models that reference each other by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaRegistry {
    #[serde(default)]
    pub models: Vec<ModelDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: ModelDef) -> Self {
        self.models.push(model);
        self
    }

    /// Parse and validate a registry from TOML text.
    pub fn from_toml_str(source: &str) -> SchemaResult<Self> {
        let registry: SchemaRegistry = toml::from_str(source)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load and validate a registry from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SchemaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check for duplicate model names and dangling association targets.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name.as_str()) {
                return Err(SchemaError::DuplicateModel(model.name.clone()));
            }
        }

        for model in &self.models {
            for assoc in &model.associations {
                if !seen.contains(assoc.target.as_str()) {
                    return Err(SchemaError::UnknownTarget {
                        model: model.name.clone(),
                        association: assoc.name.clone(),
                        target: assoc.target.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// A provider handle for model `name`.
    pub fn model(&self, name: &str) -> Option<ModelSchema<'_>> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .map(|model| ModelSchema {
                registry: self,
                model,
            })
    }

    /// Like [`SchemaRegistry::model`], but reports a missing model as an error.
    pub fn require_model(&self, name: &str) -> SchemaResult<ModelSchema<'_>> {
        self.model(name)
            .ok_or_else(|| SchemaError::UnknownModel(name.to_string()))
    }
}

/// Provider handle for one model of a [`SchemaRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct ModelSchema<'a> {
    registry: &'a SchemaRegistry,
    model: &'a ModelDef,
}

impl<'a> ModelSchema<'a> {
    pub fn def(&self) -> &'a ModelDef {
        self.model
    }

    pub fn name(&self) -> &'a str {
        &self.model.name
    }
}

impl SchemaProvider for ModelSchema<'_> {
    fn is_attribute(&self, name: &str) -> bool {
        self.model.get_attribute(name).is_some()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.model.attributes.iter().map(|a| a.name.clone()).collect()
    }

    fn is_key(&self, name: &str) -> bool {
        self.model
            .get_attribute(name)
            .is_some_and(|a| a.key.is_some())
    }

    fn association_target(&self, name: &str) -> Option<Self> {
        let assoc = self.model.get_association(name)?;
        self.registry.model(&assoc.target)
    }

    fn association_names(&self) -> Vec<String> {
        self.model
            .associations
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }
}
