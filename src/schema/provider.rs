//! SchemaProvider trait definition.

/// Capability the compiler consults to validate requested names.
///
/// Implementations are cheap handles (typically a reference into some model
/// registry): `association_target` returns a new handle for the nested model
/// rather than a borrow, so providers backed by a lookup table can follow
/// cyclic associations without owning each other.
pub trait SchemaProvider: Sized {
    /// Whether `name` is a real, fetchable attribute of this model.
    fn is_attribute(&self, name: &str) -> bool;

    /// Every attribute of this model, in declaration order.
    fn attribute_names(&self) -> Vec<String>;

    /// Whether `name` is a primary or foreign key.
    fn is_key(&self, name: &str) -> bool {
        let _ = name;
        false
    }

    /// The model reached through association `name`.
    fn association_target(&self, name: &str) -> Option<Self>;

    /// Every association of this model, in declaration order.
    fn association_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Stand-in provider type for compiling without a schema.
///
/// It has no values, so a compiler parameterised with it can only ever hold
/// `None` and every schema check is skipped.
#[derive(Debug, Clone, Copy)]
pub enum NoSchema {}

impl SchemaProvider for NoSchema {
    fn is_attribute(&self, _name: &str) -> bool {
        match *self {}
    }

    fn attribute_names(&self) -> Vec<String> {
        match *self {}
    }

    fn association_target(&self, _name: &str) -> Option<Self> {
        match *self {}
    }
}
