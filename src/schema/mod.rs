//! Schema provider module.
//!
//! The compiler asks a schema provider whether a requested name is a real,
//! fetchable attribute, whether it is a key, and where an association leads.
//! Nothing here knows about persistence: callers plug in whatever model
//! metadata they have.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SchemaProvider                           │
//! │  - is_attribute(name)          - association_target(name)       │
//! │  - attribute_names()           - association_names()            │
//! │  - is_key(name)                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//!           │                                   │
//!           ▼                                   ▼
//! ┌──────────────────────────┐     ┌──────────────────────────────┐
//! │  ModelSchema<'_>         │     │  NoSchema                    │
//! │  (in-memory registry,    │     │  (no provider: every shape   │
//! │   loadable from TOML)    │     │   name is accepted)          │
//! └──────────────────────────┘     └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sifter::schema::{ModelDef, SchemaRegistry, SchemaProvider};
//!
//! let registry = SchemaRegistry::new()
//!     .with_model(ModelDef::new("autor").primary_key("id_autor").attribute("nombre"))
//!     .with_model(
//!         ModelDef::new("libro")
//!             .primary_key("id_libro")
//!             .attribute("titulo")
//!             .foreign_key("fid_autor")
//!             .belongs_to("autor", "autor"),
//!     );
//!
//! let libro = registry.model("libro").unwrap();
//! assert!(libro.is_attribute("titulo"));
//! assert!(libro.association_target("autor").is_some());
//! ```

mod provider;
mod registry;

pub use provider::{NoSchema, SchemaProvider};
pub use registry::{
    AssociationDef, AssociationKind, AttributeDef, ModelDef, ModelSchema, SchemaError,
    SchemaRegistry, SchemaResult,
};
