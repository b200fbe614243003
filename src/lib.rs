//! # Sifter
//!
//! Field selection and response projection for hierarchical data.
//!
//! ## Architecture
//!
//! A caller's query names the fields it wants with a compact selection string
//! (`titulo,autor(nombre)`). Sifter compiles that string against a declared
//! output shape, and optionally a schema, into a descriptor, then uses the
//! descriptor to trim actual data down to what was asked for:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Query Object                          │
//! │      (fields, order, limit/offset, dotted filters)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [selection::Compiler]
//!       Shape ───────────► │ ◄─────────── SchemaProvider (optional)
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                Selection Descriptor                      │
//! │   (attributes, exclude, where, include, order, paging)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [projection::Projector]
//! ┌─────────────────────────────────────────────────────────┐
//! │               Projected data (nested / flat)             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Neither stage fails: unknown names are dropped, malformed nesting is read
//! generously, and data that disagrees with the shape projects to nothing at
//! that subtree.

pub mod config;
pub mod projection;
pub mod query;
pub mod schema;
pub mod selection;
pub mod shape;

pub use projection::{filter_top, project, ProjectionMode, Projector};
pub use query::QueryObject;
pub use selection::{compile, CompileOptions, Compiler, SelectionDescriptor};
pub use shape::{Shape, ShapeNode};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::projection::{filter_top, project, ProjectionMode, Projector};
    pub use crate::query::QueryObject;
    pub use crate::schema::{
        ModelDef, ModelSchema, NoSchema, SchemaProvider, SchemaRegistry,
    };
    pub use crate::selection::{
        compile, parse_order, parse_order_list, CompileOptions, CompileOutput, Compiler,
        Diagnostic, FilterValue, OrderSpec, SelectionDescriptor, Severity, SortDir,
    };
    pub use crate::shape::{FieldMarker, KeyKind, Shape, ShapeNode};
}
