//! Selection strings and the descriptors compiled from them.
//!
//! A selection string names the fields to fetch at each level of a result
//! tree. Relations nest with parentheses:
//!
//! ```text
//! titulo,precio,autor(nombre,ci,telefono)
//! all,-precio                 every field except precio
//! autor()                     same as autor(all)
//! id_libro=3,titulo           inline filter (keys mode only)
//! ```
//!
//! The ordering string is a separate, comma-separated list of dotted paths;
//! a leading `-` sorts descending.

pub(crate) mod builder;
pub mod compiler;
pub mod descriptor;
pub mod order;
pub mod token;

pub use compiler::{
    CompileOptions, CompileOutput, Compiler, Diagnostic, Severity, DEFAULT_MAX_DEPTH,
};
pub use descriptor::{FilterValue, OrderSpec, SelectionDescriptor, SortDir};
pub use order::{parse_order, parse_order_list};
pub use token::{find_matching_close, tokenize, ScanIssue, ScannedToken, SelectionToken, Span};

use crate::query::QueryObject;
use crate::shape::Shape;

/// Compile `query` against `shape` with default options and no schema.
pub fn compile(query: &QueryObject, shape: Option<&Shape>) -> SelectionDescriptor {
    Compiler::new(shape).compile(query)
}
