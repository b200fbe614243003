//! Ordering strings.
//!
//! `-autor.nombre,titulo` becomes `[["autor","nombre","DESC"], ["titulo","ASC"]]`.
//! Fields are passed through as written; nothing is checked against the
//! shape or schema.

use super::descriptor::{OrderSpec, SortDir};

/// Parse one ordering field.
pub fn parse_order(field: &str) -> OrderSpec {
    let (field, dir) = match field.strip_prefix('-') {
        Some(rest) => (rest, SortDir::Desc),
        None => (field, SortDir::Asc),
    };
    let path = field.split('.').map(str::to_string).collect();
    OrderSpec::new(path, dir)
}

/// Parse a comma-separated ordering string, keeping input order.
pub fn parse_order_list(order: &str) -> Vec<OrderSpec> {
    order
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(parse_order)
        .collect()
}
