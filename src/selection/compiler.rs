//! Descriptor compiler.
//!
//! Turns a query object into a [`SelectionDescriptor`]:
//!
//! ```text
//! fields ──► tokenize level ──► LevelBuilder ──► resolve attributes ──► descriptor
//!               ▲                    │                                     │
//!               └──── relation body ─┘            promote query filters ◄──┘
//! ```
//!
//! Compilation never fails. Unknown names are dropped, malformed nesting is
//! read as generously as possible, and anything worth telling the caller about
//! is reported as a [`Diagnostic`].
//!
//! # Example
//!
//! ```ignore
//! use sifter::query::QueryObject;
//! use sifter::selection::Compiler;
//! use sifter::shape::Shape;
//!
//! let shape = Shape::new()
//!     .primary_key("id_libro")
//!     .field("titulo")
//!     .one("autor", Shape::new().primary_key("id_autor").field("nombre"));
//!
//! let query = QueryObject::new()
//!     .with_fields("titulo,autor(nombre)")
//!     .with_order("-autor.nombre");
//!
//! let descriptor = Compiler::new(Some(&shape)).compile(&query);
//! assert_eq!(descriptor.attributes, vec!["titulo"]);
//! ```

use std::fmt;

use super::builder::{LevelBuilder, RelationRequest};
use super::descriptor::{FilterValue, SelectionDescriptor};
use super::order::parse_order_list;
use super::token::{tokenize, ScanIssue, SelectionToken, Span};
use crate::query::QueryObject;
use crate::schema::{NoSchema, SchemaProvider};
use crate::shape::Shape;

/// Default bound on relation nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Keys mode: honor inline `field=value` filters and back-fill primary
    /// and foreign keys into exclusion-based selections.
    pub include_keys: bool,

    /// Relations nested deeper than this are dropped.
    pub max_depth: usize,

    /// Selection used when the query has no `fields`.
    pub default_fields: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            include_keys: false,
            max_depth: DEFAULT_MAX_DEPTH,
            default_fields: "all".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_keys(mut self, include_keys: bool) -> Self {
        self.include_keys = include_keys;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_default_fields(mut self, fields: impl Into<String>) -> Self {
        self.default_fields = fields.into();
        self
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The selection string is malformed or was cut short.
    Warning,
    /// Part of the selection had no effect.
    Info,
}

/// A note about the selection string, with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn info(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Info,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{}: {} (at {:?})", level, self.message, self.span)
    }
}

/// A descriptor plus whatever was noticed while compiling it.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub descriptor: SelectionDescriptor,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles selection strings against an optional shape and schema.
///
/// The compiler holds no mutable state; one instance can compile any number
/// of queries, from any number of threads.
#[derive(Debug, Clone)]
pub struct Compiler<'s, S = NoSchema> {
    shape: Option<&'s Shape>,
    schema: Option<S>,
    options: CompileOptions,
}

/// Where in the tree a level is being compiled.
struct Frame<'a, S> {
    shape: Option<&'a Shape>,
    schema: Option<&'a S>,
    path: String,
    depth: usize,
}

impl<S> Frame<'_, S> {
    fn display_path(&self) -> &str {
        if self.path.is_empty() {
            "<root>"
        } else {
            &self.path
        }
    }
}

impl<'s> Compiler<'s, NoSchema> {
    /// A compiler with no schema: every name the shape declares is valid.
    pub fn new(shape: Option<&'s Shape>) -> Self {
        Self {
            shape,
            schema: None,
            options: CompileOptions::default(),
        }
    }
}

impl<'s, S: SchemaProvider> Compiler<'s, S> {
    /// Check requested names against `schema` as well as the shape.
    pub fn with_schema<T: SchemaProvider>(self, schema: T) -> Compiler<'s, T> {
        Compiler {
            shape: self.shape,
            schema: Some(schema),
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a query, discarding diagnostics.
    pub fn compile(&self, query: &QueryObject) -> SelectionDescriptor {
        self.compile_with_diagnostics(query).descriptor
    }

    /// Compile a query and report what was dropped or malformed.
    pub fn compile_with_diagnostics(&self, query: &QueryObject) -> CompileOutput {
        let fields = query
            .fields
            .as_deref()
            .unwrap_or(&self.options.default_fields);
        let mut diagnostics = Vec::new();
        let root = Frame {
            shape: self.shape,
            schema: self.schema.as_ref(),
            path: String::new(),
            depth: 0,
        };

        let mut descriptor = if fields.trim().eq_ignore_ascii_case("all") {
            tracing::debug!("selection requests every field, walking the shape directly");
            self.walk_all(&root, query, &mut diagnostics)
        } else {
            self.compile_level(&[(fields.to_string(), 0)], &root, query, &mut diagnostics)
        };

        descriptor.limit = query.limit.clone().filter(|v| !v.is_null());
        descriptor.offset = query.offset.clone().filter(|v| !v.is_null());
        descriptor.col = query.col.clone().filter(|v| !v.is_null());
        descriptor.distinct = query.distinct.clone().filter(|v| !v.is_null());
        if let Some(order) = &query.order {
            descriptor.order = parse_order_list(order);
        }

        CompileOutput {
            descriptor,
            diagnostics,
        }
    }

    // ------------------------------------------------------------------------
    // Levels
    // ------------------------------------------------------------------------

    /// Compile one level from one or more selection bodies.
    fn compile_level(
        &self,
        segments: &[(String, usize)],
        frame: &Frame<'_, S>,
        query: &QueryObject,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> SelectionDescriptor {
        let mut builder = LevelBuilder::default();

        for (body, base) in segments {
            let scan = tokenize(body);
            for issue in &scan.issues {
                diagnostics.push(scan_issue_diagnostic(*issue, *base, frame));
            }

            for scanned in scan.tokens {
                let span = (base + scanned.span.start)..(base + scanned.span.end);
                match scanned.token {
                    SelectionToken::All => builder.request_all(),
                    SelectionToken::Include(name) => {
                        if self.field_exists(frame, &name) {
                            builder.include(&name);
                        } else {
                            self.drop_name(frame, &name, span, diagnostics);
                        }
                    }
                    SelectionToken::Exclude(name) => {
                        if self.field_exists(frame, &name) {
                            builder.exclude(&name);
                        } else if self.relation_target(frame, &name).is_some() {
                            builder.exclude_relation(&name);
                        } else {
                            self.drop_name(frame, &name, span, diagnostics);
                        }
                    }
                    SelectionToken::Filter { name, value } => {
                        if !self.field_exists(frame, &name) {
                            self.drop_name(frame, &name, span, diagnostics);
                            continue;
                        }
                        if self.options.include_keys {
                            builder.filter(&name, &value);
                        } else {
                            tracing::debug!(
                                field = %name,
                                path = %frame.display_path(),
                                "inline filter ignored outside keys mode"
                            );
                            diagnostics.push(Diagnostic::info(
                                span,
                                format!(
                                    "inline filter on '{}' ignored: keys mode is off",
                                    name
                                ),
                            ));
                        }
                        builder.include(&name);
                    }
                    SelectionToken::Relation { name, body } => {
                        let offset = base + scanned.body_offset.unwrap_or(scanned.span.start);
                        builder.relation(&name, &body, offset);
                    }
                }
            }
        }

        self.finish_level(builder, frame, query, diagnostics)
    }

    /// Compile a level as if its selection were exactly `all`.
    fn walk_all(
        &self,
        frame: &Frame<'_, S>,
        query: &QueryObject,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> SelectionDescriptor {
        self.finish_level(LevelBuilder::all(), frame, query, diagnostics)
    }

    fn finish_level(
        &self,
        builder: LevelBuilder,
        frame: &Frame<'_, S>,
        query: &QueryObject,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> SelectionDescriptor {
        let mut descriptor = SelectionDescriptor::default();
        self.resolve_attributes(&builder, frame, &mut descriptor);

        for request in &builder.relations {
            if let Some(child) = self.compile_relation(request, frame, query, diagnostics) {
                descriptor.includes.push(child);
            }
        }

        if builder.all_requested {
            match frame.shape {
                Some(shape) => {
                    for (name, _) in shape.relations() {
                        let skipped = builder.has_relation(name)
                            || builder.excluded_relations.iter().any(|r| r == name);
                        if skipped {
                            continue;
                        }
                        if let Some(child) = self.walk_relation(name, frame, query, diagnostics) {
                            descriptor.includes.push(child);
                        }
                    }
                }
                None => descriptor.include_all = true,
            }
        }

        descriptor.filters = builder.filters;
        if !descriptor.filters.is_empty() {
            descriptor.filters_required = Some(false);
        }
        promote_filters(&mut descriptor, frame, query);

        descriptor
    }

    /// Decide the final attribute list.
    ///
    /// Without exclusions or `all`, the explicit list stands as written. With
    /// either, the level's enumerable fields fill the list minus the
    /// exclusions; keys mode puts excluded keys back. Excluding a relation
    /// counts as an exclusion here.
    fn resolve_attributes(
        &self,
        builder: &LevelBuilder,
        frame: &Frame<'_, S>,
        descriptor: &mut SelectionDescriptor,
    ) {
        let excluded = &builder.excluded;
        let complement = builder.all_requested
            || !excluded.is_empty()
            || !builder.excluded_relations.is_empty();

        let attributes: Vec<String> = if !complement {
            builder.attributes.clone()
        } else {
            match self.enumerate(frame) {
                Some(all) => all
                    .into_iter()
                    .filter(|name| {
                        !excluded.contains(name)
                            || (self.options.include_keys && self.is_key(frame, name))
                    })
                    .collect(),
                None => {
                    descriptor.all_attributes = true;
                    Vec::new()
                }
            }
        };

        descriptor.excluded = excluded
            .iter()
            .filter(|name| !attributes.contains(*name))
            .cloned()
            .collect();
        descriptor.attributes = attributes;
    }

    fn compile_relation(
        &self,
        request: &RelationRequest,
        frame: &Frame<'_, S>,
        query: &QueryObject,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<SelectionDescriptor> {
        let span = request
            .segments
            .first()
            .map(|(body, offset)| *offset..offset + body.len())
            .unwrap_or(0..0);

        if frame.depth + 1 > self.options.max_depth {
            tracing::warn!(
                relation = %request.name,
                path = %frame.display_path(),
                max_depth = self.options.max_depth,
                "relation nested too deeply, dropped"
            );
            diagnostics.push(Diagnostic::warning(
                span,
                format!(
                    "relation '{}' under {} exceeds the maximum nesting depth of {}",
                    request.name,
                    frame.display_path(),
                    self.options.max_depth
                ),
            ));
            return None;
        }

        let Some((shape, schema)) = self.relation_target(frame, &request.name) else {
            let message = if frame
                .shape
                .and_then(|s| s.field_marker(&request.name))
                .is_some()
            {
                format!("'{}' is a field and takes no sub-selection", request.name)
            } else {
                format!(
                    "unknown relation '{}' under {} dropped",
                    request.name,
                    frame.display_path()
                )
            };
            tracing::debug!(relation = %request.name, path = %frame.display_path(), "{}", message);
            diagnostics.push(Diagnostic::info(span, message));
            return None;
        };

        let child_frame = Frame {
            shape,
            schema: schema.as_ref(),
            path: join_path(&frame.path, &request.name),
            depth: frame.depth + 1,
        };
        let mut child = self.compile_level(&request.segments, &child_frame, query, diagnostics);
        child.association_name = Some(request.name.clone());
        Some(child)
    }

    fn walk_relation(
        &self,
        name: &str,
        frame: &Frame<'_, S>,
        query: &QueryObject,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<SelectionDescriptor> {
        if frame.depth + 1 > self.options.max_depth {
            tracing::warn!(
                relation = %name,
                path = %frame.display_path(),
                max_depth = self.options.max_depth,
                "relation nested too deeply, dropped"
            );
            diagnostics.push(Diagnostic::warning(
                0..0,
                format!(
                    "relation '{}' under {} exceeds the maximum nesting depth of {}",
                    name,
                    frame.display_path(),
                    self.options.max_depth
                ),
            ));
            return None;
        }

        let (shape, schema) = self.relation_target(frame, name)?;
        let child_frame = Frame {
            shape,
            schema: schema.as_ref(),
            path: join_path(&frame.path, name),
            depth: frame.depth + 1,
        };
        let mut child = self.walk_all(&child_frame, query, diagnostics);
        child.association_name = Some(name.to_string());
        Some(child)
    }

    // ------------------------------------------------------------------------
    // Shape / schema checks
    // ------------------------------------------------------------------------

    fn field_exists(&self, frame: &Frame<'_, S>, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let in_shape = frame
            .shape
            .map_or(true, |shape| shape.field_marker(name).is_some());
        let in_schema = frame.schema.map_or(true, |schema| schema.is_attribute(name));
        in_shape && in_schema
    }

    fn is_key(&self, frame: &Frame<'_, S>, name: &str) -> bool {
        let shape_key = frame
            .shape
            .and_then(|shape| shape.field_marker(name))
            .is_some_and(|marker| marker.is_key());
        shape_key || frame.schema.is_some_and(|schema| schema.is_key(name))
    }

    /// Fetchable fields of a level, in shape order (or schema order without a shape).
    fn enumerate(&self, frame: &Frame<'_, S>) -> Option<Vec<String>> {
        match (frame.shape, frame.schema) {
            (Some(shape), schema) => Some(
                shape
                    .fields()
                    .filter(|(name, _)| schema.map_or(true, |s| s.is_attribute(name)))
                    .map(|(name, _)| name.to_string())
                    .collect(),
            ),
            (None, Some(schema)) => Some(schema.attribute_names()),
            (None, None) => None,
        }
    }

    /// Nested shape and schema for relation `name`, if both sides know it.
    fn relation_target<'a>(
        &self,
        frame: &Frame<'a, S>,
        name: &str,
    ) -> Option<(Option<&'a Shape>, Option<S>)> {
        if name.is_empty() {
            return None;
        }
        let shape = match frame.shape {
            Some(shape) => Some(shape.relation(name)?.shape()?),
            None => None,
        };
        let schema = match frame.schema {
            Some(schema) => Some(schema.association_target(name)?),
            None => None,
        };
        Some((shape, schema))
    }

    fn drop_name(
        &self,
        frame: &Frame<'_, S>,
        name: &str,
        span: Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let message = if frame.shape.and_then(|s| s.relation(name)).is_some() {
            format!(
                "'{}' is a relation; select it with '{}(...)'",
                name, name
            )
        } else {
            format!(
                "unknown field '{}' under {} dropped",
                name,
                frame.display_path()
            )
        };
        tracing::debug!(field = %name, path = %frame.display_path(), "{}", message);
        diagnostics.push(Diagnostic::info(span, message));
    }
}

/// Copy query-object filters onto the attributes they name.
///
/// A query key matches when it equals the attribute's full dotted path.
/// Filters found this way are required matches.
fn promote_filters<S>(descriptor: &mut SelectionDescriptor, frame: &Frame<'_, S>, query: &QueryObject) {
    let candidates: Vec<String> = if descriptor.all_attributes {
        query
            .filters
            .keys()
            .filter_map(|key| level_attribute(&frame.path, key))
            .filter(|name| !descriptor.excluded.iter().any(|e| e == name))
            .map(str::to_string)
            .collect()
    } else {
        descriptor.attributes.clone()
    };

    for attribute in candidates {
        let path = join_path(&frame.path, &attribute);
        if let Some(value) = query.filter(&path) {
            descriptor
                .filters
                .insert(attribute, FilterValue::from_query_value(value));
            descriptor.filters_required = Some(true);
        }
    }
}

/// The attribute name `key` addresses directly under `path`, if any.
fn level_attribute<'k>(path: &str, key: &'k str) -> Option<&'k str> {
    let rest = if path.is_empty() {
        key
    } else {
        key.strip_prefix(path)?.strip_prefix('.')?
    };
    (!rest.is_empty() && !rest.contains('.')).then_some(rest)
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn scan_issue_diagnostic<S>(issue: ScanIssue, base: usize, frame: &Frame<'_, S>) -> Diagnostic {
    match issue {
        ScanIssue::UnmatchedOpen(at) => {
            tracing::warn!(path = %frame.display_path(), offset = base + at, "unmatched '('");
            Diagnostic::warning(
                (base + at)..(base + at + 1),
                format!(
                    "unmatched '(' under {}; the rest of the selection is read as its body",
                    frame.display_path()
                ),
            )
        }
        ScanIssue::StrayClose(at) => {
            tracing::warn!(path = %frame.display_path(), offset = base + at, "stray ')'");
            Diagnostic::warning(
                (base + at)..(base + at + 1),
                format!("stray ')' under {}", frame.display_path()),
            )
        }
    }
}
