// tests/selection/compiler_test.rs
use serde_json::json;
use sifter::query::QueryObject;
use sifter::selection::{compile, CompileOptions, Compiler, FilterValue, Severity};
use sifter::shape::Shape;

fn libro() -> Shape {
    Shape::new()
        .primary_key("id_libro")
        .field("titulo")
        .field("precio")
        .foreign_key("fid_autor")
        .one(
            "autor",
            Shape::new()
                .primary_key("id_autor")
                .field("nombre")
                .field("ci")
                .many("premios", Shape::new().field("nombre").field("anio")),
        )
        .many("resenas", Shape::new().field("texto").field("puntaje"))
}

fn fields(selection: &str) -> QueryObject {
    QueryObject::new().with_fields(selection)
}

// ============================================================================
// Inclusion
// ============================================================================

#[test]
fn test_repeated_tokens_are_deduplicated() {
    let shape = libro();
    let once = compile(&fields("titulo"), Some(&shape));
    let thrice = compile(&fields("titulo,titulo,titulo"), Some(&shape));

    assert_eq!(once.attributes, thrice.attributes);
    assert_eq!(thrice.attributes, vec!["titulo"]);
}

#[test]
fn test_explicit_order_is_kept() {
    let shape = libro();
    let descriptor = compile(&fields("precio,titulo,id_libro"), Some(&shape));
    assert_eq!(descriptor.attributes, vec!["precio", "titulo", "id_libro"]);
}

#[test]
fn test_unknown_fields_are_dropped() {
    let shape = libro();
    let descriptor = compile(&fields("titulo,isbn,autor(nombre,edad)"), Some(&shape));

    assert_eq!(descriptor.attributes, vec!["titulo"]);
    assert_eq!(descriptor.include("autor").unwrap().attributes, vec!["nombre"]);
}

#[test]
fn test_relation_name_as_plain_field_is_dropped() {
    let shape = libro();
    let output =
        Compiler::new(Some(&shape)).compile_with_diagnostics(&fields("titulo,autor"));

    assert_eq!(output.descriptor.attributes, vec!["titulo"]);
    assert!(output.descriptor.includes.is_empty());
    assert!(output.diagnostics[0].message.contains("autor(...)"));
    assert_eq!(output.diagnostics[0].severity, Severity::Info);
}

#[test]
fn test_nested_relations() {
    let shape = libro();
    let descriptor = compile(
        &fields("titulo,autor(nombre,premios(anio)),resenas(puntaje)"),
        Some(&shape),
    );

    let autor = descriptor.include("autor").unwrap();
    assert_eq!(autor.association_name.as_deref(), Some("autor"));
    assert_eq!(autor.attributes, vec!["nombre"]);
    assert_eq!(autor.include("premios").unwrap().attributes, vec!["anio"]);
    assert_eq!(descriptor.include("resenas").unwrap().attributes, vec!["puntaje"]);
}

#[test]
fn test_duplicate_relations_merge() {
    let shape = libro();
    let descriptor = compile(&fields("autor(nombre),titulo,autor(ci)"), Some(&shape));

    assert_eq!(descriptor.includes.len(), 1);
    assert_eq!(descriptor.include("autor").unwrap().attributes, vec!["nombre", "ci"]);
}

#[test]
fn test_empty_parentheses_select_everything() {
    let shape = libro();
    let empty = compile(&fields("autor()"), Some(&shape));
    let all = compile(&fields("autor(all)"), Some(&shape));

    assert_eq!(empty, all);
    assert_eq!(
        empty.include("autor").unwrap().attributes,
        vec!["id_autor", "nombre", "ci"]
    );
}

#[test]
fn test_empty_selection_compiles_to_empty_descriptor() {
    let shape = libro();
    let descriptor = compile(&fields(""), Some(&shape));

    assert!(descriptor.attributes.is_empty());
    assert!(descriptor.includes.is_empty());
    assert!(descriptor.is_empty());
}

// ============================================================================
// All
// ============================================================================

#[test]
fn test_all_matches_listing_every_field() {
    let shape = libro();
    let all = compile(&fields("all"), Some(&shape));
    let listed = compile(
        &fields(
            "id_libro,titulo,precio,fid_autor,autor(all),resenas(all)",
        ),
        Some(&shape),
    );

    assert_eq!(all.attributes, listed.attributes);
    assert_eq!(all.includes, listed.includes);
}

#[test]
fn test_all_walks_relations_recursively() {
    let shape = libro();
    let descriptor = compile(&QueryObject::new(), Some(&shape));

    assert_eq!(
        descriptor.attributes,
        vec!["id_libro", "titulo", "precio", "fid_autor"]
    );
    let autor = descriptor.include("autor").unwrap();
    assert_eq!(autor.attributes, vec!["id_autor", "nombre", "ci"]);
    assert_eq!(
        autor.include("premios").unwrap().attributes,
        vec!["nombre", "anio"]
    );
    assert_eq!(
        descriptor.include("resenas").unwrap().attributes,
        vec!["texto", "puntaje"]
    );
}

#[test]
fn test_all_with_explicit_relation_uses_its_body() {
    let shape = libro();
    let descriptor = compile(&fields("all,autor(nombre)"), Some(&shape));

    assert_eq!(descriptor.includes.len(), 2);
    assert_eq!(descriptor.include("autor").unwrap().attributes, vec!["nombre"]);
    assert!(descriptor.include("resenas").is_some());
}

#[test]
fn test_excluded_relation_is_not_walked() {
    let shape = libro();
    let descriptor = compile(&fields("all,-resenas"), Some(&shape));

    assert!(descriptor.include("resenas").is_none());
    assert!(descriptor.include("autor").is_some());
    assert_eq!(descriptor.attributes.len(), 4);
}

#[test]
fn test_all_without_shape_marks_everything() {
    let descriptor = compile(&fields("all,-precio"), None);

    assert!(descriptor.all_attributes);
    assert!(descriptor.include_all);
    assert!(descriptor.attributes.is_empty());
    assert_eq!(descriptor.excluded, vec!["precio"]);
    assert!(descriptor.selects("titulo"));
    assert!(!descriptor.selects("precio"));
}

#[test]
fn test_no_shape_keeps_explicit_names() {
    let descriptor = compile(&fields("titulo,autor(nombre)"), None);

    assert_eq!(descriptor.attributes, vec!["titulo"]);
    assert_eq!(descriptor.include("autor").unwrap().attributes, vec!["nombre"]);
    assert!(!descriptor.include_all);
}

// ============================================================================
// Exclusion
// ============================================================================

#[test]
fn test_exclusion_complement() {
    let shape = Shape::new().field("a").field("b").field("c");
    let descriptor = compile(&fields("-b"), Some(&shape));

    assert_eq!(descriptor.attributes, vec!["a", "c"]);
    assert_eq!(descriptor.excluded, vec!["b"]);
}

#[test]
fn test_exclusion_wins_over_inclusion() {
    let shape = Shape::new().field("a").field("b").field("c");
    let descriptor = compile(&fields("a,b,-b"), Some(&shape));

    assert!(!descriptor.attributes.contains(&"b".to_string()));
    assert_eq!(descriptor.excluded, vec!["b"]);
}

#[test]
fn test_exclusion_inside_relation() {
    let shape = libro();
    let descriptor = compile(&fields("titulo,autor(-ci)"), Some(&shape));

    assert_eq!(descriptor.attributes, vec!["titulo"]);
    assert_eq!(
        descriptor.include("autor").unwrap().attributes,
        vec!["id_autor", "nombre"]
    );
}

#[test]
fn test_attributes_never_overlap_exclusions() {
    let shape = libro();
    for selection in ["-titulo", "all,-precio", "titulo,-titulo", "autor(-nombre,all)"] {
        let descriptor = compile(&fields(selection), Some(&shape));
        let mut levels = vec![&descriptor];
        while let Some(level) = levels.pop() {
            for name in &level.excluded {
                assert!(
                    !level.attributes.contains(name),
                    "{} both selected and excluded for {:?}",
                    name,
                    selection
                );
            }
            levels.extend(level.includes.iter());
        }
    }
}

#[test]
fn test_relation_exclusion_alone_selects_complement() {
    let shape = Shape::new()
        .field("titulo")
        .field("precio")
        .one("autor", Shape::new().field("nombre"));
    let descriptor = compile(&fields("-autor"), Some(&shape));

    assert_eq!(descriptor.attributes, vec!["titulo", "precio"]);
    assert!(descriptor.includes.is_empty());
    assert!(!descriptor.is_empty());
}

#[test]
fn test_padded_relation_body_spans() {
    let shape = libro();
    let input = "autor(  isbn)";
    let output = Compiler::new(Some(&shape)).compile_with_diagnostics(&fields(input));

    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].span, 8..12);
    assert_eq!(&input[output.diagnostics[0].span.clone()], "isbn");
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_query_filter_promoted_by_dotted_path() {
    let shape = libro();
    let query = fields("titulo,autor(nombre)")
        .with_filter("titulo", "El cuervo")
        .with_filter("autor.nombre", "Poe");
    let descriptor = compile(&query, Some(&shape));

    assert_eq!(
        descriptor.filters.get("titulo"),
        Some(&FilterValue::text("El cuervo"))
    );
    assert!(descriptor.filters_required());

    let autor = descriptor.include("autor").unwrap();
    assert_eq!(autor.filters.get("nombre"), Some(&FilterValue::text("Poe")));
    assert!(autor.filters_required());
}

#[test]
fn test_query_filters_promoted_on_all() {
    let shape = libro();
    let query = fields("all")
        .with_filter("titulo", "El cuervo")
        .with_filter("autor.nombre", "Poe");
    let descriptor = compile(&query, Some(&shape));

    assert_eq!(
        descriptor.filters.get("titulo"),
        Some(&FilterValue::text("El cuervo"))
    );
    assert_eq!(descriptor.filters_required, Some(true));

    let autor = descriptor.include("autor").unwrap();
    assert_eq!(autor.filters.get("nombre"), Some(&FilterValue::text("Poe")));
    assert_eq!(autor.filters_required, Some(true));
    assert!(descriptor.include("resenas").unwrap().filters.is_empty());
}

#[test]
fn test_query_filters_promoted_without_shape() {
    let query = fields("all,-precio")
        .with_filter("titulo", "El cuervo")
        .with_filter("precio", "10")
        .with_filter("autor.nombre", "Poe");
    let descriptor = compile(&query, None);

    assert!(descriptor.all_attributes);
    assert_eq!(descriptor.filters.len(), 1);
    assert_eq!(
        descriptor.filters.get("titulo"),
        Some(&FilterValue::text("El cuervo"))
    );
    assert!(descriptor.filters_required());
}

#[test]
fn test_query_filter_makes_inline_filters_required() {
    let shape = libro();
    let query = fields("id_libro=3,titulo").with_filter("titulo", "El cuervo");
    let descriptor = Compiler::new(Some(&shape))
        .with_options(CompileOptions::default().with_keys(true))
        .compile(&query);

    assert_eq!(descriptor.filters.len(), 2);
    assert_eq!(descriptor.filters.get("id_libro"), Some(&FilterValue::text("3")));
    assert_eq!(
        descriptor.filters.get("titulo"),
        Some(&FilterValue::text("El cuervo"))
    );
    assert_eq!(descriptor.filters_required, Some(true));
}

#[test]
fn test_filter_on_unselected_field_is_ignored() {
    let shape = libro();
    let query = fields("titulo").with_filter("precio", 10);
    let descriptor = compile(&query, Some(&shape));

    assert!(descriptor.filters.is_empty());
    assert!(!descriptor.filters_required());
}

#[test]
fn test_comma_filter_becomes_list() {
    let shape = libro();
    let query = fields("titulo").with_filter("titulo", "a,b");
    let descriptor = compile(&query, Some(&shape));

    assert_eq!(
        descriptor.filters.get("titulo"),
        Some(&FilterValue::Many(vec![json!("a"), json!("b")]))
    );
}

#[test]
fn test_falsy_filter_values() {
    let shape = libro();
    let query = fields("titulo,precio")
        .with_filter("precio", 0)
        .with_filter("titulo", "");
    let descriptor = compile(&query, Some(&shape));

    assert_eq!(descriptor.filters.get("precio"), Some(&FilterValue::One(json!(0))));
    assert!(descriptor.filters.get("titulo").is_none());
}

#[test]
fn test_inline_filter_ignored_outside_keys_mode() {
    let shape = libro();
    let output = Compiler::new(Some(&shape))
        .compile_with_diagnostics(&fields("id_libro=3,titulo"));

    assert_eq!(output.descriptor.attributes, vec!["id_libro", "titulo"]);
    assert!(output.descriptor.filters.is_empty());
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].severity, Severity::Info);
}

#[test]
fn test_inline_filter_in_keys_mode() {
    let shape = libro();
    let descriptor = Compiler::new(Some(&shape))
        .with_options(CompileOptions::default().with_keys(true))
        .compile(&fields("id_libro=3,titulo"));

    assert_eq!(descriptor.attributes, vec!["id_libro", "titulo"]);
    assert_eq!(descriptor.filters.get("id_libro"), Some(&FilterValue::text("3")));
    assert_eq!(descriptor.filters_required, Some(false));
}

// ============================================================================
// Passthroughs
// ============================================================================

#[test]
fn test_paging_and_order_copied_to_root() {
    let shape = libro();
    let query = fields("titulo,autor(nombre)")
        .with_order("-autor.nombre,titulo")
        .with_limit(10)
        .with_offset(20);
    let descriptor = compile(&query, Some(&shape));

    assert_eq!(descriptor.limit, Some(json!(10)));
    assert_eq!(descriptor.offset, Some(json!(20)));
    assert_eq!(descriptor.order.len(), 2);
    assert_eq!(
        descriptor.order[0].to_segments(),
        vec!["autor", "nombre", "DESC"]
    );

    let autor = descriptor.include("autor").unwrap();
    assert!(autor.limit.is_none());
    assert!(autor.order.is_empty());
}

#[test]
fn test_compiler_is_reusable() {
    let shape = libro();
    let compiler = Compiler::new(Some(&shape));

    let first = compiler.compile(&fields("titulo"));
    let _ = compiler.compile(&fields("precio,autor(all)"));
    let again = compiler.compile(&fields("titulo"));

    assert_eq!(first, again);
}
