// tests/projection/projector_test.rs
use serde_json::{json, Value};
use sifter::projection::{filter_top, project, ProjectionMode, Projector};
use sifter::query::QueryObject;
use sifter::selection::{compile, SelectionDescriptor};
use sifter::shape::{Shape, ShapeNode};

fn libro() -> Shape {
    Shape::new()
        .primary_key("id_libro")
        .field("titulo")
        .field("precio")
        .one(
            "autor",
            Shape::new()
                .primary_key("id_autor")
                .field("nombre")
                .field("ci")
                .field("telefono"),
        )
        .many("resenas", Shape::new().field("texto").field("puntaje"))
}

fn gato_negro() -> Value {
    json!({
        "id_libro": 1,
        "titulo": "El gato negro",
        "precio": 11.99,
        "autor": {
            "id_autor": 1,
            "nombre": "Edgar Allan Poe",
            "ci": "123",
            "telefono": "555"
        },
        "resenas": [
            { "texto": "Inquietante", "puntaje": 5 },
            { "texto": "Breve", "puntaje": 4 }
        ]
    })
}

fn descriptor_for(shape: &Shape, selection: &str) -> SelectionDescriptor {
    compile(&QueryObject::new().with_fields(selection), Some(shape))
}

// ============================================================================
// Nested mode
// ============================================================================

#[test]
fn test_unselected_fields_are_dropped() {
    let shape = ShapeNode::One(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo,precio,autor(nombre)");

    let result = project(&gato_negro(), &shape, &descriptor, ProjectionMode::Nested);
    assert_eq!(
        result,
        Some(json!({
            "titulo": "El gato negro",
            "precio": 11.99,
            "autor": { "nombre": "Edgar Allan Poe" }
        }))
    );
}

#[test]
fn test_many_relation_projects_each_element() {
    let shape = ShapeNode::One(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo,resenas(puntaje)");

    let result = project(&gato_negro(), &shape, &descriptor, ProjectionMode::Nested);
    assert_eq!(
        result,
        Some(json!({
            "titulo": "El gato negro",
            "resenas": [{ "puntaje": 5 }, { "puntaje": 4 }]
        }))
    );
}

#[test]
fn test_many_root_projects_every_row() {
    let shape = ShapeNode::Many(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo");
    let data = json!([gato_negro(), { "titulo": "El cuervo", "precio": 15.99 }]);

    let result = project(&data, &shape, &descriptor, ProjectionMode::Nested);
    assert_eq!(
        result,
        Some(json!([{ "titulo": "El gato negro" }, { "titulo": "El cuervo" }]))
    );
}

#[test]
fn test_missing_data_fields_are_skipped() {
    let shape = ShapeNode::One(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo,precio");

    let result = project(&json!({ "titulo": "Sin precio" }), &shape, &descriptor, ProjectionMode::Nested);
    assert_eq!(result, Some(json!({ "titulo": "Sin precio" })));
}

#[test]
fn test_all_selection_keeps_everything_in_shape() {
    let shape = ShapeNode::One(libro());
    let descriptor = compile(&QueryObject::new(), shape.shape());

    let mut data = gato_negro();
    data["extra"] = json!("not in shape");
    let result = project(&data, &shape, &descriptor, ProjectionMode::Nested);

    assert_eq!(result, Some(gato_negro()));
}

// ============================================================================
// Absent propagation
// ============================================================================

#[test]
fn test_null_data_is_absent() {
    let shape = ShapeNode::One(libro());
    let descriptor = SelectionDescriptor::everything();

    assert_eq!(project(&Value::Null, &shape, &descriptor, ProjectionMode::Nested), None);
    assert_eq!(project(&Value::Null, &shape, &descriptor, ProjectionMode::Flatten), None);
}

#[test]
fn test_many_relation_over_non_array_is_absent() {
    let shape = ShapeNode::One(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo,resenas(texto)");
    let data = json!({ "titulo": "El gato negro", "resenas": "none yet" });

    let result = project(&data, &shape, &descriptor, ProjectionMode::Nested);
    assert_eq!(result, Some(json!({ "titulo": "El gato negro" })));
}

#[test]
fn test_null_relation_is_absent() {
    let shape = ShapeNode::One(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo,autor(nombre)");
    let data = json!({ "titulo": "Anonimo", "autor": null });

    let result = project(&data, &shape, &descriptor, ProjectionMode::Nested);
    assert_eq!(result, Some(json!({ "titulo": "Anonimo" })));
}

#[test]
fn test_nothing_selected_is_absent() {
    let shape = ShapeNode::One(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "");

    assert_eq!(
        project(&gato_negro(), &shape, &descriptor, ProjectionMode::Nested),
        None
    );
}

// ============================================================================
// Flatten mode
// ============================================================================

#[test]
fn test_flatten_uses_dotted_keys() {
    let shape = ShapeNode::One(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo,autor(nombre),resenas(puntaje)");

    let result = Projector::new(&shape, &descriptor).project(&gato_negro(), ProjectionMode::Flatten);
    assert_eq!(
        result,
        Some(json!({
            "titulo": "El gato negro",
            "autor.nombre": "Edgar Allan Poe",
            "resenas.0.puntaje": 5,
            "resenas.1.puntaje": 4
        }))
    );
}

#[test]
fn test_flatten_many_root_gives_rows() {
    let shape = ShapeNode::Many(libro());
    let descriptor = descriptor_for(libro_ref(&shape), "titulo,autor(nombre)");
    let data = json!([gato_negro()]);

    let result = project(&data, &shape, &descriptor, ProjectionMode::Flatten);
    assert_eq!(
        result,
        Some(json!([{ "titulo": "El gato negro", "autor.nombre": "Edgar Allan Poe" }]))
    );
}

// ============================================================================
// filter_top
// ============================================================================

#[test]
fn test_filter_top_compiles_and_projects() {
    let shape = ShapeNode::One(libro());
    let query = QueryObject::new().with_fields("precio,autor(-ci,-telefono)");

    let result = filter_top(&gato_negro(), Some(&shape), &query, ProjectionMode::Nested);
    assert_eq!(
        result,
        Some(json!({
            "precio": 11.99,
            "autor": { "id_autor": 1, "nombre": "Edgar Allan Poe" }
        }))
    );
}

#[test]
fn test_filter_top_without_shape_passes_data_through() {
    let query = QueryObject::new().with_fields("titulo");
    let result = filter_top(&gato_negro(), None, &query, ProjectionMode::Flatten);

    assert_eq!(result, Some(gato_negro()));
}

fn libro_ref(node: &ShapeNode) -> &Shape {
    node.shape().unwrap()
}
