//! Type → schema synthesis.
//!
//! A typed recursive descent over type expressions. Start reading at
//! [`info_to_schema`], which handles one declaration; [`type_to_schema`]
//! dispatches on the shape of an expression. References to other declared
//! types never recurse directly: they ask the [`SchemaRequester`] for the
//! target's schema (memoized and cycle-safe on the requester's side) and
//! emit a `$ref`.
use crate::context::SchemaContext;
use crate::errors::{ErrorSink, GenerationError};
use crate::graph::{ArrayExpr, MapExpr, Primitive, Resolved, SelectorExpr, StructExpr, TypeExpr, TypeIdent};
use crate::markers::apply_markers;
use crate::schema::{AdditionalProperties, SchemaNode};
use crate::tag::FieldTag;

/// What synthesis needs from the driver that owns the schema ledger.
pub trait SchemaRequester {
    /// Make sure a schema for `typ` is (or is being) produced.
    fn need_schema_for(&mut self, typ: &TypeIdent);

    /// The `$ref` string for a reference written in package `from` to `to`.
    fn type_ref_link(&self, from: &str, to: &TypeIdent) -> String;

    fn errors(&mut self) -> &mut ErrorSink;
}

fn report(ctx: &SchemaContext<'_>, req: &mut dyn SchemaRequester, error: GenerationError) {
    req.errors().push(&ctx.pkg.path, ctx.location(), error);
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Schema for the declaration in `ctx.info`.
///
/// A type that marshals itself may be described purely by its markers: if
/// they set a `type`, that marker-only node is the schema. Otherwise the
/// declaration is traversed structurally like any other.
pub fn info_to_schema(ctx: &SchemaContext<'_>, req: &mut dyn SchemaRequester) -> SchemaNode {
    let Some(info) = ctx.info else {
        return SchemaNode::empty();
    };
    tracing::debug!(package = %ctx.pkg.path, ty = %info.name, "synthesizing schema");

    if info.marshals_json && info.markers.has_schema_markers() {
        let mut schema = SchemaNode::empty();
        let mut scratch = ErrorSink::new();
        apply_markers(&info.markers, &mut schema, &ctx.pkg.path, &info.name, &mut scratch);
        if schema.type_.as_deref().is_some_and(|t| !t.is_empty()) {
            req.errors().extend(scratch);
            return schema;
        }
    }
    type_to_schema(ctx, &info.spec, req)
}

/// Schema for an arbitrary type expression. The declaration's doc and
/// markers (if `ctx` carries one) are applied to the result.
pub fn type_to_schema(ctx: &SchemaContext<'_>, expr: &TypeExpr, req: &mut dyn SchemaRequester) -> SchemaNode {
    let mut props = match expr {
        TypeExpr::Ident(name) => local_named_to_schema(ctx, name, req),
        TypeExpr::Selector(sel) => named_to_schema(ctx, sel, req),
        TypeExpr::Array(arr) => array_to_schema(ctx, arr, req),
        TypeExpr::Map(map) => map_to_schema(ctx, map, req),
        // transparent: no nullability marker
        TypeExpr::Pointer(inner) => return type_to_schema(ctx, inner, req),
        TypeExpr::Struct(s) => struct_to_schema(ctx, expr, s, req),
        TypeExpr::Interface {} => {
            // never traversed for references
            report(ctx, req, GenerationError::UnsupportedShape(expr.kind()));
            return SchemaNode::empty();
        }
    };

    if let Some(info) = ctx.info {
        props.description = non_empty(&info.doc);
        apply_markers(&info.markers, &mut props, &ctx.pkg.path, &info.name, req.errors());
    }
    props
}

fn reference_to(ctx: &SchemaContext<'_>, resolved: Resolved<'_>, req: &mut dyn SchemaRequester) -> Option<SchemaNode> {
    let ident = resolved.ident()?;
    req.need_schema_for(&ident);
    Some(SchemaNode::ref_to(req.type_ref_link(&ctx.pkg.path, &ident)))
}

/// An unqualified name: a primitive is inlined, a declared type becomes a `$ref`.
fn local_named_to_schema(ctx: &SchemaContext<'_>, name: &str, req: &mut dyn SchemaRequester) -> SchemaNode {
    match ctx.graph.resolve_ident(ctx.pkg, name) {
        Resolved::Basic(basic) => match builtin_to_type(basic, ctx.allow_dangerous_types) {
            Ok((type_, format)) => SchemaNode::typed_with_format(type_, format),
            Err(error) => {
                report(ctx, req, error);
                SchemaNode::empty()
            }
        },
        resolved @ Resolved::Named(..) => reference_to(ctx, resolved, req).unwrap_or_default(),
        Resolved::Invalid => {
            report(ctx, req, GenerationError::UnresolvedReference(name.to_string()));
            SchemaNode::empty()
        }
    }
}

/// A package-qualified name; always a reference to another declaration.
fn named_to_schema(ctx: &SchemaContext<'_>, sel: &SelectorExpr, req: &mut dyn SchemaRequester) -> SchemaNode {
    let resolved = ctx.graph.resolve_selector(sel);
    match reference_to(ctx, resolved, req) {
        Some(node) => node,
        None => {
            report(
                ctx,
                req,
                GenerationError::UnresolvedReference(format!("{}.{}", sel.package, sel.name)),
            );
            SchemaNode::empty()
        }
    }
}

/// Sequences. A variable-length sequence of bytes is a base64 string.
/// Elements are synthesized in a fresh context: markers on the enclosing
/// field apply to the array node, not to its items.
fn array_to_schema(ctx: &SchemaContext<'_>, arr: &ArrayExpr, req: &mut dyn SchemaRequester) -> SchemaNode {
    if arr.len.is_none() {
        if let TypeExpr::Ident(name) = arr.elem.as_ref() {
            if let Resolved::Basic(basic) = ctx.graph.resolve_ident(ctx.pkg, name) {
                if basic.is_byte() {
                    return SchemaNode::typed_with_format("string", Some("byte"));
                }
            }
        }
    }
    let items = type_to_schema(&ctx.fresh(), &arr.elem, req);
    SchemaNode {
        items: Some(Box::new(items)),
        ..SchemaNode::typed("array")
    }
}

/// Maps. Keys must be strings, directly or through one named type.
fn map_to_schema(ctx: &SchemaContext<'_>, map: &MapExpr, req: &mut dyn SchemaRequester) -> SchemaNode {
    if !map_key_is_string(ctx, &map.key) {
        report(ctx, req, GenerationError::InvalidMapKey(map.key.to_string()));
        return SchemaNode::empty();
    }
    let value = type_to_schema(&ctx.fresh(), &map.value, req);
    SchemaNode {
        additional_properties: Some(AdditionalProperties::with_schema(value)),
        ..SchemaNode::object()
    }
}

fn map_key_is_string(ctx: &SchemaContext<'_>, key: &TypeExpr) -> bool {
    let resolved = match key {
        TypeExpr::Ident(name) => ctx.graph.resolve_ident(ctx.pkg, name),
        TypeExpr::Selector(sel) => ctx.graph.resolve_selector(sel),
        _ => return false,
    };
    match resolved {
        Resolved::Basic(basic) => basic.is_string(),
        Resolved::Named(pkg, decl) => match &decl.spec {
            TypeExpr::Ident(underlying) => matches!(
                ctx.graph.resolve_ident(pkg, underlying),
                Resolved::Basic(basic) if basic.is_string()
            ),
            _ => false,
        },
        Resolved::Invalid => false,
    }
}

/// A struct body. Only the body of the declaration under synthesis is
/// allowed; anywhere else it is reported and an empty object returned.
/// Inline fields go to `allOf` for a later flattening pass.
fn struct_to_schema(
    ctx: &SchemaContext<'_>,
    expr: &TypeExpr,
    body: &StructExpr,
    req: &mut dyn SchemaRequester,
) -> SchemaNode {
    let mut props = SchemaNode::object();
    let info = match ctx.info {
        Some(info) if ctx.is_declaration_body(expr) => info,
        _ => {
            report(ctx, req, GenerationError::MisplacedStructLiteral);
            return props;
        }
    };

    let optional_by_default = ctx.pkg.optional_by_default();

    for field in &body.fields {
        let location = format!("{}.{}", info.name, field.name);
        let Some(raw_tag) = field.tag.as_deref() else {
            req.errors().push(
                &ctx.pkg.path,
                location,
                GenerationError::UntaggedField {
                    type_name: info.name.clone(),
                    field: field.name.clone(),
                },
            );
            continue;
        };
        let (name, inline, omit_empty) = match FieldTag::parse(raw_tag, field.embedded) {
            FieldTag::Skip => continue,
            FieldTag::Present { name, inline, omit_empty } => (name, inline, omit_empty),
        };

        let required = if optional_by_default {
            field.markers.is_required()
        } else {
            !inline && !omit_empty && !field.markers.is_optional()
        };

        let mut prop = if field.markers.is_schemaless() {
            SchemaNode::empty()
        } else {
            type_to_schema(&ctx.fresh(), &field.ty, req)
        };
        prop.description = non_empty(&field.doc);
        apply_markers(&field.markers, &mut prop, &ctx.pkg.path, &location, req.errors());

        if inline {
            props.all_of.push(prop);
            continue;
        }
        props.properties.insert(name.clone(), prop);
        if required {
            props.require(&name);
        }
    }

    props
}

/// JSON Schema type and format for a primitive. Floats need the dangerous-types opt-in.
pub fn builtin_to_type(
    basic: Primitive,
    allow_dangerous_types: bool,
) -> Result<(&'static str, Option<&'static str>), GenerationError> {
    let type_ = match basic {
        Primitive::Bool => "boolean",
        Primitive::String => "string",
        _ if basic.is_float() => {
            if !allow_dangerous_types {
                return Err(GenerationError::DisallowedFloat);
            }
            "number"
        }
        _ => "integer",
    };
    let format = match basic {
        Primitive::Int32 | Primitive::Uint32 => Some("int32"),
        Primitive::Int64 | Primitive::Uint64 => Some("int64"),
        _ => None,
    };
    Ok((type_, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeGraph;
    use crate::graph::manifest::test_graph;
    use serde_json::{json, Value};

    /// Records requests instead of producing schemas; links are always local.
    #[derive(Default)]
    struct Recorder {
        requested: Vec<TypeIdent>,
        errors: ErrorSink,
    }

    impl SchemaRequester for Recorder {
        fn need_schema_for(&mut self, typ: &TypeIdent) {
            self.requested.push(typ.clone());
        }
        fn type_ref_link(&self, _from: &str, to: &TypeIdent) -> String {
            format!("#/definitions/{}", to.name)
        }
        fn errors(&mut self) -> &mut ErrorSink {
            &mut self.errors
        }
    }

    fn synth(graph: &TypeGraph, pkg: &str, ty: &str, dangerous: bool) -> (Value, Recorder) {
        let package = graph.package(pkg).unwrap();
        let info = package.types.get(ty).unwrap();
        let ctx = SchemaContext::new(graph, package, dangerous).for_info(info);
        let mut rec = Recorder::default();
        let schema = info_to_schema(&ctx, &mut rec);
        (serde_json::to_value(&schema).unwrap(), rec)
    }

    fn one_type(fields: Value) -> TypeGraph {
        test_graph(json!({
            "packages": [ { "path": "p", "name": "p", "types": [
                { "name": "T", "spec": { "struct": { "fields": fields } } },
                { "name": "Other", "spec": { "struct": { "fields": [] } } },
                { "name": "Key", "spec": { "ident": "string" } },
                { "name": "IntKey", "spec": { "ident": "int" } }
            ] } ]
        }))
    }

    fn field(name: &str, tag: &str, ty: Value) -> Value {
        json!({ "name": name, "tag": tag, "type": ty })
    }

    #[test]
    fn primitives_map_to_types_and_formats() {
        let g = one_type(json!([
            field("A", "a", json!({ "ident": "bool" })),
            field("B", "b", json!({ "ident": "int32" })),
            field("C", "c", json!({ "ident": "uint64" })),
            field("D", "d", json!({ "ident": "int16" })),
            field("E", "e", json!({ "ident": "rune" })),
        ]));
        let (schema, rec) = synth(&g, "p", "T", false);
        assert!(rec.errors.is_empty());
        assert_eq!(schema["properties"]["a"], json!({ "type": "boolean" }));
        assert_eq!(schema["properties"]["b"], json!({ "type": "integer", "format": "int32" }));
        assert_eq!(schema["properties"]["c"], json!({ "type": "integer", "format": "int64" }));
        assert_eq!(schema["properties"]["d"], json!({ "type": "integer" }));
        assert_eq!(schema["properties"]["e"], json!({ "type": "integer", "format": "int32" }));
    }

    #[test]
    fn floats_need_the_dangerous_types_opt_in() {
        let g = one_type(json!([field("F", "f", json!({ "ident": "float64" }))]));

        let (schema, rec) = synth(&g, "p", "T", false);
        assert_eq!(rec.errors.len(), 1);
        assert_eq!(rec.errors.iter().next().unwrap().error, GenerationError::DisallowedFloat);
        assert_eq!(schema["properties"]["f"], json!({}));

        let (schema, rec) = synth(&g, "p", "T", true);
        assert!(rec.errors.is_empty());
        assert_eq!(schema["properties"]["f"], json!({ "type": "number" }));
    }

    #[test]
    fn byte_slices_are_base64_strings_but_byte_arrays_are_not() {
        let g = one_type(json!([
            field("S", "s", json!({ "array": { "elem": { "ident": "byte" } } })),
            field("U", "u", json!({ "array": { "elem": { "ident": "uint8" } } })),
            field("A", "a", json!({ "array": { "len": 4, "elem": { "ident": "byte" } } })),
        ]));
        let (schema, _) = synth(&g, "p", "T", false);
        assert_eq!(schema["properties"]["s"], json!({ "type": "string", "format": "byte" }));
        assert_eq!(schema["properties"]["u"], json!({ "type": "string", "format": "byte" }));
        assert_eq!(
            schema["properties"]["a"],
            json!({ "type": "array", "items": { "type": "integer" } })
        );
    }

    #[test]
    fn named_references_are_requested_and_linked() {
        let g = one_type(json!([
            field("O", "o", json!({ "pointer": { "ident": "Other" } })),
            field("L", "l", json!({ "array": { "elem": { "ident": "Other" } } })),
        ]));
        let (schema, rec) = synth(&g, "p", "T", false);
        assert_eq!(schema["properties"]["o"], json!({ "$ref": "#/definitions/Other" }));
        assert_eq!(
            schema["properties"]["l"],
            json!({ "type": "array", "items": { "$ref": "#/definitions/Other" } })
        );
        assert_eq!(rec.requested, vec![TypeIdent::new("p", "Other"); 2]);
    }

    #[test]
    fn unresolved_names_record_an_error_and_yield_empty_nodes() {
        let g = one_type(json!([
            field("X", "x", json!({ "ident": "Missing" })),
            field("Y", "y", json!({ "selector": { "package": "nowhere", "name": "T" } })),
            field("Z", "z", json!({ "ident": "string" })),
        ]));
        let (schema, rec) = synth(&g, "p", "T", false);
        assert_eq!(rec.errors.len(), 2);
        assert_eq!(schema["properties"]["x"], json!({}));
        assert_eq!(schema["properties"]["y"], json!({}));
        assert_eq!(schema["properties"]["z"], json!({ "type": "string" }));
    }

    #[test]
    fn map_keys_must_be_strings() {
        let g = one_type(json!([
            field("M", "m", json!({ "map": { "key": { "ident": "string" }, "value": { "ident": "int64" } } })),
            field("N", "n", json!({ "map": { "key": { "ident": "Key" }, "value": { "ident": "Other" } } })),
            field("B", "b", json!({ "map": { "key": { "ident": "int" }, "value": { "ident": "string" } } })),
            field("C", "c", json!({ "map": { "key": { "ident": "IntKey" }, "value": { "ident": "string" } } })),
        ]));
        let (schema, rec) = synth(&g, "p", "T", false);
        assert_eq!(
            schema["properties"]["m"],
            json!({ "type": "object", "additionalProperties": { "type": "integer", "format": "int64" } })
        );
        assert_eq!(
            schema["properties"]["n"]["additionalProperties"],
            json!({ "$ref": "#/definitions/Other" })
        );
        assert_eq!(schema["properties"]["b"], json!({}));
        assert_eq!(schema["properties"]["c"], json!({}));
        let kinds: Vec<_> = rec.errors.iter().map(|e| e.error.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                GenerationError::InvalidMapKey("int".into()),
                GenerationError::InvalidMapKey("IntKey".into())
            ]
        );
    }

    #[test]
    fn nested_struct_literals_and_interfaces_are_rejected() {
        let g = one_type(json!([
            field("S", "s", json!({ "struct": { "fields": [] } })),
            field("I", "i", json!({ "interface": {} })),
        ]));
        let (schema, rec) = synth(&g, "p", "T", false);
        assert_eq!(schema["properties"]["s"], json!({ "type": "object" }));
        assert_eq!(schema["properties"]["i"], json!({}));
        let kinds: Vec<_> = rec.errors.iter().map(|e| e.error.clone()).collect();
        assert_eq!(
            kinds,
            vec![GenerationError::MisplacedStructLiteral, GenerationError::UnsupportedShape("interface")]
        );
    }

    #[test]
    fn untagged_fields_are_errors_and_dash_fields_are_skipped() {
        let g = one_type(json!([
            { "name": "NoTag", "type": { "ident": "string" } },
            field("Skip", "-", json!({ "ident": "string" })),
            field("Dash", "-,", json!({ "ident": "string" })),
        ]));
        let (schema, rec) = synth(&g, "p", "T", false);
        assert_eq!(rec.errors.len(), 1);
        let err = rec.errors.iter().next().unwrap();
        assert_eq!(err.location, "T.NoTag");
        assert!(matches!(err.error, GenerationError::UntaggedField { .. }));
        assert_eq!(schema["required"], json!(["-"]));
        assert_eq!(schema["properties"].as_object().unwrap().len(), 1);
        assert!(schema["properties"].get("-").is_some());
    }

    #[test]
    fn inline_fields_go_to_all_of() {
        let g = one_type(json!([
            { "name": "Other", "tag": ",inline", "embedded": true, "type": { "ident": "Other" } },
            field("A", "a", json!({ "ident": "string" })),
        ]));
        let (schema, _) = synth(&g, "p", "T", false);
        assert_eq!(schema["allOf"], json!([{ "$ref": "#/definitions/Other" }]));
        assert_eq!(schema["required"], json!(["a"]));
    }

    #[test]
    fn field_docs_and_markers_apply_to_the_field_only() {
        let g = one_type(json!([
            { "name": "L", "tag": "l", "doc": "the list",
              "markers": ["kubebuilder:validation:MaxItems=3"],
              "type": { "array": { "elem": { "ident": "string" } } } },
            { "name": "S", "tag": "s", "markers": ["kubebuilder:validation:Schemaless", "kubebuilder:validation:Type=object"],
              "type": { "ident": "Other" } },
        ]));
        let (schema, rec) = synth(&g, "p", "T", false);
        assert!(rec.errors.is_empty());
        assert_eq!(
            schema["properties"]["l"],
            json!({ "description": "the list", "type": "array", "maxItems": 3, "items": { "type": "string" } })
        );
        assert_eq!(schema["properties"]["s"], json!({ "type": "object" }));
        // schemaless fields never request their type
        assert!(rec.requested.is_empty());
    }

    #[test]
    fn custom_marshalers_with_a_type_marker_skip_traversal() {
        let g = test_graph(json!({
            "packages": [ { "path": "p", "name": "p", "types": [
                { "name": "Quantity", "doc": "an amount", "marshalsJson": true,
                  "markers": ["kubebuilder:validation:Pattern=^[0-9]+$", "kubebuilder:validation:Type=string"],
                  "spec": { "struct": { "fields": [ { "name": "raw", "type": { "ident": "string" } } ] } } },
                { "name": "Stamp", "marshalsJson": true,
                  "markers": ["kubebuilder:validation:Format=date-time"],
                  "spec": { "struct": { "fields": [ { "name": "S", "tag": "s", "type": { "ident": "int64" } } ] } } }
            ] } ]
        }));

        let (schema, rec) = synth(&g, "p", "Quantity", false);
        assert!(rec.errors.is_empty(), "untagged field must not be visited");
        assert_eq!(schema, json!({ "type": "string", "pattern": "^[0-9]+$" }));

        // no type from markers: falls back to structure, markers applied there
        let (schema, rec) = synth(&g, "p", "Stamp", false);
        assert!(rec.errors.is_empty());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["format"], "date-time");
        assert_eq!(schema["properties"]["s"]["format"], "int64");
    }

    #[test]
    fn declaration_docs_and_markers_apply_to_non_struct_types() {
        let g = test_graph(json!({
            "packages": [ { "path": "p", "name": "p", "types": [
                { "name": "Phase", "doc": "lifecycle phase",
                  "markers": ["kubebuilder:validation:Enum=Pending;Running"],
                  "spec": { "ident": "string" } },
                { "name": "Ptr", "markers": ["kubebuilder:validation:MinLength=1"],
                  "spec": { "pointer": { "ident": "string" } } }
            ] } ]
        }));
        let (schema, _) = synth(&g, "p", "Phase", false);
        assert_eq!(
            schema,
            json!({ "description": "lifecycle phase", "type": "string", "enum": ["Pending", "Running"] })
        );
        let (schema, rec) = synth(&g, "p", "Ptr", false);
        assert!(rec.errors.is_empty());
        assert_eq!(schema, json!({ "type": "string", "minLength": 1 }));
    }
}
