//! Applying a marker set to a synthesized node.
use super::{normalize_preserve_unknown_fields, MarkerSet, SchemaMarker};
use crate::errors::{ErrorSink, GenerationError};
use crate::schema::SchemaNode;

/// Apply every schema-rewriting marker in `markers` to `schema`.
///
/// Apply-first markers go before all others; within each group the original
/// order is kept. Failures are recorded against `package`/`location` and do
/// not stop the remaining markers.
pub fn apply_markers(
    markers: &MarkerSet,
    schema: &mut SchemaNode,
    package: &str,
    location: &str,
    sink: &mut ErrorSink,
) {
    let rewriters: Vec<(&str, &dyn SchemaMarker)> = markers
        .iter()
        .filter_map(|m| m.as_schema_marker().map(|sm| (m.name(), sm)))
        .collect();

    let (first, rest): (Vec<_>, Vec<_>) = rewriters.into_iter().partition(|(_, sm)| sm.applies_first());
    for (name, marker) in first.into_iter().chain(rest) {
        if let Err(reason) = marker.apply_to_schema(schema) {
            sink.push(
                package,
                location,
                GenerationError::AnnotationRewrite { marker: name.to_string(), reason },
            );
        }
    }

    if schema.reference.is_some() && schema.has_structure() {
        sink.push(
            package,
            location,
            GenerationError::AnnotationRewrite {
                marker: "(reference)".to_string(),
                reason: "markers cannot give a $ref node structural content".to_string(),
            },
        );
        schema.type_ = None;
        schema.properties.clear();
        schema.items = None;
    }

    normalize_preserve_unknown_fields(schema);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::Marker;

    #[test]
    fn apply_first_markers_run_before_the_rest() {
        // MinLength needs a string node; Type comes later in the set but applies first.
        let set: MarkerSet =
            [Marker::MinLength(2), Marker::Type("string".into())].into_iter().collect();
        let mut node = SchemaNode::empty();
        let mut sink = ErrorSink::new();
        apply_markers(&set, &mut node, "p", "T", &mut sink);
        assert!(sink.is_empty());
        assert_eq!(node.type_.as_deref(), Some("string"));
        assert_eq!(node.min_length, Some(2));
    }

    #[test]
    fn later_markers_win_and_failures_do_not_stop_siblings() {
        let set: MarkerSet = [
            Marker::Format("date".into()),
            Marker::Maximum(3.0),
            Marker::Format("date-time".into()),
            Marker::Optional,
        ]
        .into_iter()
        .collect();
        let mut node = SchemaNode::typed("string");
        let mut sink = ErrorSink::new();
        apply_markers(&set, &mut node, "p", "T.f", &mut sink);
        assert_eq!(node.format.as_deref(), Some("date-time"));
        assert_eq!(sink.len(), 1);
        assert!(matches!(
            &sink.iter().next().unwrap().error,
            GenerationError::AnnotationRewrite { marker, .. } if marker == "kubebuilder:validation:Maximum"
        ));
    }

    #[test]
    fn structural_content_is_stripped_from_references() {
        let set: MarkerSet = [Marker::Type("string".into())].into_iter().collect();
        let mut node = SchemaNode::ref_to("#/definitions/X".into());
        let mut sink = ErrorSink::new();
        apply_markers(&set, &mut node, "p", "T.f", &mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(node, SchemaNode::ref_to("#/definitions/X".into()));
    }

    #[test]
    fn preserve_unknown_fields_is_normalized_after_markers() {
        let set: MarkerSet = [Marker::PreserveUnknownFields].into_iter().collect();
        let mut node = SchemaNode::object();
        apply_markers(&set, &mut node, "p", "T", &mut ErrorSink::new());
        assert_eq!(node.preserve_unknown_fields, None);
        assert!(node.additional_properties.as_ref().is_some_and(|a| a.allows));
    }
}
