//! Markers: declarative annotations attached to packages, types and fields.
//!
//! A marker is written `name` or `name=argument`. The [`MarkerRegistry`]
//! knows which names exist, where they may be placed and how to parse their
//! argument. Some markers rewrite the schema of whatever they are attached to
//! (see [`SchemaMarker`]); others only steer generation (required/optional,
//! taxonomy membership) and are ignored by the applicator.
pub mod apply;
pub mod registry;

use serde_json::Value;

use crate::schema::{AdditionalProperties, SchemaNode};

pub use apply::apply_markers;
pub use registry::{MarkerDefinition, MarkerRegistry, Target};

pub const TAXONOMY_SCHEMA: &str = "fybrik:validation:schema";
pub const OBJECT: &str = "fybrik:validation:object";
pub const OPTIONAL: &str = "kubebuilder:validation:Optional";
pub const OPTIONAL_SHORT: &str = "optional";
pub const REQUIRED: &str = "kubebuilder:validation:Required";
pub const SCHEMALESS: &str = "kubebuilder:validation:Schemaless";

/// A parsed marker value.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// Package belongs to the taxonomy partition.
    TaxonomySchema,
    /// Object root; the argument is the title of its pruned document.
    Object(String),
    Optional,
    Required,
    Schemaless,
    Type(String),
    Format(String),
    Enum(Vec<Value>),
    Pattern(String),
    MinLength(u64),
    MaxLength(u64),
    Minimum(f64),
    Maximum(f64),
    MultipleOf(f64),
    MinItems(u64),
    MaxItems(u64),
    UniqueItems(bool),
    MinProperties(u64),
    MaxProperties(u64),
    Nullable,
    PreserveUnknownFields,
    Default(Value),
    Example(Value),
    Title(String),
    /// A marker this registry does not know; kept verbatim, never applied.
    Other(String),
}

/// The "rewrite this schema node" capability.
pub trait SchemaMarker {
    fn apply_to_schema(&self, schema: &mut SchemaNode) -> Result<(), String>;

    /// Applied before every marker without this flag.
    fn applies_first(&self) -> bool {
        false
    }
}

impl Marker {
    pub fn name(&self) -> &str {
        match self {
            Marker::TaxonomySchema => TAXONOMY_SCHEMA,
            Marker::Object(_) => OBJECT,
            Marker::Optional => OPTIONAL,
            Marker::Required => REQUIRED,
            Marker::Schemaless => SCHEMALESS,
            Marker::Type(_) => "kubebuilder:validation:Type",
            Marker::Format(_) => "kubebuilder:validation:Format",
            Marker::Enum(_) => "kubebuilder:validation:Enum",
            Marker::Pattern(_) => "kubebuilder:validation:Pattern",
            Marker::MinLength(_) => "kubebuilder:validation:MinLength",
            Marker::MaxLength(_) => "kubebuilder:validation:MaxLength",
            Marker::Minimum(_) => "kubebuilder:validation:Minimum",
            Marker::Maximum(_) => "kubebuilder:validation:Maximum",
            Marker::MultipleOf(_) => "kubebuilder:validation:MultipleOf",
            Marker::MinItems(_) => "kubebuilder:validation:MinItems",
            Marker::MaxItems(_) => "kubebuilder:validation:MaxItems",
            Marker::UniqueItems(_) => "kubebuilder:validation:UniqueItems",
            Marker::MinProperties(_) => "kubebuilder:validation:MinProperties",
            Marker::MaxProperties(_) => "kubebuilder:validation:MaxProperties",
            Marker::Nullable => "kubebuilder:validation:Nullable",
            Marker::PreserveUnknownFields => "kubebuilder:validation:XPreserveUnknownFields",
            Marker::Default(_) => "kubebuilder:default",
            Marker::Example(_) => "kubebuilder:example",
            Marker::Title(_) => "kubebuilder:title",
            Marker::Other(raw) => raw,
        }
    }

    /// Capability query: `Some` for markers that rewrite schema nodes.
    pub fn as_schema_marker(&self) -> Option<&dyn SchemaMarker> {
        match self {
            Marker::TaxonomySchema
            | Marker::Optional
            | Marker::Required
            | Marker::Schemaless
            | Marker::Other(_) => None,
            _ => Some(self),
        }
    }
}

fn expect_type(schema: &SchemaNode, wanted: &[&str], what: &str) -> Result<(), String> {
    if wanted.iter().any(|t| schema.type_is(t)) {
        Ok(())
    } else {
        Err(format!("must apply {what} to {}", wanted.join(" or ")))
    }
}

impl SchemaMarker for Marker {
    fn apply_to_schema(&self, schema: &mut SchemaNode) -> Result<(), String> {
        match self {
            Marker::Object(title) | Marker::Title(title) => schema.title = Some(title.clone()),
            Marker::Type(t) => schema.type_ = Some(t.clone()),
            Marker::Format(f) => schema.format = Some(f.clone()),
            Marker::Enum(values) => schema.enum_ = values.clone(),
            Marker::Pattern(p) => {
                expect_type(schema, &["string"], "pattern")?;
                regex::Regex::new(p).map_err(|e| format!("invalid pattern: {e}"))?;
                schema.pattern = Some(p.clone());
            }
            Marker::MinLength(n) => {
                expect_type(schema, &["string"], "minimum length")?;
                schema.min_length = Some(*n);
            }
            Marker::MaxLength(n) => {
                expect_type(schema, &["string"], "maximum length")?;
                schema.max_length = Some(*n);
            }
            Marker::Minimum(n) => {
                expect_type(schema, &["integer", "number"], "minimum")?;
                schema.minimum = Some(*n);
            }
            Marker::Maximum(n) => {
                expect_type(schema, &["integer", "number"], "maximum")?;
                schema.maximum = Some(*n);
            }
            Marker::MultipleOf(n) => {
                expect_type(schema, &["integer", "number"], "multipleOf")?;
                schema.multiple_of = Some(*n);
            }
            Marker::MinItems(n) => {
                expect_type(schema, &["array"], "minimum items")?;
                schema.min_items = Some(*n);
            }
            Marker::MaxItems(n) => {
                expect_type(schema, &["array"], "maximum items")?;
                schema.max_items = Some(*n);
            }
            Marker::UniqueItems(b) => {
                expect_type(schema, &["array"], "unique items")?;
                schema.unique_items = *b;
            }
            Marker::MinProperties(n) => {
                expect_type(schema, &["object"], "minimum properties")?;
                schema.min_properties = Some(*n);
            }
            Marker::MaxProperties(n) => {
                expect_type(schema, &["object"], "maximum properties")?;
                schema.max_properties = Some(*n);
            }
            Marker::Nullable => schema.nullable = true,
            Marker::PreserveUnknownFields => schema.preserve_unknown_fields = Some(true),
            Marker::Default(v) => schema.default = Some(v.clone()),
            Marker::Example(v) => schema.example = Some(v.clone()),
            Marker::TaxonomySchema
            | Marker::Optional
            | Marker::Required
            | Marker::Schemaless
            | Marker::Other(_) => {}
        }
        Ok(())
    }

    fn applies_first(&self) -> bool {
        matches!(self, Marker::Type(_))
    }
}

/// The ordered markers attached to one package, type or field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    values: Vec<Marker>,
}

impl MarkerSet {
    pub fn new(values: Vec<Marker>) -> Self {
        Self { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, marker: Marker) {
        self.values.push(marker);
    }

    /// Replace every marker for which `f` returns a substitute.
    pub fn replace_each(&mut self, mut f: impl FnMut(&Marker) -> Option<Marker>) {
        for marker in &mut self.values {
            if let Some(replacement) = f(marker) {
                *marker = replacement;
            }
        }
    }

    pub fn is_taxonomy(&self) -> bool {
        self.values.iter().any(|m| matches!(m, Marker::TaxonomySchema))
    }

    pub fn is_optional(&self) -> bool {
        self.values.iter().any(|m| matches!(m, Marker::Optional))
    }

    pub fn is_required(&self) -> bool {
        self.values.iter().any(|m| matches!(m, Marker::Required))
    }

    pub fn is_schemaless(&self) -> bool {
        self.values.iter().any(|m| matches!(m, Marker::Schemaless))
    }

    pub fn object_title(&self) -> Option<&str> {
        self.values.iter().find_map(|m| match m {
            Marker::Object(title) => Some(title.as_str()),
            _ => None,
        })
    }

    pub fn has_schema_markers(&self) -> bool {
        self.values.iter().any(|m| m.as_schema_marker().is_some())
    }
}

impl FromIterator<Marker> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Swap a set preserve-unknown-fields flag for `additionalProperties: true`.
pub(crate) fn normalize_preserve_unknown_fields(schema: &mut SchemaNode) {
    if schema.preserve_unknown_fields == Some(true) {
        match &mut schema.additional_properties {
            Some(additional) => additional.allows = true,
            None => schema.additional_properties = Some(AdditionalProperties::allowed()),
        }
        schema.preserve_unknown_fields = None;
    }
}
