//! The marker registry: one definition per marker name, built once per run.
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{Marker, MarkerSet};
use crate::errors::{ErrorSink, GenerationError};

/// `+name` or `name=argument`; the leading `+` is optional.
static MARKER_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?([A-Za-z][A-Za-z0-9_.:-]*)(?:=(.*))?$").expect("static regex"));

/// Where a marker may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Package,
    Type,
    Field,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Package => "package",
            Target::Type => "type",
            Target::Field => "field",
        })
    }
}

type BuildFn = fn(Option<&str>) -> Result<Marker, String>;

#[derive(Clone)]
pub struct MarkerDefinition {
    pub name: &'static str,
    pub targets: &'static [Target],
    pub help: &'static str,
    build: BuildFn,
}

impl fmt::Debug for MarkerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerDefinition")
            .field("name", &self.name)
            .field("targets", &self.targets)
            .finish()
    }
}

impl MarkerDefinition {
    pub fn new(name: &'static str, targets: &'static [Target], help: &'static str, build: BuildFn) -> Self {
        Self { name, targets, help, build }
    }
}

const ANY_SCHEMA: &[Target] = &[Target::Type, Target::Field];

#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    definitions: HashMap<&'static str, MarkerDefinition>,
}

impl MarkerRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the taxonomy markers and the validation vocabulary.
    pub fn with_defaults() -> Self {
        use Target::*;
        let mut r = Self::empty();
        r.register(MarkerDefinition::new(
            super::TAXONOMY_SCHEMA,
            &[Package],
            "enable generation of JSON schema definitions for the package's types",
            |a| no_arg(a).map(|_| Marker::TaxonomySchema),
        ));
        r.register(MarkerDefinition::new(
            super::OBJECT,
            &[Type],
            "enable generation of a standalone, taxonomy-pruned JSON schema document for the type",
            |a| Ok(Marker::Object(a.map(unquote).unwrap_or_default())),
        ));
        r.register(MarkerDefinition::new(
            super::OPTIONAL,
            &[Package, Field],
            "package: fields are optional by default; field: the field is optional",
            |a| no_arg(a).map(|_| Marker::Optional),
        ));
        r.register(MarkerDefinition::new(
            super::OPTIONAL_SHORT,
            &[Field],
            "the field is optional",
            |a| no_arg(a).map(|_| Marker::Optional),
        ));
        r.register(MarkerDefinition::new(
            super::REQUIRED,
            &[Package, Field],
            "field: the field is required",
            |a| no_arg(a).map(|_| Marker::Required),
        ));
        r.register(MarkerDefinition::new(
            super::SCHEMALESS,
            &[Field],
            "emit an empty schema for the field",
            |a| no_arg(a).map(|_| Marker::Schemaless),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:Type",
            ANY_SCHEMA,
            "override the schema type",
            |a| string_arg(a).map(Marker::Type),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:Format",
            ANY_SCHEMA,
            "set the schema format",
            |a| string_arg(a).map(Marker::Format),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:Enum",
            ANY_SCHEMA,
            "restrict values to a ;-separated list",
            |a| list_arg(a).map(Marker::Enum),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:Pattern",
            ANY_SCHEMA,
            "regular expression strings must match",
            |a| string_arg(a).map(Marker::Pattern),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:MinLength",
            ANY_SCHEMA,
            "minimum string length",
            |a| count_arg(a).map(Marker::MinLength),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:MaxLength",
            ANY_SCHEMA,
            "maximum string length",
            |a| count_arg(a).map(Marker::MaxLength),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:Minimum",
            ANY_SCHEMA,
            "minimum numeric value",
            |a| number_arg(a).map(Marker::Minimum),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:Maximum",
            ANY_SCHEMA,
            "maximum numeric value",
            |a| number_arg(a).map(Marker::Maximum),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:MultipleOf",
            ANY_SCHEMA,
            "numeric values must be a multiple of this",
            |a| number_arg(a).map(Marker::MultipleOf),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:MinItems",
            ANY_SCHEMA,
            "minimum array length",
            |a| count_arg(a).map(Marker::MinItems),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:MaxItems",
            ANY_SCHEMA,
            "maximum array length",
            |a| count_arg(a).map(Marker::MaxItems),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:UniqueItems",
            ANY_SCHEMA,
            "array items must be unique",
            |a| bool_arg(a).map(Marker::UniqueItems),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:MinProperties",
            ANY_SCHEMA,
            "minimum number of object properties",
            |a| count_arg(a).map(Marker::MinProperties),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:MaxProperties",
            ANY_SCHEMA,
            "maximum number of object properties",
            |a| count_arg(a).map(Marker::MaxProperties),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:Nullable",
            ANY_SCHEMA,
            "the value may be null",
            |a| no_arg(a).map(|_| Marker::Nullable),
        ));
        r.register(MarkerDefinition::new(
            "nullable",
            ANY_SCHEMA,
            "the value may be null",
            |a| no_arg(a).map(|_| Marker::Nullable),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:validation:XPreserveUnknownFields",
            ANY_SCHEMA,
            "allow fields not listed in the schema",
            |a| no_arg(a).map(|_| Marker::PreserveUnknownFields),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:default",
            ANY_SCHEMA,
            "default value (JSON)",
            |a| json_arg(a).map(Marker::Default),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:example",
            ANY_SCHEMA,
            "example value (JSON)",
            |a| json_arg(a).map(Marker::Example),
        ));
        r.register(MarkerDefinition::new(
            "kubebuilder:title",
            ANY_SCHEMA,
            "schema title",
            |a| string_arg(a).map(Marker::Title),
        ));
        r
    }

    /// Add or replace a definition.
    pub fn register(&mut self, definition: MarkerDefinition) {
        self.definitions.insert(definition.name, definition);
    }

    /// Every definition, sorted by name.
    pub fn definitions(&self) -> Vec<&MarkerDefinition> {
        let mut out: Vec<&MarkerDefinition> = self.definitions.values().collect();
        out.sort_by_key(|d| d.name);
        out
    }

    /// Parse one raw marker placed on `target`. Unknown names come back as [`Marker::Other`].
    pub fn parse(&self, raw: &str, target: Target) -> Result<Marker, String> {
        let raw = raw.trim();
        let caps = MARKER_SYNTAX
            .captures(raw)
            .ok_or_else(|| "not of the form name[=argument]".to_string())?;
        let name = &caps[1];
        let arg = caps.get(2).map(|m| m.as_str());
        let Some(definition) = self.definitions.get(name) else {
            return Ok(Marker::Other(raw.to_string()));
        };
        if !definition.targets.contains(&target) {
            return Err(format!("marker cannot be placed on a {target}"));
        }
        (definition.build)(arg)
    }

    /// Parse every raw marker, recording failures in `sink` and dropping them.
    pub fn parse_set(
        &self,
        raws: &[String],
        target: Target,
        package: &str,
        location: &str,
        sink: &mut ErrorSink,
    ) -> MarkerSet {
        let mut set = MarkerSet::default();
        for raw in raws {
            match self.parse(raw, target) {
                Ok(marker) => set.push(marker),
                Err(reason) => sink.push(
                    package,
                    location,
                    GenerationError::InvalidMarker { raw: raw.clone(), reason },
                ),
            }
        }
        set
    }
}

// ---- argument parsers ----

fn unquote(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}

fn no_arg(arg: Option<&str>) -> Result<(), String> {
    match arg {
        None => Ok(()),
        Some(a) if a.trim().is_empty() => Ok(()),
        Some(a) => Err(format!("takes no argument, got {a:?}")),
    }
}

fn string_arg(arg: Option<&str>) -> Result<String, String> {
    match arg.map(unquote) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err("requires a string argument".to_string()),
    }
}

fn count_arg(arg: Option<&str>) -> Result<u64, String> {
    let a = arg.ok_or("requires a non-negative integer argument")?;
    a.trim()
        .parse::<u64>()
        .map_err(|_| format!("expected a non-negative integer, got {a:?}"))
}

fn number_arg(arg: Option<&str>) -> Result<f64, String> {
    let a = arg.ok_or("requires a numeric argument")?;
    match a.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(format!("expected a number, got {a:?}")),
    }
}

fn bool_arg(arg: Option<&str>) -> Result<bool, String> {
    match arg.map(str::trim) {
        None | Some("") | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(format!("expected true or false, got {other:?}")),
    }
}

/// JSON when it parses as JSON, otherwise the (unquoted) text as a string.
fn json_or_string(s: &str) -> Value {
    serde_json::from_str(s.trim()).unwrap_or_else(|_| Value::String(unquote(s)))
}

fn json_arg(arg: Option<&str>) -> Result<Value, String> {
    match arg {
        Some(a) if !a.trim().is_empty() => Ok(json_or_string(a)),
        _ => Err("requires a value".to_string()),
    }
}

fn list_arg(arg: Option<&str>) -> Result<Vec<Value>, String> {
    let a = arg.ok_or("requires a ;-separated list")?;
    let values: Vec<Value> = a
        .split(';')
        .filter(|item| !item.trim().is_empty())
        .map(json_or_string)
        .collect();
    if values.is_empty() {
        return Err("requires at least one value".to_string());
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_names_and_arguments() {
        let r = MarkerRegistry::with_defaults();
        assert_eq!(r.parse("+fybrik:validation:schema", Target::Package), Ok(Marker::TaxonomySchema));
        assert_eq!(
            r.parse(r#"fybrik:validation:object="sample_crd""#, Target::Type),
            Ok(Marker::Object("sample_crd".into()))
        );
        assert_eq!(
            r.parse("kubebuilder:validation:Maximum=10", Target::Field),
            Ok(Marker::Maximum(10.0))
        );
        assert_eq!(
            r.parse("kubebuilder:validation:UniqueItems", Target::Field),
            Ok(Marker::UniqueItems(true))
        );
    }

    #[test]
    fn enum_items_are_json_or_strings() {
        let r = MarkerRegistry::with_defaults();
        assert_eq!(
            r.parse("kubebuilder:validation:Enum=a;2;true;\"c d\"", Target::Field),
            Ok(Marker::Enum(vec![json!("a"), json!(2), json!(true), json!("c d")]))
        );
    }

    #[test]
    fn definitions_are_listed_by_name() {
        let r = MarkerRegistry::with_defaults();
        let names: Vec<&str> = r.definitions().iter().map(|d| d.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"fybrik:validation:object"));
        assert!(r.definitions().iter().all(|d| !d.help.is_empty()));
    }

    #[test]
    fn unknown_names_are_kept_opaque() {
        let r = MarkerRegistry::with_defaults();
        assert_eq!(
            r.parse("kubebuilder:printcolumn:name=Age", Target::Type),
            Ok(Marker::Other("kubebuilder:printcolumn:name=Age".into()))
        );
    }

    #[test]
    fn wrong_target_and_bad_arguments_fail() {
        let r = MarkerRegistry::with_defaults();
        assert!(r.parse("fybrik:validation:schema", Target::Field).is_err());
        assert!(r.parse("kubebuilder:validation:MinLength=-1", Target::Field).is_err());
        assert!(r.parse("kubebuilder:validation:Type", Target::Field).is_err());
        assert!(r.parse("optional=yes", Target::Field).is_err());
        assert!(r.parse("=nothing", Target::Field).is_err());
    }

    #[test]
    fn parse_set_records_errors_per_location() {
        let r = MarkerRegistry::with_defaults();
        let mut sink = ErrorSink::new();
        let raws = vec!["optional".to_string(), "kubebuilder:validation:Minimum=x".to_string()];
        let set = r.parse_set(&raws, Target::Field, "pkg", "T.f", &mut sink);
        assert!(set.is_optional());
        assert_eq!(sink.len(), 1);
        let err = sink.iter().next().unwrap();
        assert_eq!(err.location, "T.f");
        assert!(matches!(err.error, GenerationError::InvalidMarker { .. }));
    }
}
