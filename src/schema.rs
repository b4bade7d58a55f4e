//! The schema node: this crate's representation of one JSON Schema fragment.
use std::collections::BTreeMap;

use serde::ser::{Serialize, Serializer};
use serde_json::Value;

/// One JSON Schema fragment. Unset members are omitted when serialized.
///
/// `properties` is a sorted map so output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,
    #[serde(
        rename = "x-kubernetes-preserve-unknown-fields",
        skip_serializing_if = "Option::is_none"
    )]
    pub preserve_unknown_fields: Option<bool>,
}

impl SchemaNode {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn typed(type_: &str) -> Self {
        Self {
            type_: Some(type_.to_string()),
            ..Self::default()
        }
    }

    pub fn typed_with_format(type_: &str, format: Option<&str>) -> Self {
        Self {
            type_: Some(type_.to_string()),
            format: format.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn ref_to(link: String) -> Self {
        Self {
            reference: Some(link),
            ..Self::default()
        }
    }

    /// An `object` node with an (initially empty) property map.
    pub fn object() -> Self {
        Self::typed("object")
    }

    /// True when any member other than `$ref`/`description`/`title` would
    /// conflict with a reference.
    pub fn has_structure(&self) -> bool {
        self.type_.is_some() || !self.properties.is_empty() || self.items.is_some()
    }

    /// Add `name` to `required` unless it is already listed.
    pub fn require(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Remove a property together with its `required` entry.
    pub fn remove_property(&mut self, name: &str) {
        self.properties.remove(name);
        self.required.retain(|r| r != name);
    }

    pub fn type_is(&self, type_: &str) -> bool {
        self.type_.as_deref() == Some(type_)
    }
}

/// `additionalProperties`: either a plain allow/deny flag or a value schema.
///
/// When `schema` is present it is what gets serialized, and `allows` is kept
/// true alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalProperties {
    pub allows: bool,
    pub schema: Option<Box<SchemaNode>>,
}

impl AdditionalProperties {
    pub fn allowed() -> Self {
        Self { allows: true, schema: None }
    }

    pub fn with_schema(schema: SchemaNode) -> Self {
        Self {
            allows: true,
            schema: Some(Box::new(schema)),
        }
    }
}

impl Serialize for AdditionalProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.schema {
            Some(schema) => schema.serialize(serializer),
            None => serializer.serialize_bool(self.allows),
        }
    }
}
