use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::SchemaNode;

/// One output file: an optional root schema, a title and named definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    #[serde(flatten)]
    pub root: SchemaNode,
    pub title: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, SchemaNode>,
}

impl Document {
    /// A document holding only definitions.
    pub fn named(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// A document whose root is `schema`. The schema's own title gives way
    /// to the document title.
    pub fn rooted(title: impl Into<String>, mut schema: SchemaNode) -> Self {
        schema.title = None;
        Self {
            root: schema,
            title: title.into(),
            definitions: BTreeMap::new(),
        }
    }
}

/// Document name → document, in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
    documents: IndexMap<String, Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// The document called `name`, created with `make` if absent.
    pub fn entry_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> Document) -> &mut Document {
        self.documents.entry(name.to_string()).or_insert_with(make)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.documents.iter().map(|(name, doc)| (name.as_str(), doc))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
