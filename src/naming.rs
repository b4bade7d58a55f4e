//! Document, definition and `$ref` naming.
use std::collections::BTreeSet;

use crate::graph::{TypeGraph, TypeIdent};

/// The shared document holding every non-taxonomy type.
pub const EXTERNAL_DOCUMENT: &str = "external.json";

const DEFINITIONS: &str = "#/definitions/";

/// `<path with / as ~1>~0<name>`, or the bare name for an empty path.
pub fn qualified_name(package: &str, name: &str) -> String {
    if package.is_empty() {
        return name.to_string();
    }
    format!("{}~0{}", package.replace('/', "~1"), name)
}

/// Naming decisions for one run. Built once from the whole graph so that
/// every answer is independent of the order types are synthesized in.
#[derive(Debug, Clone)]
pub struct DocumentNaming<'g> {
    graph: &'g TypeGraph,
    /// Packages declaring at least one object root.
    object_pkgs: BTreeSet<String>,
}

impl<'g> DocumentNaming<'g> {
    pub fn scan(graph: &'g TypeGraph) -> Self {
        let object_pkgs = graph
            .packages()
            .filter(|pkg| pkg.types.values().any(|decl| decl.markers.object_title().is_some()))
            .map(|pkg| pkg.path.clone())
            .collect();
        Self { graph, object_pkgs }
    }

    pub fn is_object_package(&self, path: &str) -> bool {
        self.object_pkgs.contains(path)
    }

    pub fn is_taxonomy_package(&self, path: &str) -> bool {
        self.graph.package(path).is_some_and(|pkg| pkg.is_taxonomy())
    }

    /// `<package-name>.json` for taxonomy packages, the shared document otherwise.
    pub fn document_name_for(&self, path: &str) -> String {
        match self.graph.package(path) {
            Some(pkg) if pkg.is_taxonomy() => format!("{}.json", pkg.name),
            _ => EXTERNAL_DOCUMENT.to_string(),
        }
    }

    /// Key of `ident` inside `document`: qualified in the shared document, bare elsewhere.
    pub fn definition_name_for(&self, document: &str, ident: &TypeIdent) -> String {
        if document == EXTERNAL_DOCUMENT {
            qualified_name(&ident.package, &ident.name)
        } else {
            ident.name.clone()
        }
    }

    /// Whether `document` is produced from packages rather than from an object root.
    pub fn is_package_document(&self, document: &str) -> bool {
        document == EXTERNAL_DOCUMENT
            || self
                .graph
                .packages()
                .any(|pkg| pkg.is_taxonomy() && format!("{}.json", pkg.name) == document)
    }

    /// Definition key of a retained type inside an object document. Matches
    /// the suffix [`Self::type_ref_link`] writes, so the references of pruned
    /// copies resolve inside the object document.
    pub fn object_definition_name(&self, ident: &TypeIdent) -> String {
        self.ref_suffix(ident)
    }

    /// `$ref` string for a reference written in package `from` to `to`.
    ///
    /// Targets in a package that declares an object root are always linked by
    /// bare name, even from another document.
    pub fn type_ref_link(&self, from: &str, to: &TypeIdent) -> String {
        let from_document = self.document_name_for(from);
        let to_document = self.document_name_for(&to.package);
        let suffix = self.ref_suffix(to);
        if from_document == to_document {
            format!("{DEFINITIONS}{suffix}")
        } else {
            format!("{to_document}{DEFINITIONS}{suffix}")
        }
    }

    fn ref_suffix(&self, to: &TypeIdent) -> String {
        if self.is_object_package(&to.package) {
            to.name.clone()
        } else {
            self.definition_name_for(&self.document_name_for(&to.package), to)
        }
    }
}
