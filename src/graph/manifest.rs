//! JSON manifests describing a type graph, and their assembly into a [`TypeGraph`].
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use super::{DeclaredType, Package, TypeExpr, TypeGraph};
use crate::errors::{ErrorSink, LoadError};
use crate::markers::{Marker, MarkerRegistry, Target};
use crate::path_de;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub packages: Vec<PackageManifest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub dot_imports: Vec<String>,
    #[serde(default)]
    pub types: Vec<DeclaredType>,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        path_de::from_str_with_path(&source).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, LoadError> {
        path_de::from_value_with_path(value).map_err(|e| LoadError::Parse {
            path: "<inline>".into(),
            reason: e.to_string(),
        })
    }

    /// Concatenate the package lists of several manifests.
    pub fn merge(manifests: impl IntoIterator<Item = Manifest>) -> Self {
        Self {
            packages: manifests.into_iter().flat_map(|m| m.packages).collect(),
        }
    }
}

impl TypeGraph {
    /// Index the manifest's packages and parse every marker through `registry`.
    ///
    /// Marker problems are recorded in `sink` against their package; duplicate
    /// package paths or type names make the graph unusable and are returned.
    pub fn build(
        manifest: Manifest,
        registry: &MarkerRegistry,
        sink: &mut ErrorSink,
    ) -> Result<Self, LoadError> {
        let mut packages: IndexMap<String, Package> = IndexMap::new();
        for pkg in manifest.packages {
            if packages.contains_key(&pkg.path) {
                return Err(LoadError::DuplicatePackage(pkg.path));
            }
            let markers = registry.parse_set(&pkg.markers, Target::Package, &pkg.path, "", sink);
            let mut types = IndexMap::new();
            for mut decl in pkg.types {
                if types.contains_key(&decl.name) {
                    return Err(LoadError::DuplicateType {
                        package: pkg.path,
                        type_name: decl.name,
                    });
                }
                decl.markers =
                    registry.parse_set(&decl.raw_markers, Target::Type, &pkg.path, &decl.name, sink);
                decl.markers.replace_each(|marker| match marker {
                    Marker::Object(title) if title.is_empty() => Some(Marker::Object(decl.name.clone())),
                    _ => None,
                });
                parse_field_markers(&mut decl.spec, &decl.name, &pkg.path, registry, sink);
                types.insert(decl.name.clone(), decl);
            }
            tracing::debug!(package = %pkg.path, types = types.len(), "loaded package");
            packages.insert(
                pkg.path.clone(),
                Package {
                    path: pkg.path,
                    name: pkg.name,
                    markers,
                    dot_imports: pkg.dot_imports,
                    types,
                },
            );
        }
        Ok(Self { packages })
    }
}

fn parse_field_markers(
    expr: &mut TypeExpr,
    type_name: &str,
    package: &str,
    registry: &MarkerRegistry,
    sink: &mut ErrorSink,
) {
    match expr {
        TypeExpr::Struct(s) => {
            for field in &mut s.fields {
                let location = format!("{type_name}.{}", field.name);
                field.markers =
                    registry.parse_set(&field.raw_markers, Target::Field, package, &location, sink);
                parse_field_markers(&mut field.ty, type_name, package, registry, sink);
            }
        }
        TypeExpr::Array(arr) => parse_field_markers(&mut arr.elem, type_name, package, registry, sink),
        TypeExpr::Map(map) => parse_field_markers(&mut map.value, type_name, package, registry, sink),
        TypeExpr::Pointer(inner) => parse_field_markers(inner, type_name, package, registry, sink),
        TypeExpr::Ident(_) | TypeExpr::Selector(_) | TypeExpr::Interface {} => {}
    }
}

/// Build a graph from an inline manifest, panicking on any load or marker error.
#[cfg(test)]
pub(crate) fn test_graph(value: serde_json::Value) -> TypeGraph {
    let mut sink = ErrorSink::new();
    let graph = TypeGraph::build(
        Manifest::from_value(value).expect("manifest"),
        &MarkerRegistry::with_defaults(),
        &mut sink,
    )
    .expect("graph");
    assert!(sink.is_empty(), "marker errors: {:?}", sink.iter().collect::<Vec<_>>());
    graph
}
