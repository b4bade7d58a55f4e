//! The type graph handed to the core by source introspection.
//!
//! Packages own declared types; each declared type has a type expression
//! (its "spec"), documentation, and parsed markers. The graph answers the
//! questions the synthesizer asks: what does a name resolve to, what markers
//! does a package carry, does a type marshal itself.
pub mod manifest;

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::markers::MarkerSet;

// ————————————————————————————————————————————————————————————————————————————
// IDENTITY
// ————————————————————————————————————————————————————————————————————————————

/// Identity of a declared type: owning package path plus type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdent {
    pub package: String,
    pub name: String,
}

impl TypeIdent {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PRIMITIVES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
}

impl Primitive {
    /// Built-in names. `byte` and `rune` are aliases of `uint8` and `int32`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Primitive::Bool,
            "string" => Primitive::String,
            "int" => Primitive::Int,
            "int8" => Primitive::Int8,
            "int16" => Primitive::Int16,
            "int32" | "rune" => Primitive::Int32,
            "int64" => Primitive::Int64,
            "uint" => Primitive::Uint,
            "uint8" | "byte" => Primitive::Uint8,
            "uint16" => Primitive::Uint16,
            "uint32" => Primitive::Uint32,
            "uint64" => Primitive::Uint64,
            "uintptr" => Primitive::Uintptr,
            "float32" => Primitive::Float32,
            "float64" => Primitive::Float64,
            _ => return None,
        })
    }

    pub fn is_string(self) -> bool {
        self == Primitive::String
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::Float32 | Primitive::Float64)
    }

    /// The single-byte integer type, whose variable-length sequences are encoded as base64 strings.
    pub fn is_byte(self) -> bool {
        self == Primitive::Uint8
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

/// A type expression as written in a declaration or field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeExpr {
    /// Unqualified name: a primitive, a local type, or a dot-imported type.
    Ident(String),
    /// Name qualified with an imported package path.
    Selector(SelectorExpr),
    Array(ArrayExpr),
    Map(MapExpr),
    Pointer(Box<TypeExpr>),
    Struct(StructExpr),
    Interface {},
}

impl TypeExpr {
    /// Short name of the expression's shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TypeExpr::Ident(_) => "ident",
            TypeExpr::Selector(_) => "selector",
            TypeExpr::Array(_) => "array",
            TypeExpr::Map(_) => "map",
            TypeExpr::Pointer(_) => "pointer",
            TypeExpr::Struct(_) => "struct",
            TypeExpr::Interface {} => "interface",
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Ident(name) => write!(f, "{name}"),
            TypeExpr::Selector(sel) => write!(f, "{}.{}", sel.package, sel.name),
            TypeExpr::Array(arr) => match arr.len {
                Some(len) => write!(f, "[{len}]{}", arr.elem),
                None => write!(f, "[]{}", arr.elem),
            },
            TypeExpr::Map(map) => write!(f, "map[{}]{}", map.key, map.value),
            TypeExpr::Pointer(inner) => write!(f, "*{inner}"),
            TypeExpr::Struct(_) => write!(f, "struct{{...}}"),
            TypeExpr::Interface {} => write!(f, "interface{{}}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorExpr {
    pub package: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayExpr {
    /// `None` for variable-length sequences.
    #[serde(default)]
    pub len: Option<u64>,
    pub elem: Box<TypeExpr>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapExpr {
    pub key: Box<TypeExpr>,
    pub value: Box<TypeExpr>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructExpr {
    #[serde(default)]
    pub fields: Vec<Field>,
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    /// Serialization tag value; `None` when the field carries no usable tag.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub doc: String,
    #[serde(default, rename = "markers")]
    pub raw_markers: Vec<String>,
    #[serde(skip)]
    pub markers: MarkerSet,
    /// Anonymous (embedded) field.
    #[serde(default)]
    pub embedded: bool,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredType {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default, rename = "markers")]
    pub raw_markers: Vec<String>,
    #[serde(skip)]
    pub markers: MarkerSet,
    /// Implements the custom "marshal to bytes" capability.
    #[serde(default)]
    pub marshals_json: bool,
    pub spec: TypeExpr,
}

impl DeclaredType {
    /// Fields of a struct declaration; empty for any other shape.
    pub fn fields(&self) -> &[Field] {
        match &self.spec {
            TypeExpr::Struct(s) => &s.fields,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub markers: MarkerSet,
    pub dot_imports: Vec<String>,
    pub types: IndexMap<String, DeclaredType>,
}

impl Package {
    pub fn is_taxonomy(&self) -> bool {
        self.markers.is_taxonomy()
    }

    /// Optional-by-default packages only require explicitly required fields.
    pub fn optional_by_default(&self) -> bool {
        self.markers.is_optional()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GRAPH
// ————————————————————————————————————————————————————————————————————————————

/// What a name resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'g> {
    Basic(Primitive),
    Named(&'g Package, &'g DeclaredType),
    Invalid,
}

impl<'g> Resolved<'g> {
    pub fn ident(&self) -> Option<TypeIdent> {
        match self {
            Resolved::Named(pkg, decl) => Some(TypeIdent::new(&pkg.path, &decl.name)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    packages: IndexMap<String, Package>,
}

impl TypeGraph {
    pub fn package(&self, path: &str) -> Option<&Package> {
        self.packages.get(path)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn lookup(&self, ident: &TypeIdent) -> Option<&DeclaredType> {
        self.packages.get(&ident.package)?.types.get(&ident.name)
    }

    /// Every declared type, ordered by package path then type name.
    pub fn declared_types(&self) -> Vec<TypeIdent> {
        let mut out: Vec<TypeIdent> = self
            .packages
            .values()
            .flat_map(|pkg| pkg.types.keys().map(move |name| TypeIdent::new(&pkg.path, name)))
            .collect();
        out.sort();
        out
    }

    /// Resolve an unqualified name as seen from `pkg`: local declarations
    /// first, then dot-imported packages, then built-in primitives.
    pub fn resolve_ident<'g>(&'g self, pkg: &'g Package, name: &str) -> Resolved<'g> {
        if let Some(decl) = pkg.types.get(name) {
            return Resolved::Named(pkg, decl);
        }
        for path in &pkg.dot_imports {
            if let Some(imported) = self.packages.get(path) {
                if let Some(decl) = imported.types.get(name) {
                    return Resolved::Named(imported, decl);
                }
            }
        }
        match Primitive::from_name(name) {
            Some(basic) => Resolved::Basic(basic),
            None => Resolved::Invalid,
        }
    }

    pub fn resolve_selector<'g>(&'g self, sel: &SelectorExpr) -> Resolved<'g> {
        match self.packages.get(&sel.package) {
            Some(pkg) => match pkg.types.get(&sel.name) {
                Some(decl) => Resolved::Named(pkg, decl),
                None => Resolved::Invalid,
            },
            None => Resolved::Invalid,
        }
    }

    /// Identity of the named type a field ultimately refers to, looking
    /// through sequences, map values and pointers. `None` for primitives,
    /// struct literals and anything that does not resolve.
    pub fn named_target(&self, pkg: &Package, expr: &TypeExpr) -> Option<TypeIdent> {
        match expr {
            TypeExpr::Ident(name) => self.resolve_ident(pkg, name).ident(),
            TypeExpr::Selector(sel) => self.resolve_selector(sel).ident(),
            TypeExpr::Array(arr) => self.named_target(pkg, &arr.elem),
            TypeExpr::Map(map) => self.named_target(pkg, &map.value),
            TypeExpr::Pointer(inner) => self.named_target(pkg, inner),
            TypeExpr::Struct(_) | TypeExpr::Interface {} => None,
        }
    }
}
