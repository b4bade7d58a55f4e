//! Error taxonomy and the run-scoped error sink.
//!
//! Nothing in the synthesis core returns early on a bad field or type. Every
//! problem is recorded in an [`ErrorSink`] against the package (and a short
//! location inside it) that caused it, and a placeholder node is produced so
//! traversal keeps going. A run has failed iff the sink is non-empty.
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::graph::TypeIdent;

/// One problem found while synthesizing schemas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("encountered struct field {field:?} without JSON tag in type {type_name:?}")]
    UntaggedField { type_name: String, field: String },

    #[error("unknown type {0}")]
    UnresolvedReference(String),

    #[error("unknown type {0}")]
    UnknownType(TypeIdent),

    #[error("unsupported type expression kind {0}")]
    UnsupportedShape(&'static str),

    #[error("map keys must be strings, not {0}")]
    InvalidMapKey(String),

    #[error(
        "found float, the usage of which is highly discouraged, as support for them varies across \
         languages. Please consider serializing your float as string instead. If you are really \
         sure you want to use them, re-run with --allow-dangerous-types"
    )]
    DisallowedFloat,

    #[error("encountered non-top-level struct (possibly embedded), those aren't allowed")]
    MisplacedStructLiteral,

    #[error("marker {marker:?}: {reason}")]
    AnnotationRewrite { marker: String, reason: String },

    #[error("object title {0:?} names a package document")]
    ObjectTitleCollision(String),

    #[error("invalid marker {raw:?}: {reason}")]
    InvalidMarker { raw: String, reason: String },
}

/// A [`GenerationError`] attached to the package that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedError {
    pub package: String,
    /// `Type`, `Type.Field` or empty for package-level problems.
    pub location: String,
    pub error: GenerationError,
}

impl fmt::Display for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}: {}", self.package, self.error)
        } else {
            write!(f, "{} ({}): {}", self.package, self.location, self.error)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    errors: Vec<LocatedError>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, package: &str, location: impl Into<String>, error: GenerationError) {
        let located = LocatedError {
            package: package.to_string(),
            location: location.into(),
            error,
        };
        tracing::warn!(package = %located.package, location = %located.location, "{}", located.error);
        self.errors.push(located);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocatedError> {
        self.errors.iter()
    }

    pub fn extend(&mut self, other: ErrorSink) {
        self.errors.extend(other.errors);
    }
}

/// Failure to read or assemble the type-graph manifests.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("package {0:?} is declared more than once")]
    DuplicatePackage(String),

    #[error("type {type_name:?} is declared more than once in package {package:?}")]
    DuplicateType { package: String, type_name: String },
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
