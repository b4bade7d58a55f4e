//! Compiles a graph of annotated type declarations into JSON Schema documents.
//!
//! The pipeline: a [`graph::TypeGraph`] (loaded from JSON manifests) is walked
//! by the [`generator::Generator`], which synthesizes one schema per declared
//! type ([`synth`]), applies markers ([`markers`]), partitions the results
//! into documents ([`naming`], [`document`]) and derives a pruned document
//! for every object root ([`taxonomy`]).
pub mod cli;
pub mod context;
pub mod document;
pub mod errors;
pub mod generator;
pub mod graph;
pub mod markers;
pub mod naming;
pub mod output;
pub mod path_de;
pub mod schema;
pub mod synth;
pub mod tag;
pub mod taxonomy;

pub use document::{Document, DocumentSet};
pub use errors::{ErrorSink, GenerationError, LoadError, LocatedError, OutputError};
pub use generator::{Generation, Generator};
pub use graph::manifest::Manifest;
pub use graph::{TypeGraph, TypeIdent};
pub use markers::MarkerRegistry;
pub use schema::SchemaNode;
