//! Generation driver: the schema ledger and document assembly.
//!
//! [`Generator::generate`] requests a schema for every object root and every
//! type of a taxonomy package. Synthesis pulls in further types through
//! [`SchemaRequester::need_schema_for`]; each type is synthesized exactly once,
//! with a placeholder in the ledger while its descent is running so that
//! cyclic references stop at a `$ref`. The ledger is then partitioned into
//! documents, and each object root gets its pruned document on top.
use indexmap::IndexMap;

use crate::context::SchemaContext;
use crate::document::{Document, DocumentSet};
use crate::errors::{ErrorSink, GenerationError};
use crate::graph::{TypeGraph, TypeIdent};
use crate::naming::DocumentNaming;
use crate::schema::SchemaNode;
use crate::synth::{info_to_schema, SchemaRequester};
use crate::taxonomy::{prune, taxonomy_closure};

#[derive(Debug, Clone, Copy, Default)]
pub struct Generator {
    /// Permit floating point types, which map to `number`.
    pub allow_dangerous_types: bool,
}

/// Everything a run produced. Documents are complete even when errors were recorded.
#[derive(Debug, Clone)]
pub struct Generation {
    pub documents: DocumentSet,
    pub errors: ErrorSink,
}

impl Generation {
    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LEDGER
// ————————————————————————————————————————————————————————————————————————————

/// The run-scoped ledger of synthesized schemas.
#[derive(Debug)]
pub struct GeneratorContext<'g> {
    graph: &'g TypeGraph,
    naming: DocumentNaming<'g>,
    schemata: IndexMap<TypeIdent, SchemaNode>,
    errors: ErrorSink,
    allow_dangerous_types: bool,
}

impl<'g> GeneratorContext<'g> {
    pub fn new(graph: &'g TypeGraph, allow_dangerous_types: bool) -> Self {
        Self {
            graph,
            naming: DocumentNaming::scan(graph),
            schemata: IndexMap::new(),
            errors: ErrorSink::new(),
            allow_dangerous_types,
        }
    }

    pub fn schema(&self, ident: &TypeIdent) -> Option<&SchemaNode> {
        self.schemata.get(ident)
    }

    /// Identities in the ledger, in the order their synthesis started.
    pub fn synthesized(&self) -> impl Iterator<Item = &TypeIdent> {
        self.schemata.keys()
    }

    pub fn into_errors(self) -> ErrorSink {
        self.errors
    }
}

impl SchemaRequester for GeneratorContext<'_> {
    fn need_schema_for(&mut self, typ: &TypeIdent) {
        if self.schemata.contains_key(typ) {
            return;
        }
        let graph = self.graph;
        let (Some(pkg), Some(info)) = (graph.package(&typ.package), graph.lookup(typ)) else {
            self.errors
                .push(&typ.package, typ.name.clone(), GenerationError::UnknownType(typ.clone()));
            return;
        };

        // in progress: re-entrant requests see this and only emit a $ref
        self.schemata.insert(typ.clone(), SchemaNode::empty());

        let ctx = SchemaContext::new(graph, pkg, self.allow_dangerous_types).for_info(info);
        let schema = info_to_schema(&ctx, self);
        self.schemata.insert(typ.clone(), schema);
    }

    fn type_ref_link(&self, from: &str, to: &TypeIdent) -> String {
        self.naming.type_ref_link(from, to)
    }

    fn errors(&mut self) -> &mut ErrorSink {
        &mut self.errors
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DRIVER
// ————————————————————————————————————————————————————————————————————————————

impl Generator {
    pub fn new(allow_dangerous_types: bool) -> Self {
        Self { allow_dangerous_types }
    }

    pub fn generate(&self, graph: &TypeGraph) -> Generation {
        let mut cx = GeneratorContext::new(graph, self.allow_dangerous_types);

        let declared = graph.declared_types();
        let mut roots = Vec::new();
        for ident in &declared {
            let Some(info) = graph.lookup(ident) else {
                continue;
            };
            if info.markers.object_title().is_some() {
                roots.push(ident.clone());
                cx.need_schema_for(ident);
            }
            if cx.naming.is_taxonomy_package(&ident.package) {
                cx.need_schema_for(ident);
            }
        }

        let mut documents = assemble_documents(&cx);
        for root in &roots {
            if let Err(error) = add_object_document(&cx, root, &mut documents) {
                cx.errors.push(&root.package, root.name.clone(), error);
            }
        }

        tracing::info!(
            types = cx.schemata.len(),
            documents = documents.len(),
            errors = cx.errors.len(),
            "generation finished"
        );
        Generation {
            documents,
            errors: cx.into_errors(),
        }
    }
}

/// Partition the ledger into the shared document and one per taxonomy package.
fn assemble_documents(cx: &GeneratorContext<'_>) -> DocumentSet {
    let mut idents: Vec<&TypeIdent> = cx.schemata.keys().collect();
    idents.sort();

    let mut documents = DocumentSet::new();
    for ident in idents {
        let name = cx.naming.document_name_for(&ident.package);
        let key = cx.naming.definition_name_for(&name, ident);
        documents
            .entry_or_insert_with(&name, || Document::named(name.as_str()))
            .definitions
            .insert(key, cx.schemata[ident].clone());
    }
    documents
}

/// `<title>.json`: a pruned copy of the root plus pruned copies of every
/// intermediate type between it and the taxonomy. Roots sharing a title
/// share the document; the first one provides the root schema. A title
/// naming a package document is an error and nothing is added.
fn add_object_document(
    cx: &GeneratorContext<'_>,
    root: &TypeIdent,
    documents: &mut DocumentSet,
) -> Result<(), GenerationError> {
    let (Some(info), Some(schema)) = (cx.graph.lookup(root), cx.schemata.get(root)) else {
        return Ok(());
    };
    let Some(title) = info.markers.object_title() else {
        return Ok(());
    };
    let name = format!("{title}.json");
    if cx.naming.is_package_document(&name) {
        return Err(GenerationError::ObjectTitleCollision(title.to_string()));
    }
    let closure = taxonomy_closure(cx.graph, root);
    tracing::debug!(root = %root, document = %name, retained = closure.retained.len(), "object document");

    let document = documents.entry_or_insert_with(&name, || {
        let mut pruned = schema.clone();
        prune(cx.graph, root, &mut pruned, &closure);
        Document::rooted(name.as_str(), pruned)
    });
    for ident in &closure.retained {
        let Some(full) = cx.schemata.get(ident) else {
            continue;
        };
        let mut pruned = full.clone();
        prune(cx.graph, ident, &mut pruned, &closure);
        document
            .definitions
            .insert(cx.naming.object_definition_name(ident), pruned);
    }
    Ok(())
}
