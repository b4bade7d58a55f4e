//! Taxonomy subgraph extraction for object roots.
//!
//! An object root gets a second, pruned document that only keeps the fields
//! leading to taxonomy types. [`taxonomy_closure`] finds the intermediate
//! types on those paths and [`prune`] strips every other field from a copy of
//! a schema.
use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::graph::{TypeGraph, TypeIdent};
use crate::schema::SchemaNode;
use crate::tag::FieldTag;

/// Result of walking one type's fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Closure {
    /// Non-taxonomy types on some path to a taxonomy type, in discovery order.
    pub retained: Vec<TypeIdent>,
    /// Whether any field of the walked type reaches a taxonomy package.
    pub reaches_taxonomy: bool,
}

impl Closure {
    pub fn retains(&self, ident: &TypeIdent) -> bool {
        self.retained.contains(ident)
    }
}

fn is_taxonomy(graph: &TypeGraph, ident: &TypeIdent) -> bool {
    graph.package(&ident.package).is_some_and(|pkg| pkg.is_taxonomy())
}

/// Intermediate types between `root` and the taxonomy packages.
///
/// A type reaches the taxonomy when one of its fields names a taxonomy type
/// or a type that reaches it. Reachability is solved as a fixed point over
/// every type reachable from `root`, so membership does not depend on field
/// order even when types form cycles. `root` itself is never retained.
pub fn taxonomy_closure(graph: &TypeGraph, root: &TypeIdent) -> Closure {
    // non-taxonomy types reachable from root, in discovery order
    let mut reachable = IndexSet::new();
    reachable.insert(root.clone());
    let mut edges: HashMap<TypeIdent, Vec<TypeIdent>> = HashMap::new();
    let mut next = 0;
    while let Some(typ) = reachable.get_index(next).cloned() {
        next += 1;
        let targets = field_targets(graph, &typ);
        for target in &targets {
            if !is_taxonomy(graph, target) {
                reachable.insert(target.clone());
            }
        }
        edges.insert(typ, targets);
    }

    let mut reaching: HashSet<TypeIdent> = HashSet::new();
    loop {
        let before = reaching.len();
        for (typ, targets) in &edges {
            if reaching.contains(typ) {
                continue;
            }
            if targets.iter().any(|t| is_taxonomy(graph, t) || reaching.contains(t)) {
                reaching.insert(typ.clone());
            }
        }
        if reaching.len() == before {
            break;
        }
    }

    Closure {
        retained: reachable.iter().skip(1).filter(|t| reaching.contains(*t)).cloned().collect(),
        reaches_taxonomy: reaching.contains(root),
    }
}

/// Declared types named by the fields of `typ`, through pointers and containers.
fn field_targets(graph: &TypeGraph, typ: &TypeIdent) -> Vec<TypeIdent> {
    let (Some(pkg), Some(decl)) = (graph.package(&typ.package), graph.lookup(typ)) else {
        return Vec::new();
    };
    decl.fields()
        .iter()
        .filter_map(|field| graph.named_target(pkg, &field.ty))
        .filter(|target| graph.lookup(target).is_some())
        .collect()
}

/// Remove from `schema` (the schema of `typ`) every property whose field
/// type is neither taxonomy-resident nor retained. Primitive-typed fields
/// are removed too. Inline fields are left alone.
pub fn prune(graph: &TypeGraph, typ: &TypeIdent, schema: &mut SchemaNode, closure: &Closure) {
    let (Some(pkg), Some(decl)) = (graph.package(&typ.package), graph.lookup(typ)) else {
        return;
    };
    for field in decl.fields() {
        let target = graph.named_target(pkg, &field.ty);
        if target.as_ref().is_some_and(|t| is_taxonomy(graph, t)) {
            continue;
        }
        let keep = target
            .as_ref()
            .is_some_and(|t| closure.retains(t) && graph.lookup(t).is_some());
        if keep {
            continue;
        }
        let Some(tag) = field.tag.as_deref() else {
            continue;
        };
        if let FieldTag::Present { name, inline: false, .. } = FieldTag::parse(tag, field.embedded) {
            tracing::trace!(ty = %typ, property = %name, "pruning property");
            schema.remove_property(&name);
        }
    }
}
