use crate::graph::{DeclaredType, Package, TypeExpr, TypeGraph};

/// Traversal state threaded through synthesis. Cheap to copy; derived
/// contexts are made with [`SchemaContext::for_info`] and [`SchemaContext::fresh`].
#[derive(Debug, Clone, Copy)]
pub struct SchemaContext<'g> {
    pub graph: &'g TypeGraph,
    /// Package the expression under synthesis was written in.
    pub pkg: &'g Package,
    /// Declaration currently being synthesized; `None` for nested
    /// occurrences (fields, sequence elements, map values), which must not
    /// inherit the declaration's doc or markers.
    pub info: Option<&'g DeclaredType>,
    /// Name of the enclosing declaration; survives [`SchemaContext::fresh`].
    pub owner: Option<&'g str>,
    pub allow_dangerous_types: bool,
}

impl<'g> SchemaContext<'g> {
    pub fn new(graph: &'g TypeGraph, pkg: &'g Package, allow_dangerous_types: bool) -> Self {
        Self {
            graph,
            pkg,
            info: None,
            owner: None,
            allow_dangerous_types,
        }
    }

    pub fn for_info(&self, info: &'g DeclaredType) -> Self {
        Self {
            info: Some(info),
            owner: Some(info.name.as_str()),
            ..*self
        }
    }

    /// Same package and options, no declaration info.
    pub fn fresh(&self) -> Self {
        Self { info: None, ..*self }
    }

    /// Error location inside the package: the enclosing declaration, if any.
    pub fn location(&self) -> String {
        self.owner.unwrap_or_default().to_string()
    }

    /// True when `expr` is the body of the declaration under synthesis
    /// (identity, not structural equality).
    pub fn is_declaration_body(&self, expr: &TypeExpr) -> bool {
        self.info.is_some_and(|info| std::ptr::eq(&info.spec, expr))
    }
}
