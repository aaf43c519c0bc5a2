//! Per-language extractors plus the helpers they share.
//!
//! Every extractor is a stack-driven walk over the Tree-sitter tree. The
//! walk carries a [`Scope`]: the owner chain (for qualified names) and the
//! nearest enclosing declared symbol (call edges attach to it). Extractors
//! stay free of I/O and never fail; whatever the grammar recognised is
//! what comes out.

pub mod csharp;
pub mod go;
pub mod java;
pub mod python;
pub mod typescript;

use code_graph::{Edge, EdgeKind, EdgeTarget, Symbol, SymbolKind};
use tree_sitter::Node;

/// Borrowed context for one file being extracted.
pub struct FileCtx<'a> {
    pub code: &'a str,
    pub file_path: &'a str,
    pub repo_id: &'a str,
    pub branch: &'a str,
}

impl FileCtx<'_> {
    /// Source text of a node.
    pub fn text(&self, node: Node) -> &str {
        &self.code[node.byte_range()]
    }

    /// Inclusive 1-indexed line range.
    pub fn line_range(&self, node: Node) -> (u32, u32) {
        (
            node.start_position().row as u32 + 1,
            node.end_position().row as u32 + 1,
        )
    }

    /// Single-line declaration signature: first source line of the node,
    /// trailing block opener stripped, whitespace collapsed.
    pub fn signature(&self, node: Node) -> String {
        let first_line = self.text(node).lines().next().unwrap_or_default();
        let mut sig = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
        while sig.ends_with('{') || sig.ends_with(':') {
            sig.pop();
        }
        sig.trim_end().to_string()
    }

    /// Leading documentation: contiguous comment siblings directly above
    /// the declaration, top to bottom, raw text joined by newlines.
    pub fn doc_comment(&self, node: Node) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        let mut expected_row = node.start_position().row;
        let mut cursor = node;

        while let Some(prev) = cursor.prev_sibling() {
            if !prev.kind().contains("comment") {
                break;
            }
            // A blank line between comment and declaration detaches it.
            if prev.end_position().row + 1 < expected_row {
                break;
            }
            expected_row = prev.start_position().row;
            parts.push(self.text(prev));
            cursor = prev;
        }

        if parts.is_empty() {
            return None;
        }
        parts.reverse();
        Some(parts.join("\n").trim().to_string())
    }
}

/// Walk state: owner chain plus nearest enclosing declared symbol.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub owners: Vec<String>,
    pub enclosing: Option<String>,
}

impl Scope {
    /// Child scope inside a named container (class, interface, struct).
    pub fn into_container(mut self, name: &str, id: &str) -> Self {
        self.owners.push(name.to_string());
        self.enclosing = Some(id.to_string());
        self
    }

    /// Child scope inside a callable body.
    pub fn into_body(mut self, id: &str) -> Self {
        self.enclosing = Some(id.to_string());
        self
    }
}

/// Accumulates extraction output and expands import edges at the end.
#[derive(Default)]
pub struct Out {
    pub symbols: Vec<Symbol>,
    pub edges: Vec<Edge>,
    imports: Vec<String>,
    top_level: Vec<String>,
}

impl Out {
    /// Register a declaration and return its id.
    pub fn push_symbol(
        &mut self,
        ctx: &FileCtx,
        scope: &Scope,
        kind: SymbolKind,
        name: &str,
        decl: Node,
    ) -> String {
        let qualified_name = if scope.owners.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", scope.owners.join("."), name)
        };
        let id = Symbol::make_id(ctx.file_path, &qualified_name);

        self.symbols.push(Symbol {
            id: id.clone(),
            file_path: ctx.file_path.to_string(),
            name: name.to_string(),
            qualified_name,
            kind,
            signature: ctx.signature(decl),
            body_range: ctx.line_range(decl),
            doc_comment: ctx.doc_comment(decl),
            repo_id: ctx.repo_id.to_string(),
            branch: ctx.branch.to_string(),
        });
        if scope.owners.is_empty() {
            self.top_level.push(id.clone());
        }
        id
    }

    /// Call edge from the enclosing symbol to a bare callee name. Calls
    /// outside any declaration have nothing to hang the edge on.
    pub fn call(&mut self, scope: &Scope, callee: &str) {
        if callee.is_empty() {
            return;
        }
        if let Some(from) = &scope.enclosing {
            self.edges.push(Edge::new(
                from.clone(),
                EdgeTarget::Name(callee.to_string()),
                EdgeKind::Calls,
            ));
        }
    }

    /// Relation from a declared symbol to a bare type name.
    pub fn relation(&mut self, from_id: &str, to_name: &str, kind: EdgeKind) {
        if to_name.is_empty() {
            return;
        }
        self.edges.push(Edge::new(
            from_id.to_string(),
            EdgeTarget::Name(to_name.to_string()),
            kind,
        ));
    }

    /// Record an imported bare name for later expansion.
    pub fn import(&mut self, name: &str) {
        if !name.is_empty() {
            self.imports.push(name.to_string());
        }
    }

    /// Expand imports (one edge per top-level symbol per imported name)
    /// and hand back the final lists.
    pub fn finish(mut self) -> (Vec<Symbol>, Vec<Edge>) {
        for from in &self.top_level {
            for name in &self.imports {
                self.edges.push(Edge::new(
                    from.clone(),
                    EdgeTarget::Name(name.clone()),
                    EdgeKind::Imports,
                ));
            }
        }
        (self.symbols, self.edges)
    }
}

/// Children in source order, collected so the caller can push them onto an
/// explicit stack (reversed) without holding the cursor.
pub fn children_of(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Push children so the explicit stack pops them in source order.
pub fn descend<'t>(stack: &mut Vec<(Node<'t>, Scope)>, node: Node<'t>, scope: &Scope) {
    for child in children_of(node).into_iter().rev() {
        stack.push((child, scope.clone()));
    }
}
