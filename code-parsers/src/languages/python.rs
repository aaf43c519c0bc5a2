//! Python extractor.
//!
//! Symbols: functions (sync and async parse to the same node kind) and
//! classes; functions declared inside a class body become methods. Edges:
//! calls, imports, inherits. Docstrings win over leading `#` comments.

use code_graph::{Edge, EdgeKind, Symbol, SymbolKind};
use tree_sitter::{Node, Tree};

use super::{FileCtx, Out, Scope, children_of, descend};

pub fn extract(tree: &Tree, ctx: &FileCtx) -> (Vec<Symbol>, Vec<Edge>) {
    let mut out = Out::default();
    let mut stack: Vec<(Node, Scope)> = vec![(tree.root_node(), Scope::default())];

    while let Some((node, scope)) = stack.pop() {
        match node.kind() {
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let kind = if scope.owners.is_empty() {
                        SymbolKind::Function
                    } else {
                        SymbolKind::Method
                    };
                    let id = out.push_symbol(ctx, &scope, kind, &name, node);
                    attach_docstring(ctx, &mut out, node);
                    descend(&mut stack, node, &scope.into_body(&id));
                    continue;
                }
            }
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Class, &name, node);
                    attach_docstring(ctx, &mut out, node);
                    if let Some(bases) = node.child_by_field_name("superclasses") {
                        for base in children_of(bases) {
                            match base.kind() {
                                "identifier" => {
                                    out.relation(&id, ctx.text(base), EdgeKind::Inherits)
                                }
                                "attribute" => {
                                    if let Some(attr) = base.child_by_field_name("attribute") {
                                        out.relation(&id, ctx.text(attr), EdgeKind::Inherits);
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    descend(&mut stack, node, &scope.into_container(&name, &id));
                    continue;
                }
            }
            "call" => {
                if let Some(callee) = callee_name(ctx, node) {
                    out.call(&scope, callee);
                }
            }
            "import_statement" | "import_from_statement" => {
                collect_imports(ctx, &mut out, node);
                continue;
            }
            _ => {}
        }
        descend(&mut stack, node, &scope);
    }

    out.finish()
}

fn callee_name<'a>(ctx: &'a FileCtx, call: Node) -> Option<&'a str> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(ctx.text(function)),
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|a| ctx.text(a)),
        _ => None,
    }
}

/// Use the body docstring when no leading comment was captured.
fn attach_docstring(ctx: &FileCtx, out: &mut Out, decl: Node) {
    let Some(body) = decl.child_by_field_name("body") else {
        return;
    };
    let Some(first) = children_of(body).into_iter().find(|n| n.is_named()) else {
        return;
    };
    if first.kind() != "expression_statement" {
        return;
    }
    let Some(string) = children_of(first).into_iter().find(|n| n.kind() == "string") else {
        return;
    };
    if let Some(last) = out.symbols.last_mut() {
        if last.doc_comment.is_none() {
            let doc = ctx
                .text(string)
                .trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string();
            if !doc.is_empty() {
                last.doc_comment = Some(doc);
            }
        }
    }
}

/// Local binding names: `import a.b` binds `a`; `from m import x as y`
/// binds `y`.
fn collect_imports(ctx: &FileCtx, out: &mut Out, stmt: Node) {
    let from_import = stmt.kind() == "import_from_statement";
    let module = stmt.child_by_field_name("module_name");

    for child in children_of(stmt) {
        if let Some(m) = module {
            if child.id() == m.id() {
                continue;
            }
        }
        match child.kind() {
            "dotted_name" => {
                let text = ctx.text(child);
                let bound = if from_import {
                    text.rsplit('.').next().unwrap_or(text)
                } else {
                    text.split('.').next().unwrap_or(text)
                };
                out.import(bound);
            }
            "aliased_import" => {
                if let Some(alias) = child.child_by_field_name("alias") {
                    out.import(ctx.text(alias));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::{FileOrigin, ParserRegistry};
    use code_graph::{EdgeKind, EdgeTarget, SymbolKind};

    fn parse(src: &str) -> (Vec<code_graph::Symbol>, Vec<code_graph::Edge>) {
        let registry = ParserRegistry::new();
        let origin = FileOrigin {
            repo_id: "r".into(),
            branch: "main".into(),
        };
        registry
            .parse("app/models.py", src.as_bytes(), &origin)
            .unwrap()
    }

    #[test]
    fn functions_classes_and_methods() {
        let (symbols, _) = parse(
            r#"
from db import session

async def fetch_user(user_id):
    """Load one user."""
    return session.get(user_id)

class UserRepo(BaseRepo):
    def save(self, user):
        session.add(user)
"#,
        );

        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("fetch_user").kind, SymbolKind::Function);
        assert_eq!(find("fetch_user").doc_comment.as_deref(), Some("Load one user."));
        assert_eq!(find("UserRepo").kind, SymbolKind::Class);
        assert_eq!(find("save").kind, SymbolKind::Method);
        assert_eq!(find("save").qualified_name, "UserRepo.save");
    }

    #[test]
    fn inherits_calls_and_imports() {
        let (_, edges) = parse(
            r#"
from db import session

class UserRepo(BaseRepo):
    def save(self, user):
        validate(user)
        session.add(user)
"#,
        );

        assert!(edges.iter().any(|e| {
            e.from == "app/models.py:UserRepo"
                && e.to == EdgeTarget::Name("BaseRepo".into())
                && e.kind == EdgeKind::Inherits
        }));
        assert!(edges.iter().any(|e| {
            e.from == "app/models.py:UserRepo.save"
                && e.to == EdgeTarget::Name("validate".into())
                && e.kind == EdgeKind::Calls
        }));
        // Attribute calls keep the trailing name only.
        assert!(edges.iter().any(|e| {
            e.from == "app/models.py:UserRepo.save"
                && e.to == EdgeTarget::Name("add".into())
                && e.kind == EdgeKind::Calls
        }));
        assert!(edges.iter().any(|e| {
            e.to == EdgeTarget::Name("session".into()) && e.kind == EdgeKind::Imports
        }));
    }
}
