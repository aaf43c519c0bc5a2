//! Go extractor.
//!
//! Symbols: functions, methods qualified as `Receiver.Name`, structs and
//! interfaces from type specs. Edges: calls (plain and selector
//! expressions), imports (package base name or alias).

use code_graph::{Edge, Symbol, SymbolKind};
use tree_sitter::{Node, Tree};

use super::{FileCtx, Out, Scope, children_of, descend};

pub fn extract(tree: &Tree, ctx: &FileCtx) -> (Vec<Symbol>, Vec<Edge>) {
    let mut out = Out::default();
    let mut stack: Vec<(Node, Scope)> = vec![(tree.root_node(), Scope::default())];

    while let Some((node, scope)) = stack.pop() {
        match node.kind() {
            "function_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Function, &name, node);
                    descend(&mut stack, node, &scope.into_body(&id));
                    continue;
                }
            }
            "method_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let mut method_scope = scope.clone();
                    if let Some(receiver) = receiver_type(ctx, node) {
                        method_scope.owners.push(receiver);
                    }
                    let id =
                        out.push_symbol(ctx, &method_scope, SymbolKind::Method, &name, node);
                    descend(&mut stack, node, &method_scope.into_body(&id));
                    continue;
                }
            }
            "type_spec" => {
                if let (Some(name_node), Some(ty)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("type"),
                ) {
                    let kind = match ty.kind() {
                        "struct_type" => Some(SymbolKind::Class),
                        "interface_type" => Some(SymbolKind::Interface),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        let name = ctx.text(name_node).to_string();
                        out.push_symbol(ctx, &scope, kind, &name, node);
                        continue;
                    }
                }
            }
            "call_expression" => {
                if let Some(callee) = callee_name(ctx, node) {
                    out.call(&scope, callee);
                }
            }
            "import_declaration" => {
                collect_imports(ctx, &mut out, node);
                continue;
            }
            _ => {}
        }
        descend(&mut stack, node, &scope);
    }

    out.finish()
}

/// Receiver type name: `func (s *Server) Close()` yields `Server`.
fn receiver_type(ctx: &FileCtx, method: Node) -> Option<String> {
    let receiver = method.child_by_field_name("receiver")?;
    let mut stack = vec![receiver];
    while let Some(n) = stack.pop() {
        if n.kind() == "type_identifier" {
            return Some(ctx.text(n).to_string());
        }
        for child in children_of(n).into_iter().rev() {
            stack.push(child);
        }
    }
    None
}

fn callee_name<'a>(ctx: &'a FileCtx, call: Node) -> Option<&'a str> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(ctx.text(function)),
        "selector_expression" => function.child_by_field_name("field").map(|f| ctx.text(f)),
        _ => None,
    }
}

/// Import specs bind either the alias or the path's base name.
fn collect_imports(ctx: &FileCtx, out: &mut Out, decl: Node) {
    let mut stack = vec![decl];
    while let Some(n) = stack.pop() {
        if n.kind() == "import_spec" {
            if let Some(alias) = n.child_by_field_name("name") {
                out.import(ctx.text(alias));
            } else if let Some(path) = n.child_by_field_name("path") {
                let text = ctx.text(path).trim_matches('"');
                out.import(text.rsplit('/').next().unwrap_or(text));
            }
            continue;
        }
        for child in children_of(n).into_iter().rev() {
            stack.push(child);
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
            .parse("internal/server/server.go", src.as_bytes(), &origin)
            .unwrap()
    }

    #[test]
    fn functions_methods_structs_interfaces() {
        let (symbols, _) = parse(
            r#"
package server

import (
	"fmt"
	q "example.com/pkg/queue"
)

type Server struct{ addr string }

type Handler interface{ Handle() }

// Start boots the listener.
func Start(s *Server) error {
	return s.listen()
}

func (s *Server) listen() error {
	fmt.Println("up")
	return nil
}
"#,
        );

        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("Server").kind, SymbolKind::Class);
        assert_eq!(find("Handler").kind, SymbolKind::Interface);
        assert_eq!(find("Start").kind, SymbolKind::Function);
        assert!(find("Start").doc_comment.as_deref().unwrap().contains("boots"));
        assert_eq!(find("listen").kind, SymbolKind::Method);
        assert_eq!(find("listen").qualified_name, "Server.listen");
        assert_eq!(find("listen").id, "internal/server/server.go:Server.listen");
    }

    #[test]
    fn selector_calls_and_imports() {
        let (_, edges) = parse(
            r#"
package server

import (
	"fmt"
	q "example.com/pkg/queue"
)

func Start() {
	fmt.Println("up")
	q.Push(1)
}
"#,
        );

        assert!(edges.iter().any(|e| {
            e.from == "internal/server/server.go:Start"
                && e.to == EdgeTarget::Name("Println".into())
                && e.kind == EdgeKind::Calls
        }));
        assert!(edges.iter().any(|e| {
            e.to == EdgeTarget::Name("fmt".into()) && e.kind == EdgeKind::Imports
        }));
        assert!(edges.iter().any(|e| {
            e.to == EdgeTarget::Name("q".into()) && e.kind == EdgeKind::Imports
        }));
    }
}
