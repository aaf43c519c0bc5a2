//! C# extractor.
//!
//! Symbols: classes, records, interfaces, methods, constructors. Edges:
//! calls, imports (usings), inherits. C# base lists do not syntactically
//! separate base classes from interfaces, so every base entry is an
//! inherits edge.

use code_graph::{Edge, EdgeKind, Symbol, SymbolKind};
use tree_sitter::{Node, Tree};

use super::{FileCtx, Out, Scope, children_of, descend};

pub fn extract(tree: &Tree, ctx: &FileCtx) -> (Vec<Symbol>, Vec<Edge>) {
    let mut out = Out::default();
    let mut stack: Vec<(Node, Scope)> = vec![(tree.root_node(), Scope::default())];

    while let Some((node, scope)) = stack.pop() {
        match node.kind() {
            "class_declaration" | "record_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Class, &name, node);
                    base_list_edges(ctx, &mut out, node, &id);
                    descend(&mut stack, node, &scope.into_container(&name, &id));
                    continue;
                }
            }
            "interface_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Interface, &name, node);
                    base_list_edges(ctx, &mut out, node, &id);
                    descend(&mut stack, node, &scope.into_container(&name, &id));
                    continue;
                }
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Method, &name, node);
                    descend(&mut stack, node, &scope.into_body(&id));
                    continue;
                }
            }
            "invocation_expression" => {
                if let Some(callee) = callee_name(ctx, node) {
                    out.call(&scope, callee);
                }
            }
            "object_creation_expression" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    out.call(&scope, bare_type(ctx.text(ty)));
                }
            }
            "using_directive" => {
                collect_using(ctx, &mut out, node);
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
        "member_access_expression" => function.child_by_field_name("name").map(|n| ctx.text(n)),
        _ => None,
    }
}

fn base_list_edges(ctx: &FileCtx, out: &mut Out, decl: Node, from_id: &str) {
    for child in children_of(decl) {
        if child.kind() != "base_list" {
            continue;
        }
        for base in children_of(child) {
            if base.is_named() {
                out.relation(from_id, bare_type(ctx.text(base)), EdgeKind::Inherits);
            }
        }
    }
}

/// Using directives: the aliased name when present, otherwise the last
/// namespace segment.
fn collect_using(ctx: &FileCtx, out: &mut Out, node: Node) {
    for child in children_of(node) {
        match child.kind() {
            "name_equals" => {
                if let Some(alias) = children_of(child).into_iter().find(|n| n.is_named()) {
                    out.import(ctx.text(alias));
                }
                return;
            }
            "qualified_name" | "identifier" => {
                let text = ctx.text(child);
                out.import(text.rsplit('.').next().unwrap_or(text));
            }
            _ => {}
        }
    }
}

fn bare_type(text: &str) -> &str {
    let base = text.split('<').next().unwrap_or(text);
    base.rsplit('.').next().unwrap_or(base).trim()
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
            .parse("Services/Billing.cs", src.as_bytes(), &origin)
            .unwrap()
    }

    #[test]
    fn classes_records_interfaces_methods() {
        let (symbols, _) = parse(
            r#"
using System.Text;

public interface IInvoice { void Send(); }

public record Receipt(string Id);

public class BillingService : ServiceBase, IInvoice
{
    public BillingService() {}

    public void Send()
    {
        Render();
    }
}
"#,
        );

        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("IInvoice").kind, SymbolKind::Interface);
        assert_eq!(find("Receipt").kind, SymbolKind::Class);
        assert_eq!(find("BillingService").kind, SymbolKind::Class);
        let send = symbols
            .iter()
            .find(|s| s.qualified_name == "BillingService.Send")
            .unwrap();
        assert_eq!(send.kind, SymbolKind::Method);
        assert!(symbols
            .iter()
            .any(|s| s.qualified_name == "BillingService.BillingService"));
    }

    #[test]
    fn base_list_and_usings() {
        let (_, edges) = parse(
            r#"
using System.Text;

public class BillingService : ServiceBase, IInvoice
{
    public void Send() { Render(); }
}
"#,
        );

        let from = "Services/Billing.cs:BillingService";
        assert!(edges.iter().any(|e| e.from == from
            && e.to == EdgeTarget::Name("ServiceBase".into())
            && e.kind == EdgeKind::Inherits));
        assert!(edges.iter().any(|e| e.from == from
            && e.to == EdgeTarget::Name("IInvoice".into())
            && e.kind == EdgeKind::Inherits));
        assert!(edges.iter().any(|e| {
            e.from == "Services/Billing.cs:BillingService.Send"
                && e.to == EdgeTarget::Name("Render".into())
                && e.kind == EdgeKind::Calls
        }));
        assert!(edges
            .iter()
            .any(|e| e.to == EdgeTarget::Name("Text".into()) && e.kind == EdgeKind::Imports));
    }
}
