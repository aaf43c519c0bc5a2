//! Java extractor.
//!
//! Symbols: classes, interfaces, methods, constructors. Edges: calls,
//! imports (last segment of the imported path), inherits, implements.

use code_graph::{Edge, EdgeKind, Symbol, SymbolKind};
use tree_sitter::{Node, Tree};

use super::{FileCtx, Out, Scope, children_of, descend};

pub fn extract(tree: &Tree, ctx: &FileCtx) -> (Vec<Symbol>, Vec<Edge>) {
    let mut out = Out::default();
    let mut stack: Vec<(Node, Scope)> = vec![(tree.root_node(), Scope::default())];

    while let Some((node, scope)) = stack.pop() {
        match node.kind() {
            "class_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Class, &name, node);
                    if let Some(superclass) = node.child_by_field_name("superclass") {
                        for t in type_names(ctx, superclass) {
                            out.relation(&id, &t, EdgeKind::Inherits);
                        }
                    }
                    if let Some(interfaces) = node.child_by_field_name("interfaces") {
                        for t in type_names(ctx, interfaces) {
                            out.relation(&id, &t, EdgeKind::Implements);
                        }
                    }
                    descend(&mut stack, node, &scope.into_container(&name, &id));
                    continue;
                }
            }
            "interface_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = ctx.text(name_node).to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Interface, &name, node);
                    for child in children_of(node) {
                        if child.kind() == "extends_interfaces" {
                            for t in type_names(ctx, child) {
                                out.relation(&id, &t, EdgeKind::Inherits);
                            }
                        }
                    }
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
            "method_invocation" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    out.call(&scope, ctx.text(name_node));
                }
            }
            "object_creation_expression" => {
                // `new Foo(...)` behaves like a constructor call.
                if let Some(ty) = node.child_by_field_name("type") {
                    if let Some(t) = type_names(ctx, ty).into_iter().next() {
                        out.call(&scope, &t);
                    }
                }
            }
            "import_declaration" => {
                for child in children_of(node) {
                    if matches!(child.kind(), "scoped_identifier" | "identifier") {
                        let text = ctx.text(child);
                        out.import(text.rsplit('.').next().unwrap_or(text));
                    }
                }
                continue;
            }
            _ => {}
        }
        descend(&mut stack, node, &scope);
    }

    out.finish()
}

/// Bare type names anywhere under `node` (generics stripped, last dotted
/// segment kept).
fn type_names(ctx: &FileCtx, node: Node) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        match n.kind() {
            "type_identifier" => {
                found.push(ctx.text(n).to_string());
                continue;
            }
            "scoped_type_identifier" => {
                let text = ctx.text(n);
                let base = text.split('<').next().unwrap_or(text);
                found.push(base.rsplit('.').next().unwrap_or(base).trim().to_string());
                continue;
            }
            "generic_type" => {
                // Only the head type matters; type arguments are not a
                // heritage relation.
                if let Some(head) = children_of(n).into_iter().next() {
                    stack.push(head);
                }
                continue;
            }
            _ => {}
        }
        for child in children_of(n).into_iter().rev() {
            stack.push(child);
        }
    }
    found
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
            .parse("src/main/java/App.java", src.as_bytes(), &origin)
            .unwrap()
    }

    #[test]
    fn classes_methods_constructors() {
        let (symbols, _) = parse(
            r#"
import java.util.List;

public class OrderService extends BaseService implements Auditable {
    public OrderService() {}

    /** Persist one order. */
    public void save(Order order) {
        validate(order);
    }
}

interface Auditable extends Traceable {
    void audit();
}
"#,
        );

        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("OrderService").kind, SymbolKind::Class);
        assert_eq!(find("Auditable").kind, SymbolKind::Interface);
        assert_eq!(find("save").kind, SymbolKind::Method);
        assert_eq!(find("save").qualified_name, "OrderService.save");
        assert!(find("save").doc_comment.as_deref().unwrap().contains("Persist"));
        // Constructor shares the class name.
        assert!(symbols
            .iter()
            .any(|s| s.qualified_name == "OrderService.OrderService"));
    }

    #[test]
    fn heritage_calls_and_imports() {
        let (_, edges) = parse(
            r#"
import java.util.List;

public class OrderService extends BaseService implements Auditable {
    public void save(Order order) {
        validate(order);
    }
}
"#,
        );

        let from = "src/main/java/App.java:OrderService";
        assert!(edges.iter().any(|e| e.from == from
            && e.to == EdgeTarget::Name("BaseService".into())
            && e.kind == EdgeKind::Inherits));
        assert!(edges.iter().any(|e| e.from == from
            && e.to == EdgeTarget::Name("Auditable".into())
            && e.kind == EdgeKind::Implements));
        assert!(edges.iter().any(|e| {
            e.from == "src/main/java/App.java:OrderService.save"
                && e.to == EdgeTarget::Name("validate".into())
                && e.kind == EdgeKind::Calls
        }));
        assert!(edges
            .iter()
            .any(|e| e.to == EdgeTarget::Name("List".into()) && e.kind == EdgeKind::Imports));
    }
}
