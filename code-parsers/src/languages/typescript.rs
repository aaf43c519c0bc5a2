//! TypeScript / TSX / JavaScript extractor.
//!
//! Symbols: functions, arrow-bound consts, classes, methods, interfaces,
//! type aliases. Edges: calls (bare callee name), imports (local binding
//! names), inherits and implements from heritage clauses. The TS and JS
//! grammars differ slightly around `class_heritage`, so heritage handling
//! accepts both shapes.

use code_graph::{Edge, EdgeKind, Symbol, SymbolKind};
use tree_sitter::{Node, Tree};

use super::{FileCtx, Out, Scope, children_of, descend};

pub fn extract(tree: &Tree, ctx: &FileCtx) -> (Vec<Symbol>, Vec<Edge>) {
    let mut out = Out::default();
    let mut stack: Vec<(Node, Scope)> = vec![(tree.root_node(), Scope::default())];

    while let Some((node, scope)) = stack.pop() {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = field_text(ctx, node, "name") {
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Function, name, node);
                    descend(&mut stack, node, &scope.into_body(&id));
                    continue;
                }
            }
            "variable_declarator" => {
                let callable = node
                    .child_by_field_name("value")
                    .map(|v| {
                        matches!(
                            v.kind(),
                            "arrow_function" | "function_expression" | "function"
                        )
                    })
                    .unwrap_or(false);
                if callable {
                    if let Some(name) = field_text(ctx, node, "name") {
                        let id = out.push_symbol(ctx, &scope, SymbolKind::Const, name, node);
                        descend(&mut stack, node, &scope.into_body(&id));
                        continue;
                    }
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = field_text(ctx, node, "name") {
                    let name = name.to_string();
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Class, &name, node);
                    heritage_edges(ctx, &mut out, node, &id);
                    descend(&mut stack, node, &scope.into_container(&name, &id));
                    continue;
                }
            }
            "method_definition" => {
                if let Some(name) = field_text(ctx, node, "name") {
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Method, name, node);
                    descend(&mut stack, node, &scope.into_body(&id));
                    continue;
                }
            }
            "interface_declaration" => {
                if let Some(name) = field_text(ctx, node, "name") {
                    let id = out.push_symbol(ctx, &scope, SymbolKind::Interface, name, node);
                    heritage_edges(ctx, &mut out, node, &id);
                    continue;
                }
            }
            "type_alias_declaration" => {
                if let Some(name) = field_text(ctx, node, "name") {
                    out.push_symbol(ctx, &scope, SymbolKind::Type, name, node);
                    continue;
                }
            }
            "call_expression" => {
                if let Some(callee) = callee_name(ctx, node) {
                    out.call(&scope, callee);
                }
            }
            "import_statement" => {
                collect_imports(ctx, &mut out, node);
                continue;
            }
            _ => {}
        }
        descend(&mut stack, node, &scope);
    }

    out.finish()
}

fn field_text<'a>(ctx: &'a FileCtx, node: Node, field: &str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| ctx.text(n))
}

/// Callee identifier at a call site: `foo(...)` or `obj.foo(...)`.
fn callee_name<'a>(ctx: &'a FileCtx, call: Node) -> Option<&'a str> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(ctx.text(function)),
        "member_expression" => function
            .child_by_field_name("property")
            .map(|p| ctx.text(p)),
        _ => None,
    }
}

/// `extends` / `implements` targets from either grammar's heritage shape.
fn heritage_edges(ctx: &FileCtx, out: &mut Out, decl: Node, from_id: &str) {
    for child in children_of(decl) {
        match child.kind() {
            "class_heritage" => {
                for clause in children_of(child) {
                    match clause.kind() {
                        "extends_clause" => {
                            for name in clause_type_names(ctx, clause) {
                                out.relation(from_id, &name, EdgeKind::Inherits);
                            }
                        }
                        "implements_clause" => {
                            for name in clause_type_names(ctx, clause) {
                                out.relation(from_id, &name, EdgeKind::Implements);
                            }
                        }
                        // JS grammar: the heritage child is the expression.
                        _ if clause.is_named() => {
                            out.relation(from_id, type_name(ctx, clause), EdgeKind::Inherits);
                        }
                        _ => {}
                    }
                }
            }
            "extends_clause" | "extends_type_clause" => {
                for name in clause_type_names(ctx, child) {
                    out.relation(from_id, &name, EdgeKind::Inherits);
                }
            }
            "implements_clause" => {
                for name in clause_type_names(ctx, child) {
                    out.relation(from_id, &name, EdgeKind::Implements);
                }
            }
            _ => {}
        }
    }
}

fn clause_type_names(ctx: &FileCtx, clause: Node) -> Vec<String> {
    children_of(clause)
        .into_iter()
        .filter(|n| n.is_named())
        .map(|n| type_name(ctx, n).to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Reduce a heritage type expression to its bare name: generics stripped,
/// last segment of a dotted path.
fn type_name<'a>(ctx: &'a FileCtx, node: Node) -> &'a str {
    let text = ctx.text(node);
    let base = text.split('<').next().unwrap_or(text);
    base.rsplit('.').next().unwrap_or(base).trim()
}

/// Local binding names introduced by one `import` statement.
fn collect_imports(ctx: &FileCtx, out: &mut Out, stmt: Node) {
    for child in children_of(stmt) {
        if child.kind() != "import_clause" {
            continue;
        }
        for part in children_of(child) {
            match part.kind() {
                "identifier" => out.import(ctx.text(part)),
                "namespace_import" => {
                    for n in children_of(part) {
                        if n.kind() == "identifier" {
                            out.import(ctx.text(n));
                        }
                    }
                }
                "named_imports" => {
                    for spec in children_of(part) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let local = spec
                            .child_by_field_name("alias")
                            .or_else(|| spec.child_by_field_name("name"));
                        if let Some(local) = local {
                            out.import(ctx.text(local));
                        }
                    }
                }
                _ => {}
            }
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
        registry.parse("src/auth.ts", src.as_bytes(), &origin).unwrap()
    }

    #[test]
    fn extracts_the_symbol_kinds() {
        let (symbols, _) = parse(
            r#"
import { hash } from "./hash";

export interface Session {
  token: string;
}

export type SessionMap = Record<string, Session>;

export const makeToken = (seed: string) => hash(seed);

export class AuthService {
  login(user: string) {
    return makeToken(user);
  }
}

export function logout(session: Session) {}
"#,
        );

        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("Session").kind, SymbolKind::Interface);
        assert_eq!(find("SessionMap").kind, SymbolKind::Type);
        assert_eq!(find("makeToken").kind, SymbolKind::Const);
        assert_eq!(find("AuthService").kind, SymbolKind::Class);
        assert_eq!(find("login").kind, SymbolKind::Method);
        assert_eq!(find("login").qualified_name, "AuthService.login");
        assert_eq!(find("login").id, "src/auth.ts:AuthService.login");
        assert_eq!(find("logout").kind, SymbolKind::Function);
    }

    #[test]
    fn call_edges_attach_to_the_enclosing_symbol() {
        let (_, edges) = parse(
            r#"
export class AuthService {
  login(user: string) {
    return makeToken(user);
  }
}
"#,
        );
        assert!(edges.iter().any(|e| {
            e.from == "src/auth.ts:AuthService.login"
                && e.to == EdgeTarget::Name("makeToken".into())
                && e.kind == EdgeKind::Calls
        }));
    }

    #[test]
    fn heritage_produces_inherits_and_implements() {
        let (_, edges) = parse(
            r#"
interface Closeable { close(): void; }
class Base {}
export class Conn extends Base implements Closeable {
  close() {}
}
"#,
        );
        assert!(edges.iter().any(|e| {
            e.from == "src/auth.ts:Conn"
                && e.to == EdgeTarget::Name("Base".into())
                && e.kind == EdgeKind::Inherits
        }));
        assert!(edges.iter().any(|e| {
            e.from == "src/auth.ts:Conn"
                && e.to == EdgeTarget::Name("Closeable".into())
                && e.kind == EdgeKind::Implements
        }));
    }

    #[test]
    fn import_bindings_become_import_edges() {
        let (_, edges) = parse(
            r#"
import { hash as h } from "./hash";
export function digest(s: string) { return h(s); }
"#,
        );
        assert!(edges.iter().any(|e| {
            e.from == "src/auth.ts:digest"
                && e.to == EdgeTarget::Name("h".into())
                && e.kind == EdgeKind::Imports
        }));
    }

    #[test]
    fn method_calls_capture_the_property_name() {
        let (_, edges) = parse(
            r#"
export function run(svc: any) {
  svc.execute();
}
"#,
        );
        assert!(edges.iter().any(|e| {
            e.kind == EdgeKind::Calls && e.to == EdgeTarget::Name("execute".into())
        }));
    }
}
