//! In-memory adjacency over symbols and edges.
//!
//! Representation follows the two-owned-maps shape: `out_edges` and
//! `in_edges` both key by symbol id and hold plain edge values, so cycles
//! (mutual recursion, import cycles) cost nothing. Secondary indices:
//! - `name_to_ids` resolves call sites captured as bare names;
//! - `file_to_symbols` makes per-file removal O(|symbols in file|).
//!
//! Extraction-time edges are kept in an ordered journal keyed by source
//! symbol. [`SymbolGraph::resolve_names`] expands the journal into the
//! adjacency maps once per indexing batch; because the journal survives
//! resolution, removing a file and re-parsing identical bytes restores the
//! exact pre-removal state, inbound edges included.
//!
//! All operations are pure with respect to I/O.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::types::{BlastRadius, Edge, EdgeTarget, ResolvedEdge, Symbol};

/// Symbol graph for one (repo, branch) pair.
#[derive(Debug, Default, Clone)]
pub struct SymbolGraph {
    symbols: HashMap<String, Symbol>,
    out_edges: HashMap<String, Vec<ResolvedEdge>>,
    in_edges: HashMap<String, Vec<ResolvedEdge>>,
    name_to_ids: HashMap<String, BTreeSet<String>>,
    file_to_symbols: HashMap<String, BTreeSet<String>>,
    /// Extraction-time edges in deterministic order. Source of truth for
    /// the adjacency maps; re-expanded on every [`SymbolGraph::resolve_names`].
    journal: BTreeSet<Edge>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Number of resolved edges currently in the adjacency maps.
    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(Vec::len).sum()
    }

    pub fn symbol(&self, id: &str) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Symbols declared in `path`, in id order.
    pub fn symbols_in_file(&self, path: &str) -> Vec<&Symbol> {
        self.file_to_symbols
            .get(path)
            .map(|ids| ids.iter().filter_map(|id| self.symbols.get(id)).collect())
            .unwrap_or_default()
    }

    /// Upsert a symbol by id and maintain the name and file indices.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.name_to_ids
            .entry(symbol.name.clone())
            .or_default()
            .insert(symbol.id.clone());
        self.file_to_symbols
            .entry(symbol.file_path.clone())
            .or_default()
            .insert(symbol.id.clone());
        self.symbols.insert(symbol.id.clone(), symbol);
    }

    /// Record an extraction-time edge. Idempotent on exact duplicates.
    /// Adjacency is materialized on the next [`SymbolGraph::resolve_names`].
    pub fn add_edge(&mut self, edge: Edge) {
        self.journal.insert(edge);
    }

    fn insert_resolved(&mut self, edge: ResolvedEdge) {
        // Both endpoints must exist; dangling edges never materialize.
        if !self.symbols.contains_key(&edge.from) || !self.symbols.contains_key(&edge.to) {
            return;
        }
        let out = self.out_edges.entry(edge.from.clone()).or_default();
        if out.contains(&edge) {
            return;
        }
        out.push(edge.clone());
        self.in_edges.entry(edge.to.clone()).or_default().push(edge);
    }

    /// Expand every journaled edge into the adjacency maps: bare names via
    /// the name index (zero or more ids each), id targets directly. Called
    /// at the end of a full index and after each incremental batch.
    /// Names that resolve to nothing contribute no edges.
    pub fn resolve_names(&mut self) {
        let mut unresolved = 0usize;
        let journal: Vec<Edge> = self.journal.iter().cloned().collect();

        for edge in journal {
            match &edge.to {
                EdgeTarget::Id(id) => {
                    self.insert_resolved(ResolvedEdge {
                        from: edge.from.clone(),
                        to: id.clone(),
                        kind: edge.kind,
                    });
                }
                EdgeTarget::Name(name) => {
                    let Some(ids) = self.name_to_ids.get(name) else {
                        unresolved += 1;
                        continue;
                    };
                    for id in ids.clone() {
                        self.insert_resolved(ResolvedEdge {
                            from: edge.from.clone(),
                            to: id,
                            kind: edge.kind,
                        });
                    }
                }
            }
        }

        debug!(
            "graph: resolve_names journal={} unresolved={} edges={}",
            self.journal.len(),
            unresolved,
            self.edge_count()
        );
    }

    /// Remove every symbol declared in `path`, every edge touching them,
    /// and the journal entries originating from them.
    pub fn remove_file(&mut self, path: &str) {
        let Some(ids) = self.file_to_symbols.remove(path) else {
            return;
        };
        let removed: HashSet<String> = ids.into_iter().collect();

        for id in &removed {
            // Outgoing edges also live in the target's in-list.
            if let Some(out) = self.out_edges.remove(id) {
                for e in out {
                    if let Some(list) = self.in_edges.get_mut(&e.to) {
                        list.retain(|x| x != &e);
                    }
                }
            }
            // Incoming edges also live in the source's out-list.
            if let Some(inc) = self.in_edges.remove(id) {
                for e in inc {
                    if let Some(list) = self.out_edges.get_mut(&e.from) {
                        list.retain(|x| x != &e);
                    }
                }
            }

            if let Some(sym) = self.symbols.remove(id) {
                if let Some(set) = self.name_to_ids.get_mut(&sym.name) {
                    set.remove(id);
                    if set.is_empty() {
                        self.name_to_ids.remove(&sym.name);
                    }
                }
            }
        }

        self.journal.retain(|e| !removed.contains(&e.from));
        self.out_edges.retain(|_, v| !v.is_empty());
        self.in_edges.retain(|_, v| !v.is_empty());
    }

    /// Symbols reachable within `hops` inbound hops of `id`, in discovery
    /// order, excluding the seed. `hops <= 0` or an unknown seed yields an
    /// empty result. Cycles are tolerated via the visited set.
    pub fn get_callers(&self, id: &str, hops: i32) -> Vec<&Symbol> {
        self.bfs(id, hops, Direction::Inbound)
    }

    /// Symbols reachable within `hops` outbound hops of `id`; same policy
    /// as [`SymbolGraph::get_callers`].
    pub fn get_callees(&self, id: &str, hops: i32) -> Vec<&Symbol> {
        self.bfs(id, hops, Direction::Outbound)
    }

    fn bfs(&self, seed: &str, hops: i32, dir: Direction) -> Vec<&Symbol> {
        if hops <= 0 || !self.symbols.contains_key(seed) {
            return Vec::new();
        }

        let mut visited: HashSet<&str> = HashSet::from([seed]);
        let mut queue: VecDeque<(&str, i32)> = VecDeque::from([(seed, 0)]);
        let mut order: Vec<&Symbol> = Vec::new();

        while let Some((id, depth)) = queue.pop_front() {
            if depth == hops {
                continue;
            }
            for next in self.neighbors(id, dir) {
                if visited.insert(next) {
                    if let Some(sym) = self.symbols.get(next) {
                        order.push(sym);
                    }
                    queue.push_back((next, depth + 1));
                }
            }
        }
        order
    }

    fn neighbors(&self, id: &str, dir: Direction) -> impl Iterator<Item = &str> {
        let (map, pick): (&HashMap<String, Vec<ResolvedEdge>>, fn(&ResolvedEdge) -> &str) =
            match dir {
                Direction::Inbound => (&self.in_edges, |e| e.from.as_str()),
                Direction::Outbound => (&self.out_edges, |e| e.to.as_str()),
            };
        map.get(id).into_iter().flatten().map(pick)
    }

    /// Minimum hop count between `from` and `to` following edges in either
    /// direction, or `None` when no path exists within `max_hops`.
    pub fn undirected_distance(&self, from: &str, to: &str, max_hops: usize) -> Option<usize> {
        if from == to {
            return Some(0);
        }
        if !self.symbols.contains_key(from) || !self.symbols.contains_key(to) {
            return None;
        }

        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(from, 0)]);

        while let Some((id, depth)) = queue.pop_front() {
            if depth == max_hops {
                continue;
            }
            let next_ids: Vec<&str> = self
                .neighbors(id, Direction::Inbound)
                .chain(self.neighbors(id, Direction::Outbound))
                .collect();
            for next in next_ids {
                if next == to {
                    return Some(depth + 1);
                }
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        None
    }

    /// Direct and transitive callers of the changed set, with affected
    /// files and the scalar risk score.
    pub fn get_blast_radius(&self, changed_ids: &[String]) -> BlastRadius {
        let seeds: HashSet<&str> = changed_ids.iter().map(String::as_str).collect();

        let mut direct_ids: Vec<&str> = Vec::new();
        let mut direct_seen: HashSet<&str> = HashSet::new();
        let mut transitive_ids: Vec<&str> = Vec::new();
        let mut transitive_seen: HashSet<&str> = HashSet::new();

        for id in changed_ids {
            for caller in self.get_callers(id, 1) {
                let cid = caller.id.as_str();
                if !seeds.contains(cid) && direct_seen.insert(cid) {
                    direct_ids.push(cid);
                }
            }
        }
        for id in changed_ids {
            for caller in self.get_callers(id, 2) {
                let cid = caller.id.as_str();
                if seeds.contains(cid) || direct_seen.contains(cid) {
                    continue;
                }
                if transitive_seen.insert(cid) {
                    transitive_ids.push(cid);
                }
            }
        }

        let direct_callers: Vec<Symbol> = direct_ids
            .iter()
            .filter_map(|id| self.symbols.get(*id).cloned())
            .collect();
        let transitive_callers: Vec<Symbol> = transitive_ids
            .iter()
            .filter_map(|id| self.symbols.get(*id).cloned())
            .collect();

        let mut affected_files: Vec<String> = Vec::new();
        let mut files_seen: HashSet<&str> = HashSet::new();
        for sym in direct_callers.iter().chain(transitive_callers.iter()) {
            if files_seen.insert(sym.file_path.as_str()) {
                affected_files.push(sym.file_path.clone());
            }
        }

        let risk_score = BlastRadius::score(direct_callers.len(), affected_files.len());
        BlastRadius {
            direct_callers,
            transitive_callers,
            affected_files,
            risk_score,
        }
    }

    /// Resolved edges in deterministic order.
    pub fn resolved_edges(&self) -> Vec<ResolvedEdge> {
        let mut edges: Vec<ResolvedEdge> = self.out_edges.values().flatten().cloned().collect();
        edges.sort();
        edges
    }

    /// Journaled extraction edges in deterministic order, for snapshots.
    pub fn journal_edges(&self) -> Vec<Edge> {
        self.journal.iter().cloned().collect()
    }

    /// Symbols in id order, for snapshots.
    pub fn sorted_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.symbols.values().cloned().collect();
        symbols.sort_by(|a, b| a.id.cmp(&b.id));
        symbols
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Inbound,
    Outbound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeKind, EdgeTarget, SymbolKind};

    fn sym(file: &str, name: &str) -> Symbol {
        Symbol {
            id: Symbol::make_id(file, name),
            file_path: file.to_string(),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: SymbolKind::Function,
            signature: format!("function {name}()"),
            body_range: (1, 5),
            doc_comment: None,
            repo_id: "repo-1".into(),
            branch: "main".into(),
        }
    }

    fn call(g: &mut SymbolGraph, from: &Symbol, to_name: &str) {
        g.add_edge(Edge::new(
            from.id.clone(),
            EdgeTarget::Name(to_name.to_string()),
            EdgeKind::Calls,
        ));
    }

    /// utilA called by handlerB/C/D, handlerB called by routerE.
    fn fixture() -> (SymbolGraph, Symbol) {
        let mut g = SymbolGraph::new();
        let util_a = sym("src/util_a.ts", "utilA");
        let b = sym("src/handler_b.ts", "handlerB");
        let c = sym("src/handler_c.ts", "handlerC");
        let d = sym("src/handler_d.ts", "handlerD");
        let e = sym("src/router_e.ts", "routerE");
        for s in [&util_a, &b, &c, &d, &e] {
            g.add_symbol(s.clone());
        }
        call(&mut g, &b, "utilA");
        call(&mut g, &c, "utilA");
        call(&mut g, &d, "utilA");
        call(&mut g, &e, "handlerB");
        g.resolve_names();
        (g, util_a)
    }

    #[test]
    fn bfs_zero_hops_is_empty_and_monotone() {
        let (g, util_a) = fixture();
        assert!(g.get_callers(&util_a.id, 0).is_empty());
        assert!(g.get_callers(&util_a.id, -3).is_empty());

        for hops in 0..4 {
            let smaller: HashSet<String> = g
                .get_callers(&util_a.id, hops)
                .iter()
                .map(|s| s.id.clone())
                .collect();
            let larger: HashSet<String> = g
                .get_callers(&util_a.id, hops + 1)
                .iter()
                .map(|s| s.id.clone())
                .collect();
            assert!(smaller.is_subset(&larger), "hops={hops}");
        }
    }

    #[test]
    fn bfs_unknown_seed_is_empty() {
        let (g, _) = fixture();
        assert!(g.get_callers("nope.ts:nope", 2).is_empty());
    }

    #[test]
    fn resolved_edges_have_present_endpoints() {
        let (g, _) = fixture();
        for e in g.resolved_edges() {
            assert!(g.symbol(&e.from).is_some());
            assert!(g.symbol(&e.to).is_some());
        }
    }

    #[test]
    fn unresolvable_names_materialize_nothing() {
        let mut g = SymbolGraph::new();
        let a = sym("src/a.ts", "a");
        g.add_symbol(a.clone());
        call(&mut g, &a, "doesNotExist");
        g.resolve_names();
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn blast_radius_scenario() {
        let (g, util_a) = fixture();
        let br = g.get_blast_radius(std::slice::from_ref(&util_a.id));

        let direct: HashSet<&str> = br.direct_callers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(direct, HashSet::from(["handlerB", "handlerC", "handlerD"]));

        let transitive: HashSet<&str> = br
            .transitive_callers
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(transitive, HashSet::from(["routerE"]));

        assert_eq!(br.affected_files.len(), 4);
        assert_eq!(br.risk_score, 50);
    }

    #[test]
    fn risk_score_stays_in_bounds() {
        for direct in 0..30 {
            for files in 0..30 {
                let score = BlastRadius::score(direct, files);
                assert!(score <= 100);
            }
        }
        // Fan-out amplification still applies below the cap.
        assert_eq!(BlastRadius::score(2, 6), 75);
    }

    #[test]
    fn cycles_terminate() {
        let mut g = SymbolGraph::new();
        let a = sym("src/a.py", "alpha");
        let b = sym("src/b.py", "beta");
        g.add_symbol(a.clone());
        g.add_symbol(b.clone());
        call(&mut g, &a, "beta");
        call(&mut g, &b, "alpha");
        g.resolve_names();

        assert_eq!(g.get_callers(&a.id, 10).len(), 1);
        assert_eq!(g.get_callees(&a.id, 10).len(), 1);
    }

    #[test]
    fn remove_file_prunes_edges_and_indices() {
        let (mut g, util_a) = fixture();
        g.remove_file("src/handler_b.ts");

        assert!(g.symbol("src/handler_b.ts:handlerB").is_none());
        // routerE -> handlerB edge must be gone from routerE's out-list.
        assert!(g.get_callees("src/router_e.ts:routerE", 1).is_empty());
        // utilA no longer sees handlerB among callers.
        let callers: HashSet<&str> = g
            .get_callers(&util_a.id, 1)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(callers, HashSet::from(["handlerC", "handlerD"]));
        assert!(g.symbols_in_file("src/handler_b.ts").is_empty());
    }

    #[test]
    fn remove_then_reparse_restores_graph() {
        let (mut g, _) = fixture();
        let before = crate::snapshot::GraphSnapshot::capture(&g);

        // Re-parsing identical bytes yields the same symbol and the same
        // outgoing call edge. Inbound edges re-materialize from the journal.
        let b = sym("src/handler_b.ts", "handlerB");
        g.remove_file("src/handler_b.ts");
        g.add_symbol(b.clone());
        call(&mut g, &b, "utilA");
        g.resolve_names();

        let after = crate::snapshot::GraphSnapshot::capture(&g);
        assert_eq!(before, after);
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut g = SymbolGraph::new();
        let a = sym("src/a.go", "A");
        let b = sym("src/b.go", "B");
        g.add_symbol(a.clone());
        g.add_symbol(b.clone());
        for _ in 0..3 {
            call(&mut g, &a, "B");
        }
        g.resolve_names();
        assert_eq!(g.edge_count(), 1);
    }
}
