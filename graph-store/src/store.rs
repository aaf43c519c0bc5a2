//! The storage adapter proper.
//!
//! A single `rusqlite::Connection` behind an async mutex; operations take
//! the lock, run synchronously and return. Batch writes run inside one
//! transaction so a file-level replace is atomic.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;
use tracing::debug;

use code_graph::{Edge, EdgeKind, EdgeTarget, Symbol, SymbolKind};

use crate::errors::{StoreError, StoreResult};
use crate::records::{FeedbackSignal, RatedComment, ReviewCommentRecord, ReviewRecord};
use crate::schema::SCHEMA;

/// SQLite-backed storage, cheap to clone.
#[derive(Clone)]
pub struct GraphStore {
    conn: Arc<Mutex<Connection>>,
}

impl GraphStore {
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;
        debug!("store: schema ready at {}", db_path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ------------------------------------------------------------------
    // Symbols and edges
    // ------------------------------------------------------------------

    pub async fn upsert_symbols(&self, symbols: &[Symbol]) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                r#"INSERT OR REPLACE INTO symbols
                   (id, repo_id, branch, file_path, name, qualified_name, kind,
                    signature, start_line, end_line, doc_comment)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            )?;
            for s in symbols {
                stmt.execute(params![
                    s.id,
                    s.repo_id,
                    s.branch,
                    s.file_path,
                    s.name,
                    s.qualified_name,
                    s.kind.to_string(),
                    s.signature,
                    s.body_range.0,
                    s.body_range.1,
                    s.doc_comment,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub async fn upsert_edges(
        &self,
        repo_id: &str,
        branch: &str,
        edges: &[Edge],
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                r#"INSERT OR REPLACE INTO edges
                   (repo_id, branch, from_id, to_target, target_kind, kind, source_file)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )?;
            for e in edges {
                let (target, target_kind) = match &e.to {
                    EdgeTarget::Name(n) => (n.as_str(), "name"),
                    EdgeTarget::Id(i) => (i.as_str(), "id"),
                };
                let source_file = e.from.split(':').next().unwrap_or_default();
                stmt.execute(params![
                    repo_id,
                    branch,
                    e.from,
                    target,
                    target_kind,
                    e.kind.to_string(),
                    source_file,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub async fn load_symbols(&self, repo_id: &str, branch: &str) -> StoreResult<Vec<Symbol>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT id, file_path, name, qualified_name, kind, signature,
                      start_line, end_line, doc_comment
               FROM symbols WHERE repo_id = ?1 AND branch = ?2 ORDER BY id"#,
        )?;
        let rows = stmt.query_map(params![repo_id, branch], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, u32>(6)?,
                row.get::<_, u32>(7)?,
                row.get::<_, Option<String>>(8)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, file_path, name, qualified_name, kind, signature, start, end, doc) = row?;
            let kind = SymbolKind::from_str(&kind).map_err(StoreError::CorruptRow)?;
            out.push(Symbol {
                id,
                file_path,
                name,
                qualified_name,
                kind,
                signature,
                body_range: (start, end),
                doc_comment: doc,
                repo_id: repo_id.to_string(),
                branch: branch.to_string(),
            });
        }
        Ok(out)
    }

    pub async fn load_edges(&self, repo_id: &str, branch: &str) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT from_id, to_target, target_kind, kind
               FROM edges WHERE repo_id = ?1 AND branch = ?2
               ORDER BY from_id, to_target, kind"#,
        )?;
        let rows = stmt.query_map(params![repo_id, branch], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (from, target, target_kind, kind) = row?;
            let kind = EdgeKind::from_str(&kind).map_err(StoreError::CorruptRow)?;
            let to = match target_kind.as_str() {
                "id" => EdgeTarget::Id(target),
                _ => EdgeTarget::Name(target),
            };
            out.push(Edge { from, to, kind });
        }
        Ok(out)
    }

    /// Delete one file's symbols, edges and embeddings in one transaction.
    pub async fn delete_file_rows(
        &self,
        repo_id: &str,
        branch: &str,
        file_path: &str,
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM symbols WHERE repo_id = ?1 AND branch = ?2 AND file_path = ?3",
            params![repo_id, branch, file_path],
        )?;
        tx.execute(
            "DELETE FROM edges WHERE repo_id = ?1 AND branch = ?2 AND source_file = ?3",
            params![repo_id, branch, file_path],
        )?;
        tx.execute(
            "DELETE FROM symbol_embeddings
             WHERE repo_id = ?1 AND branch = ?2 AND symbol_id LIKE ?3 || ':%'",
            params![repo_id, branch, file_path],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Drop everything a repository ever stored (deregistration).
    pub async fn delete_repo(&self, repo_id: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for table in [
            "symbols",
            "edges",
            "graph_snapshots",
            "symbol_embeddings",
            "reviews",
            "review_comments",
        ] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE repo_id = ?1"),
                params![repo_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub async fn save_snapshot(
        &self,
        repo_id: &str,
        branch: &str,
        data: &str,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT OR REPLACE INTO graph_snapshots (repo_id, branch, data, updated_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![repo_id, branch, data, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub async fn load_snapshot(&self, repo_id: &str, branch: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().await;
        let data = conn
            .query_row(
                "SELECT data FROM graph_snapshots WHERE repo_id = ?1 AND branch = ?2",
                params![repo_id, branch],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(data)
    }

    // ------------------------------------------------------------------
    // Symbol embeddings
    // ------------------------------------------------------------------

    pub async fn upsert_embedding(
        &self,
        symbol_id: &str,
        repo_id: &str,
        branch: &str,
        vec: &[f32],
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT OR REPLACE INTO symbol_embeddings (symbol_id, repo_id, branch, vec)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![symbol_id, repo_id, branch, serde_json::to_string(vec)?],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reviews, comments, feedback
    // ------------------------------------------------------------------

    pub async fn save_review(&self, review: &ReviewRecord) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT OR REPLACE INTO reviews
               (repo_id, pr_id, head_sha, verdict, summary, comment_count, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                review.repo_id,
                review.pr_id,
                review.head_sha,
                review.verdict,
                review.summary,
                review.comment_count,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    pub async fn save_review_comment(&self, comment: &ReviewCommentRecord) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let embedding = comment
            .embedding
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO review_comments
               (id, repo_id, pr_id, path, line, body, severity, confidence, embedding, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                comment.id,
                comment.repo_id,
                comment.pr_id,
                comment.path,
                comment.line,
                comment.body,
                comment.severity,
                comment.confidence,
                embedding,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Record a feedback click. The most recent signal wins on conflict;
    /// signals are never deleted.
    pub async fn upsert_feedback(
        &self,
        comment_id: &str,
        signal: FeedbackSignal,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT OR REPLACE INTO review_feedback (comment_id, signal, created_at)
               VALUES (?1, ?2, ?3)"#,
            params![comment_id, signal.as_str(), chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Comments joined with their feedback signal, scoped to one repo.
    pub async fn load_rated_comments(&self, repo_id: &str) -> StoreResult<Vec<RatedComment>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT c.id, c.path, c.line, c.body, f.signal, c.embedding
               FROM review_comments c
               JOIN review_feedback f ON f.comment_id = c.id
               WHERE c.repo_id = ?1
               ORDER BY f.created_at DESC"#,
        )?;
        let rows = stmt.query_map(params![repo_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, path, line, body, signal, embedding) = row?;
            let Some(signal) = FeedbackSignal::parse(&signal) else {
                return Err(StoreError::CorruptRow(format!(
                    "unknown feedback signal: {signal}"
                )));
            };
            let embedding = embedding
                .map(|e| serde_json::from_str::<Vec<f32>>(&e))
                .transpose()?;
            out.push(RatedComment {
                id,
                path,
                line,
                body,
                signal,
                embedding,
            });
        }
        Ok(out)
    }

    /// Dedup ids of every comment already posted on a PR.
    pub async fn comment_ids_for_pr(
        &self,
        repo_id: &str,
        pr_id: &str,
    ) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id FROM review_comments WHERE repo_id = ?1 AND pr_id = ?2",
        )?;
        let rows = stmt.query_map(params![repo_id, pr_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_graph::{Edge, EdgeKind, EdgeTarget, SymbolKind};

    fn sym(file: &str, name: &str) -> Symbol {
        Symbol {
            id: Symbol::make_id(file, name),
            file_path: file.into(),
            name: name.into(),
            qualified_name: name.into(),
            kind: SymbolKind::Function,
            signature: format!("fn {name}()"),
            body_range: (1, 4),
            doc_comment: None,
            repo_id: "repo-1".into(),
            branch: "main".into(),
        }
    }

    #[tokio::test]
    async fn symbols_and_edges_round_trip() {
        let store = GraphStore::in_memory().unwrap();
        let a = sym("src/a.ts", "alpha");
        let b = sym("src/b.ts", "beta");
        store.upsert_symbols(&[a.clone(), b.clone()]).await.unwrap();
        store
            .upsert_edges(
                "repo-1",
                "main",
                &[Edge::new(
                    a.id.clone(),
                    EdgeTarget::Name("beta".into()),
                    EdgeKind::Calls,
                )],
            )
            .await
            .unwrap();

        let symbols = store.load_symbols("repo-1", "main").await.unwrap();
        assert_eq!(symbols.len(), 2);
        let edges = store.load_edges("repo-1", "main").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, EdgeTarget::Name("beta".into()));
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = GraphStore::in_memory().unwrap();
        let a = sym("src/a.ts", "alpha");
        store.upsert_symbols(&[a.clone()]).await.unwrap();
        store.upsert_symbols(&[a.clone()]).await.unwrap();
        assert_eq!(store.load_symbols("repo-1", "main").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_scoped_delete() {
        let store = GraphStore::in_memory().unwrap();
        let a = sym("src/a.ts", "alpha");
        let b = sym("src/b.ts", "beta");
        store.upsert_symbols(&[a.clone(), b.clone()]).await.unwrap();
        store
            .upsert_edges(
                "repo-1",
                "main",
                &[Edge::new(
                    a.id.clone(),
                    EdgeTarget::Name("beta".into()),
                    EdgeKind::Calls,
                )],
            )
            .await
            .unwrap();
        store
            .upsert_embedding(&a.id, "repo-1", "main", &[0.1, 0.2])
            .await
            .unwrap();

        store
            .delete_file_rows("repo-1", "main", "src/a.ts")
            .await
            .unwrap();

        let symbols = store.load_symbols("repo-1", "main").await.unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].file_path, "src/b.ts");
        assert!(store.load_edges("repo-1", "main").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let store = GraphStore::in_memory().unwrap();
        assert!(store.load_snapshot("r", "main").await.unwrap().is_none());
        store.save_snapshot("r", "main", "{\"x\":1}").await.unwrap();
        store.save_snapshot("r", "main", "{\"x\":2}").await.unwrap();
        assert_eq!(
            store.load_snapshot("r", "main").await.unwrap().as_deref(),
            Some("{\"x\":2}")
        );
    }

    #[tokio::test]
    async fn latest_feedback_wins() {
        let store = GraphStore::in_memory().unwrap();
        store
            .save_review_comment(&ReviewCommentRecord {
                id: "c1".into(),
                repo_id: "r".into(),
                pr_id: "7".into(),
                path: "src/a.ts".into(),
                line: 3,
                body: "Use a constant here.".into(),
                severity: "info".into(),
                confidence: Some(0.9),
                embedding: Some(vec![0.5, 0.5]),
            })
            .await
            .unwrap();

        store
            .upsert_feedback("c1", FeedbackSignal::Accepted)
            .await
            .unwrap();
        store
            .upsert_feedback("c1", FeedbackSignal::Rejected)
            .await
            .unwrap();

        let rated = store.load_rated_comments("r").await.unwrap();
        assert_eq!(rated.len(), 1);
        assert_eq!(rated[0].signal, FeedbackSignal::Rejected);
        assert_eq!(rated[0].embedding.as_deref(), Some(&[0.5, 0.5][..]));
    }

    #[tokio::test]
    async fn repo_scoped_delete_evicts_everything() {
        let store = GraphStore::in_memory().unwrap();
        let a = sym("src/a.ts", "alpha");
        store.upsert_symbols(&[a.clone()]).await.unwrap();
        store.save_snapshot("repo-1", "main", "{}").await.unwrap();
        store.delete_repo("repo-1").await.unwrap();
        assert!(store.load_symbols("repo-1", "main").await.unwrap().is_empty());
        assert!(store.load_snapshot("repo-1", "main").await.unwrap().is_none());
    }
}
