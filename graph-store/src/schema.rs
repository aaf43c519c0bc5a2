//! Database schema. Executed as one idempotent batch at open.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS symbols (
    id TEXT NOT NULL,
    repo_id TEXT NOT NULL,
    branch TEXT NOT NULL,
    file_path TEXT NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    signature TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    doc_comment TEXT,
    PRIMARY KEY (id, repo_id, branch)
);

CREATE INDEX IF NOT EXISTS idx_symbols_file
    ON symbols(repo_id, branch, file_path);

CREATE TABLE IF NOT EXISTS edges (
    repo_id TEXT NOT NULL,
    branch TEXT NOT NULL,
    from_id TEXT NOT NULL,
    to_target TEXT NOT NULL,
    target_kind TEXT NOT NULL,
    kind TEXT NOT NULL,
    source_file TEXT NOT NULL,
    PRIMARY KEY (repo_id, branch, from_id, to_target, target_kind, kind)
);

CREATE INDEX IF NOT EXISTS idx_edges_file
    ON edges(repo_id, branch, source_file);

CREATE TABLE IF NOT EXISTS graph_snapshots (
    repo_id TEXT NOT NULL,
    branch TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (repo_id, branch)
);

CREATE TABLE IF NOT EXISTS symbol_embeddings (
    symbol_id TEXT NOT NULL,
    repo_id TEXT NOT NULL,
    branch TEXT NOT NULL,
    vec TEXT NOT NULL,
    PRIMARY KEY (symbol_id, repo_id, branch)
);

CREATE TABLE IF NOT EXISTS reviews (
    repo_id TEXT NOT NULL,
    pr_id TEXT NOT NULL,
    head_sha TEXT NOT NULL,
    verdict TEXT NOT NULL,
    summary TEXT NOT NULL,
    comment_count INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (repo_id, pr_id, head_sha)
);

CREATE TABLE IF NOT EXISTS review_comments (
    id TEXT PRIMARY KEY,
    repo_id TEXT NOT NULL,
    pr_id TEXT NOT NULL,
    path TEXT NOT NULL,
    line INTEGER NOT NULL,
    body TEXT NOT NULL,
    severity TEXT NOT NULL,
    confidence REAL,
    embedding TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_review_comments_repo
    ON review_comments(repo_id);

CREATE TABLE IF NOT EXISTS review_feedback (
    comment_id TEXT PRIMARY KEY,
    signal TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
"#;
