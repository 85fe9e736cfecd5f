/// Schema shared by the page-side key-value store and the worker's cache buckets.
pub const SCHEMA: &str = r#"
-- Page-local persistent key-value storage
CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Named cache generations
CREATE TABLE IF NOT EXISTS cache_buckets (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored response snapshots, keyed by request URL
CREATE TABLE IF NOT EXISTS cache_entries (
    bucket TEXT NOT NULL,
    url_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    response_type TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (bucket, url_hash),
    FOREIGN KEY (bucket) REFERENCES cache_buckets(name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_hash ON cache_entries(url_hash);
"#;
