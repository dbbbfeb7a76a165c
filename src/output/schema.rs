//! Database schema for the SQLite sink

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    records_written INTEGER NOT NULL DEFAULT 0,
    failures INTEGER NOT NULL DEFAULT 0
);

-- One row per item, keyed by RPC; later runs overwrite earlier ones
CREATE TABLE IF NOT EXISTS records (
    rpc TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    brand TEXT NOT NULL,
    section TEXT NOT NULL,
    price_current REAL NOT NULL,
    price_original REAL NOT NULL,
    sale_tag TEXT NOT NULL,
    in_stock INTEGER NOT NULL,
    stock_count INTEGER NOT NULL,
    variants INTEGER NOT NULL,
    scraped_at INTEGER NOT NULL,
    run_id INTEGER REFERENCES runs(id),
    document TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_section ON records(section);
CREATE INDEX IF NOT EXISTS idx_records_run ON records(run_id);
"#;

/// Initializes the database schema; safe to run on an existing database
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
