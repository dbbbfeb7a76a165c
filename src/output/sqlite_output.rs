//! SQLite sink
//!
//! Records are upserted by RPC, so re-crawling an item replaces its row.
//! Each record row keeps the full JSON document next to a few flattened
//! columns used by statistics queries. Runs are tracked in their own table.

use super::schema::initialize_schema;
use super::traits::{Sink, WriteError, WriteResult};
use crate::catalog::CanonicalRecord;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub records_written: u64,
    pub failures: u64,
}

struct Inner {
    conn: Connection,
    current_run: Option<i64>,
}

pub struct SqliteSink {
    inner: Mutex<Inner>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> WriteResult<Self> {
        let conn = Connection::open(path.as_ref())?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        Self::from_connection(conn)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> WriteResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> WriteResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                current_run: None,
            }),
        })
    }

    fn lock(&self) -> WriteResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| WriteError::Storage(format!("Failed to lock database: {}", e)))
    }

    /// Starts a run; records written afterwards are tagged with its id
    pub fn begin_run(&self, config_hash: &str) -> WriteResult<i64> {
        let mut inner = self.lock()?;
        let now = Utc::now().to_rfc3339();
        inner.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = inner.conn.last_insert_rowid();
        inner.current_run = Some(run_id);
        Ok(run_id)
    }

    /// Closes a run with its final status and counters
    pub fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        records_written: u64,
        failures: u64,
    ) -> WriteResult<()> {
        let mut inner = self.lock()?;
        let now = Utc::now().to_rfc3339();
        inner.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, records_written = ?3, failures = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                records_written as i64,
                failures as i64,
                run_id
            ],
        )?;
        if inner.current_run == Some(run_id) {
            inner.current_run = None;
        }
        Ok(())
    }

    pub fn latest_run(&self) -> WriteResult<Option<RunRecord>> {
        let inner = self.lock()?;
        let run = inner
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, records_written, failures
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                        records_written: row.get::<_, i64>(5)? as u64,
                        failures: row.get::<_, i64>(6)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    pub fn count_records(&self) -> WriteResult<u64> {
        self.count("SELECT COUNT(*) FROM records")
    }

    pub fn count_in_stock(&self) -> WriteResult<u64> {
        self.count("SELECT COUNT(*) FROM records WHERE in_stock = 1")
    }

    pub fn count_on_sale(&self) -> WriteResult<u64> {
        self.count("SELECT COUNT(*) FROM records WHERE price_current < price_original")
    }

    fn count(&self, sql: &str) -> WriteResult<u64> {
        let inner = self.lock()?;
        let count: i64 = inner.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Record counts per section, largest first
    pub fn records_by_section(&self) -> WriteResult<Vec<(String, u64)>> {
        let inner = self.lock()?;
        let mut stmt = inner.conn.prepare(
            "SELECT section, COUNT(*) AS n FROM records GROUP BY section ORDER BY n DESC, section",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Loads a stored record back from its JSON document
    pub fn get_record(&self, rpc: &str) -> WriteResult<Option<CanonicalRecord>> {
        let inner = self.lock()?;
        let document: Option<String> = inner
            .conn
            .query_row(
                "SELECT document FROM records WHERE rpc = ?1",
                [rpc],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Sink for SqliteSink {
    async fn write(&self, record: &CanonicalRecord) -> WriteResult<()> {
        let document = serde_json::to_string(record)?;
        let inner = self.lock()?;
        inner.conn.execute(
            "INSERT INTO records (rpc, url, title, brand, section, price_current, price_original,
                                  sale_tag, in_stock, stock_count, variants, scraped_at, run_id, document)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(rpc) DO UPDATE SET
                url = excluded.url,
                title = excluded.title,
                brand = excluded.brand,
                section = excluded.section,
                price_current = excluded.price_current,
                price_original = excluded.price_original,
                sale_tag = excluded.sale_tag,
                in_stock = excluded.in_stock,
                stock_count = excluded.stock_count,
                variants = excluded.variants,
                scraped_at = excluded.scraped_at,
                run_id = excluded.run_id,
                document = excluded.document",
            params![
                record.rpc,
                record.url,
                record.title,
                record.brand,
                record.section,
                record.price_data.current,
                record.price_data.original,
                record.price_data.sale_tag,
                record.stock.in_stock,
                record.stock.count as i64,
                record.variants as i64,
                record.timestamp,
                inner.current_run,
                document
            ],
        )?;
        Ok(())
    }

    async fn flush(&self) -> WriteResult<()> {
        let inner = self.lock()?;
        // Fold the WAL back into the main file
        inner
            .conn
            .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        Ok(())
    }
}
