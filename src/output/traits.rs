//! Sink trait and write errors

use crate::catalog::CanonicalRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while persisting records
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for sink operations
pub type WriteResult<T> = Result<T, WriteError>;

/// Destination of canonical records
///
/// Sinks are shared by every detail worker of a run, so implementations
/// must serialize concurrent writes themselves. A failed write is reported
/// for that record only; the crawl keeps going.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persists one record
    async fn write(&self, record: &CanonicalRecord) -> WriteResult<()>;

    /// Makes every written record durable; called once when a run ends
    async fn flush(&self) -> WriteResult<()> {
        Ok(())
    }
}
