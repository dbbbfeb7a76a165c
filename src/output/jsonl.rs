//! JSON Lines sink
//!
//! One compact JSON object per line, UTF-8, non-ASCII text kept as-is.
//! The file is opened in append mode so repeated runs accumulate.

use super::traits::{Sink, WriteResult};
use crate::catalog::CanonicalRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Opens (or creates) the output file, creating parent directories
    pub async fn open(path: impl AsRef<Path>) -> WriteResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::debug!("Writing records to {}", path.display());

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for JsonLinesSink {
    async fn write(&self, record: &CanonicalRecord) -> WriteResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        Ok(())
    }

    async fn flush(&self) -> WriteResult<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}
