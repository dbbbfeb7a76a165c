use super::traits::{Sink, WriteResult};
use crate::catalog::CanonicalRecord;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// Sink that keeps records in memory, in write order
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CanonicalRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CanonicalRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&self, record: &CanonicalRecord) -> WriteResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}
