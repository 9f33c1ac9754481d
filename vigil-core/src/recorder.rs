//! Event sink contract.
//!
//! The pipeline appends every finished event envelope through an
//! [`EventRecorder`] and never reads anything back. Appends are best-effort
//! from the pipeline's point of view: a failure is logged by the caller and
//! the record dropped, never retried or queued.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use vigil_model::EventRecord;

use crate::error::Result;

/// Append-only sink for finished event records.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn append(&self, record: EventRecord) -> Result<()>;
}

/// In-memory sink for tests and embedding hosts that drain records
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryEventRecorder {
    records: Mutex<Vec<EventRecord>>,
}

impl MemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, in append order.
    pub async fn records(&self) -> Vec<EventRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl EventRecorder for MemoryEventRecorder {
    async fn append(&self, record: EventRecord) -> Result<()> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Append-only JSON-lines file sink, one record per line.
///
/// A stand-in for the external durable event store when embedding without
/// one; the file is only ever appended to, matching the sink contract.
pub struct JsonlEventRecorder {
    path: PathBuf,
}

impl JsonlEventRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl fmt::Debug for JsonlEventRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonlEventRecorder")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl EventRecorder for JsonlEventRecorder {
    async fn append(&self, record: EventRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
