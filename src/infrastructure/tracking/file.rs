//! JSON lines file tracking sink

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::tracking::{TrackingEvent, TrackingSink};
use crate::domain::DomainError;

/// Appends one JSON object per event to a file. The file is opened lazily
/// on the first event.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<File, DomainError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to open tracking file '{}': {}",
                    self.path.display(),
                    e
                ))
            })
    }
}

#[async_trait]
impl TrackingSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn track(&self, event: TrackingEvent) -> Result<(), DomainError> {
        let mut line = serde_json::to_vec(&event)
            .map_err(|e| DomainError::internal(format!("Failed to serialize event: {}", e)))?;
        line.push(b'\n');

        let mut guard = self.file.lock().await;

        if guard.is_none() {
            *guard = Some(self.open().await?);
        }

        if let Some(file) = guard.as_mut() {
            file.write_all(&line)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to write event: {}", e)))?;
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), DomainError> {
        if let Some(file) = self.file.lock().await.as_mut() {
            file.flush()
                .await
                .map_err(|e| DomainError::storage(format!("Failed to flush events: {}", e)))?;
        }
        Ok(())
    }
}
