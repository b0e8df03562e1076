//! Queue snapshot persistence
//!
//! [`JsonFileStore`] keeps the snapshot in a single JSON file.
//! [`PersistenceWriter`] decouples the player from storage latency: the
//! player publishes snapshots into a watch channel and a background task
//! saves whatever is newest, so bursts of mutations collapse into one write.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tandem_core::{PersistedQueue, PersistenceStore, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// [`PersistenceStore`] writing one JSON file
///
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn save(&self, snapshot: &PersistedQueue) -> Result<()> {
        if snapshot.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "Removed queue snapshot");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(snapshot)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(
            path = %self.path.display(),
            tracks = snapshot.tracks.len(),
            cursor = ?snapshot.cursor,
            "Saved queue snapshot"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedQueue>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: PersistedQueue = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot).filter(|s| !s.is_empty()))
    }
}

/// Background writer with last-writer-wins coalescing
pub struct PersistenceWriter {
    tx: watch::Sender<PersistedQueue>,
    task: JoinHandle<()>,
}

impl PersistenceWriter {
    /// Spawn the writer task on the current runtime
    pub fn spawn(store: Arc<dyn PersistenceStore>) -> Self {
        let (tx, mut rx) = watch::channel(PersistedQueue::default());

        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                if let Err(e) = store.save(&snapshot).await {
                    error!(error = %e, "Failed to persist queue");
                }
            }
            debug!("Persistence writer stopped");
        });

        Self { tx, task }
    }

    /// Queue `snapshot` for writing, replacing any unwritten one
    pub fn publish(&self, snapshot: PersistedQueue) {
        self.tx.send_replace(snapshot);
    }

    /// Write the last published snapshot and stop the task
    pub async fn close(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(e) = task.await {
            warn!(error = %e, "Persistence writer ended abnormally");
        }
    }
}
