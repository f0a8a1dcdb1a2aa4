//! Handing finished tickets to the host as downloads

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};

use crate::{Error, RenderOutcome, Result};

/// Where a delivered download ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReceipt {
    pub filename: String,
    /// Filesystem path, when the sink writes to disk
    pub path: Option<PathBuf>,
    pub size: usize,
}

/// The host's "save file" interaction.
pub trait DownloadSink {
    fn deliver(&self, outcome: &RenderOutcome) -> impl Future<Output = Result<DownloadReceipt>> + Send;
}

/// Writes downloads into a directory.
///
/// Bytes go to `<name>.part` first and are renamed into place, so a failed
/// write never leaves a truncated ticket behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Removes the temporary file on drop unless disarmed.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial download {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

impl DownloadSink for DirectorySink {
    async fn deliver(&self, outcome: &RenderOutcome) -> Result<DownloadReceipt> {
        let target = self.dir.join(&outcome.filename);
        let mut partial = PartialFile {
            path: self.dir.join(format!("{}.part", outcome.filename)),
            armed: true,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::DownloadFailed(format!("cannot create {}: {}", self.dir.display(), e)))?;
        tokio::fs::write(&partial.path, &outcome.bytes)
            .await
            .map_err(|e| Error::DownloadFailed(format!("cannot write {}: {}", partial.path.display(), e)))?;
        debug!("wrote {} bytes to {}", outcome.bytes.len(), partial.path.display());
        tokio::fs::rename(&partial.path, &target)
            .await
            .map_err(|e| Error::DownloadFailed(format!("cannot move into {}: {}", target.display(), e)))?;
        partial.armed = false;

        info!("Saved {} ({} bytes)", target.display(), outcome.bytes.len());
        Ok(DownloadReceipt {
            filename: outcome.filename.clone(),
            path: Some(target),
            size: outcome.bytes.len(),
        })
    }
}

/// Keeps delivered downloads in memory, in delivery order.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filenames and payloads delivered so far.
    pub fn delivered(&self) -> Vec<(String, Vec<u8>)> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl DownloadSink for MemorySink {
    async fn deliver(&self, outcome: &RenderOutcome) -> Result<DownloadReceipt> {
        self.delivered
            .lock()
            .map_err(|_| Error::DownloadFailed("memory sink poisoned".into()))?
            .push((outcome.filename.clone(), outcome.bytes.clone()));
        Ok(DownloadReceipt {
            filename: outcome.filename.clone(),
            path: None,
            size: outcome.bytes.len(),
        })
    }
}
