//! Append-only checkpoint of settled records.
//!
//! A single writer task owns the file; judge tasks send it records through
//! a channel. Each record is one JSON line, flushed as soon as it arrives.

use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use super::output::OutputRecord;
use crate::error::DataError;

const CHANNEL_CAPACITY: usize = 64;

/// Checkpoint file used for `output`: `<output>.partial.jsonl`.
pub fn checkpoint_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial.jsonl");
    output.with_file_name(name)
}

/// Handle to the background writer.
pub struct CheckpointWriter {
    path: PathBuf,
    tx: mpsc::Sender<OutputRecord>,
    handle: JoinHandle<Result<usize, DataError>>,
}

impl CheckpointWriter {
    /// Opens `path` for appending and starts the writer task.
    pub async fn open(path: &Path) -> Result<Self, DataError> {
        let write_error = |source| DataError::Write {
            path: path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(write_error)?;

        let (tx, mut rx) = mpsc::channel::<OutputRecord>(CHANNEL_CAPACITY);
        let display = path.display().to_string();

        let handle = tokio::spawn(async move {
            let mut written = 0usize;
            while let Some(record) = rx.recv().await {
                let mut line = serde_json::to_string(&record)?;
                line.push('\n');
                let write_error = |source| DataError::Write {
                    path: display.clone(),
                    source,
                };
                file.write_all(line.as_bytes()).await.map_err(write_error)?;
                file.flush().await.map_err(write_error)?;
                written += 1;
            }
            Ok::<usize, DataError>(written)
        });

        Ok(Self {
            path: path.to_path_buf(),
            tx,
            handle,
        })
    }

    /// Sender for judge tasks. Sends fail only if the writer has stopped.
    pub fn sender(&self) -> mpsc::Sender<OutputRecord> {
        self.tx.clone()
    }

    /// Closes the channel and waits for every queued record to be written.
    pub async fn finish(self) -> Result<usize, DataError> {
        drop(self.tx);
        self.handle.await.map_err(|e| DataError::Write {
            path: self.path.display().to_string(),
            source: std::io::Error::other(e),
        })?
    }
}

/// Reads a checkpoint, skipping lines that do not parse.
///
/// A run killed mid-write can leave a truncated last line; that record is
/// simply judged again.
pub fn read_checkpoint(path: &Path) -> Result<Vec<OutputRecord>, DataError> {
    let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<OutputRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                path = %path.display(),
                line = line_no + 1,
                error = %e,
                "Skipping unreadable checkpoint line"
            ),
        }
    }
    Ok(records)
}
