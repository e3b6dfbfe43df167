//! Append-only JSON log implementation of the link repository.
//!
//! # File Format
//!
//! One JSON object per line:
//!
//! ```text
//! {"code":"AbC123","url":"https://a.example/","user":"user-1"}
//! ```
//!
//! The whole file is replayed into memory on open. Lines that fail to parse
//! (for example a record cut short by a crash, even mid-character) are skipped
//! with a warning.
//!
//! # Limitations
//!
//! Tombstones are applied in memory only and are never written to the log,
//! so links deleted before a restart become resolvable again after it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::memory_link_repository::LinkTable;
use crate::domain::entities::{DeleteRequest, ShortLink, Stats};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// On-disk representation of one created link.
#[derive(Debug, Serialize, Deserialize)]
struct LogRecord {
    code: String,
    url: String,
    #[serde(default)]
    user: String,
}

impl From<&ShortLink> for LogRecord {
    fn from(link: &ShortLink) -> Self {
        Self {
            code: link.code.clone(),
            url: link.url.clone(),
            user: link.owner.clone(),
        }
    }
}

impl From<LogRecord> for ShortLink {
    fn from(record: LogRecord) -> Self {
        ShortLink::new(record.code, record.url, record.user)
    }
}

/// The table and the log file share one lock so that memory and disk never
/// disagree about which links were acknowledged.
struct FileState {
    table: LinkTable,
    file: File,
    /// Length of the log up to the last acknowledged record.
    len: u64,
}

impl FileState {
    /// Writes `links` as log lines and forces them to disk.
    ///
    /// On failure the file is cut back to its last acknowledged length, so a
    /// rejected record never shows up on the next replay.
    async fn append(&mut self, links: &[ShortLink]) -> Result<(), AppError> {
        let mut buf = Vec::new();
        for link in links {
            serde_json::to_writer(&mut buf, &LogRecord::from(link))?;
            buf.push(b'\n');
        }

        if let Err(e) = self.write_synced(&buf).await {
            if let Err(truncate) = self.file.set_len(self.len).await {
                warn!(error = %truncate, len = self.len, "Failed to roll back log file");
            }
            return Err(e.into());
        }

        self.len += buf.len() as u64;
        Ok(())
    }

    async fn write_synced(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file.write_all(buf).await?;
        self.file.flush().await?;
        self.file.sync_data().await
    }
}

/// Store backed by an append-only newline-delimited JSON file.
///
/// A `set` is acknowledged only after its record has been flushed and synced,
/// so every acknowledged link survives a restart.
pub struct FileLinkRepository {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileLinkRepository {
    /// Opens (or creates) the log at `path` and replays it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BackendUnavailable`] if the file cannot be opened or
    /// read. Malformed lines are not errors.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|e| {
                AppError::backend(format!("failed to open log file {}", path.display()), e)
            })?;

        let (table, mut file, needs_newline) = replay(file).await?;
        info!(
            path = %path.display(),
            links = table.len(),
            "Replayed short link log"
        );

        if needs_newline {
            // Terminate a torn final record so the next append starts on a fresh line.
            file.write_all(b"\n").await?;
            file.flush().await?;
        }
        let len = file.metadata().await?.len();

        Ok(Self {
            path,
            state: Mutex::new(FileState { table, file, len }),
        })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Rebuilds the link table from the log.
///
/// Returns the table, the file handle positioned for appending, and whether
/// the file ends without a trailing newline.
async fn replay(file: File) -> Result<(LinkTable, File, bool), AppError> {
    let mut reader = BufReader::new(file);
    let mut table = LinkTable::default();
    let mut line = Vec::new();
    let mut line_no = 0usize;
    let mut ends_with_newline = true;

    // Raw bytes: a record torn inside a multi-byte character is not valid UTF-8.
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).await?;
        if read == 0 {
            break;
        }
        line_no += 1;
        ends_with_newline = line.last() == Some(&b'\n');

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_slice::<LogRecord>(trimmed) {
            Ok(record) if !record.code.is_empty() => table.restore(record.into()),
            Ok(_) => warn!(line = line_no, "Skipping log record without code"),
            Err(e) => warn!(line = line_no, error = %e, "Skipping malformed log record"),
        }
    }

    Ok((table, reader.into_inner(), !ends_with_newline))
}

#[async_trait]
impl LinkRepository for FileLinkRepository {
    async fn get(&self, code: &str) -> Result<ShortLink, AppError> {
        self.state.lock().await.table.get(code)
    }

    async fn set(&self, link: ShortLink) -> Result<ShortLink, AppError> {
        let mut state = self.state.lock().await;

        state.table.check_insert(&link)?;
        state.append(std::slice::from_ref(&link)).await?;
        state.table.insert(link.clone());

        debug!(code = %link.code, "Appended short link to log");
        Ok(link)
    }

    async fn set_batch(&self, links: Vec<ShortLink>) -> Result<Vec<ShortLink>, AppError> {
        if links.is_empty() {
            return Ok(links);
        }

        let mut state = self.state.lock().await;

        state.table.check_batch(&links)?;
        state.append(&links).await?;
        for link in &links {
            state.table.insert(link.clone());
        }

        debug!(rows = links.len(), "Appended short link batch to log");
        Ok(links)
    }

    async fn get_batch_by_owner(&self, owner: &str) -> Result<Vec<ShortLink>, AppError> {
        Ok(self.state.lock().await.table.by_owner(owner))
    }

    async fn delete_batch(&self, requests: Vec<DeleteRequest>) -> Result<(), AppError> {
        // Memory-only: the log has no tombstone records.
        let deleted = self.state.lock().await.table.tombstone(&requests);

        debug!(
            requested = requests.len(),
            deleted, "Tombstoned short links (not persisted)"
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn stats(&self) -> Result<Stats, AppError> {
        Ok(self.state.lock().await.table.stats())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
