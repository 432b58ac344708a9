//! Local filesystem dedup store.
//!
//! Records are kept as JSON Lines: each publish appends exactly one line and
//! nothing is ever rewritten. The whole table is read once when the store is
//! opened, so lookups during a run never touch the disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::PublishRecord;
use crate::storage::{RecordStore, window_start};

/// State of the file's last line after opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    /// Ends with a newline
    Clean,
    /// A complete row without its newline
    Unterminated,
    /// A partial row; the file is cut back to `keep` bytes
    Torn { keep: u64 },
}

/// Local filesystem storage backend.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    records: Vec<PublishRecord>,
}

impl LocalStorage {
    /// Open the records file, creating it and its directory if absent.
    ///
    /// Fails when the file cannot be read or a row is not a publish record.
    pub async fn initialize(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Self::ensure_dir(&path).await?;

        // Touch the file so later appends and `info` see a table.
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::storage(format!("cannot open {}: {e}", path.display())))?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::storage(format!("cannot read {}: {e}", path.display())))?;

        let (records, tail) = Self::parse_rows(&path, &content)?;
        Self::repair_tail(&path, tail).await?;
        log::debug!(
            "Opened dedup store {} with {} record(s)",
            path.display(),
            records.len()
        );

        Ok(Self { path, records })
    }

    /// Location of the records file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of rows inside the dedup window ending at `now`.
    pub fn count_since(&self, now: DateTime<Utc>) -> usize {
        let start = window_start(now);
        self.records
            .iter()
            .filter(|r| r.publish_timestamp >= start)
            .count()
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        Ok(())
    }

    /// Parse every row; only the last line may be incomplete.
    ///
    /// A run killed mid-append leaves a final line without its newline. If
    /// that line still parses it is kept, otherwise it is dropped. Any other
    /// bad row is a schema conflict.
    fn parse_rows(path: &Path, content: &str) -> Result<(Vec<PublishRecord>, Tail)> {
        let complete_len = content.rfind('\n').map_or(0, |idx| idx + 1);
        let (complete, rest) = content.split_at(complete_len);

        let mut records = complete
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<PublishRecord>(line).map_err(|e| {
                    AppError::storage(format!(
                        "{}:{}: row does not match the record schema: {e}",
                        path.display(),
                        idx + 1
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if rest.trim().is_empty() {
            return Ok((records, Tail::Clean));
        }

        match serde_json::from_str::<PublishRecord>(rest) {
            Ok(record) => {
                records.push(record);
                Ok((records, Tail::Unterminated))
            }
            Err(e) => {
                log::warn!(
                    "Dropping incomplete last row of {}: {e}",
                    path.display()
                );
                Ok((records, Tail::Torn { keep: complete_len as u64 }))
            }
        }
    }

    /// Bring the file back to whole lines so the next append starts clean.
    async fn repair_tail(path: &Path, tail: Tail) -> Result<()> {
        let repair_err =
            |e: std::io::Error| AppError::storage(format!("cannot repair {}: {e}", path.display()));

        match tail {
            Tail::Clean => {}
            Tail::Unterminated => {
                let mut file = tokio::fs::OpenOptions::new()
                    .append(true)
                    .open(path)
                    .await
                    .map_err(repair_err)?;
                file.write_all(b"\n").await.map_err(repair_err)?;
                file.flush().await.map_err(repair_err)?;
            }
            Tail::Torn { keep } => {
                let file = tokio::fs::OpenOptions::new()
                    .write(true)
                    .open(path)
                    .await
                    .map_err(repair_err)?;
                file.set_len(keep).await.map_err(repair_err)?;
            }
        }
        Ok(())
    }

    /// Append one serialized row to the file.
    async fn append_row(&self, record: &PublishRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record).map_err(|e| {
            AppError::storage(format!("cannot serialize record {}: {e}", record.id))
        })?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::storage(format!("cannot open {}: {e}", self.path.display())))?;
        file.write_all(&line)
            .await
            .map_err(|e| AppError::storage(format!("cannot write {}: {e}", self.path.display())))?;
        file.flush()
            .await
            .map_err(|e| AppError::storage(format!("cannot flush {}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for LocalStorage {
    async fn was_published_since(
        &self,
        id: u64,
        subtype_label: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let start = window_start(now);
        Ok(self
            .records
            .iter()
            .any(|r| r.matches(id, subtype_label) && r.publish_timestamp >= start))
    }

    async fn record_publish_at(
        &mut self,
        id: u64,
        subtype_label: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let record = PublishRecord::new(id, subtype_label, at);
        self.append_row(&record).await?;
        log::debug!("Recorded publish of {} ({})", id, subtype_label);
        self.records.push(record);
        Ok(())
    }
}
