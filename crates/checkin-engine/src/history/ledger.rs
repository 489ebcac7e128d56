//! CSV-backed, size-bounded attempt ledger.
//!
//! # File Format
//!
//! ```text
//! timestamp,slot,stage,result,err_category,err_summary,http_status,duration_ms,extra
//! 2024-05-01T08:00:03.120+08:00,morning,signin,success,,Check-in succeeded,200,5120,"{...}"
//! ```
//!
//! The header row is always present and never counts against `max_rows`.
//!
//! # Retention
//!
//! Each append is followed by a read-all / keep-suffix / rewrite pass when
//! the row count exceeds `max_rows`. The rewrite goes through a temp file in
//! the same directory and a rename, so a crash never leaves a torn ledger.
//! Writers must be serialized by the caller.

use super::entry::{HISTORY_HEADERS, HistoryEntry, RowError};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("history.max_rows must be at least 1")]
    InvalidBound,
    #[error("Ledger I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Ledger CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Ledger row {line} is malformed: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: RowError,
    },
    #[error("Failed to encode extra column: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    path: PathBuf,
    max_rows: usize,
}

impl HistoryLedger {
    /// Open the ledger at `path`, creating it (with its header) if needed.
    /// Existing rows are kept.
    pub fn init(path: impl Into<PathBuf>, max_rows: usize) -> Result<Self, LedgerError> {
        if max_rows == 0 {
            return Err(LedgerError::InvalidBound);
        }
        let ledger = Self {
            path: path.into(),
            max_rows,
        };
        ledger.ensure_header()?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &HistoryEntry) -> Result<(), LedgerError> {
        self.ensure_header()?;
        let row = entry.to_row()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(&row)?;
        writer.flush().map_err(|e| self.io_error(e))?;
        drop(writer);

        self.truncate_if_needed()
    }

    /// The last `limit` entries, oldest first.
    pub fn tail(&self, limit: usize) -> Result<Vec<HistoryEntry>, LedgerError> {
        if limit == 0 || !self.path.exists() {
            return Ok(Vec::new());
        }
        let records = self.read_records()?;
        let start = records.len().saturating_sub(limit);
        records[start..]
            .iter()
            .map(|record| {
                HistoryEntry::from_row(record).map_err(|source| LedgerError::Malformed {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    source,
                })
            })
            .collect()
    }

    /// Number of stored rows, header excluded.
    pub fn len(&self) -> Result<usize, LedgerError> {
        if !self.path.exists() {
            return Ok(0);
        }
        Ok(self.read_records()?.len())
    }

    fn ensure_header(&self) -> Result<(), LedgerError> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(self.io_error(e)),
        };
        if !needs_header {
            return Ok(());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(HISTORY_HEADERS)?;
        writer.flush().map_err(|e| self.io_error(e))?;
        tracing::debug!("Initialized history ledger at {}", self.path.display());
        Ok(())
    }

    fn read_records(&self) -> Result<Vec<csv::StringRecord>, LedgerError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::from)
    }

    fn truncate_if_needed(&self) -> Result<(), LedgerError> {
        let records = self.read_records()?;
        if records.len() <= self.max_rows {
            return Ok(());
        }
        let keep = &records[records.len() - self.max_rows..];

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record(HISTORY_HEADERS)?;
            for record in keep {
                writer.write_record(record)?;
            }
            writer.flush().map_err(|e| self.io_error(e))?;
        }
        tmp.as_file_mut()
            .sync_all()
            .map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        tracing::debug!(
            "Trimmed history ledger from {} to {} rows",
            records.len(),
            self.max_rows
        );
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
