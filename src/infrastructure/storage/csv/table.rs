//! Delimited flat-file table
//!
//! One file per collection: a header row, then one record per line. Updates
//! and deletes rewrite the whole file through a temp file and a rename, so a
//! reader only ever sees the old or the new content. Adds append a line.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::debug;

use crate::shared::errors::InfraError;

pub const DELIMITER: char = ',';

/// A record type with a durable row encoding.
pub trait CsvRecord: Sized + Send + Sync {
    /// File name inside the data directory
    const FILE: &'static str;
    /// Exact header row
    const HEADER: &'static str;
    /// When set, the last column takes the rest of the line and may contain
    /// the delimiter.
    const TRAILING_TEXT: bool;

    fn to_fields(&self) -> Vec<String>;

    fn from_fields(fields: &[&str]) -> Result<Self, String>;

    fn columns() -> usize {
        Self::HEADER.split(DELIMITER).count()
    }

    fn column_name(index: usize) -> &'static str {
        Self::HEADER.split(DELIMITER).nth(index).unwrap_or("?")
    }
}

/// Encode one record as a line (without the newline).
pub fn encode_row<R: CsvRecord>(record: &R) -> Result<String, InfraError> {
    let fields = record.to_fields();
    let last = fields.len().saturating_sub(1);

    for (i, field) in fields.iter().enumerate() {
        if field.contains(['\n', '\r']) {
            return Err(InfraError::InvalidField {
                field: R::column_name(i),
                reason: "contains a line break".into(),
            });
        }
        let free_text = R::TRAILING_TEXT && i == last;
        if !free_text && field.contains(DELIMITER) {
            return Err(InfraError::InvalidField {
                field: R::column_name(i),
                reason: format!("contains '{}'", DELIMITER),
            });
        }
    }

    let separator = DELIMITER.to_string();
    Ok(fields.join(separator.as_str()))
}

/// Decode one line. `line_no` is 1-based and only used for error reports.
pub fn decode_row<R: CsvRecord>(line: &str, line_no: usize) -> Result<R, InfraError> {
    let columns = R::columns();
    let fields: Vec<&str> = if R::TRAILING_TEXT {
        line.splitn(columns, DELIMITER).collect()
    } else {
        line.split(DELIMITER).collect()
    };

    let malformed = |reason: String| InfraError::MalformedRecord {
        file: R::FILE.to_string(),
        line: line_no,
        reason,
    };

    if fields.len() != columns {
        return Err(malformed(format!(
            "expected {} fields, got {}",
            columns,
            fields.len()
        )));
    }

    R::from_fields(&fields).map_err(malformed)
}

pub struct CsvTable<R> {
    path: PathBuf,
    lock: RwLock<()>,
    _record: PhantomData<fn() -> R>,
}

impl<R: CsvRecord> CsvTable<R> {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(R::FILE),
            lock: RwLock::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_all(&self) -> Result<Vec<R>, InfraError> {
        let _guard = self.lock.read().await;
        self.read_unlocked().await
    }

    /// Read, let `f` change the records, and write them back if it asks to.
    /// Holds the table's write lock for the whole round trip.
    pub async fn modify<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<R>) -> Result<(T, bool), E>,
        E: From<InfraError>,
    {
        let _guard = self.lock.write().await;
        let mut records = self.read_unlocked().await?;
        let (value, dirty) = f(&mut records)?;
        if dirty {
            self.rewrite_unlocked(&records).await?;
        }
        Ok(value)
    }

    pub async fn append(&self, record: &R) -> Result<(), InfraError> {
        let _guard = self.lock.write().await;
        self.append_unlocked(record).await
    }

    /// Append `record` unless `check` rejects it against the current rows.
    pub async fn append_checked<E, F>(&self, record: &R, check: F) -> Result<(), E>
    where
        F: FnOnce(&[R]) -> Result<(), E>,
        E: From<InfraError>,
    {
        let _guard = self.lock.write().await;
        let records = self.read_unlocked().await?;
        check(&records)?;
        self.append_unlocked(record).await?;
        Ok(())
    }

    async fn append_unlocked(&self, record: &R) -> Result<(), InfraError> {
        let line = encode_row(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let len = file.metadata().await.map_err(|e| self.io_error(e))?.len();
        let mut out = String::new();
        if len == 0 {
            out.push_str(R::HEADER);
            out.push('\n');
        } else {
            // Hand-edited files may lack the final newline.
            let mut last = [0u8; 1];
            file.seek(std::io::SeekFrom::Start(len - 1))
                .await
                .map_err(|e| self.io_error(e))?;
            file.read_exact(&mut last)
                .await
                .map_err(|e| self.io_error(e))?;
            if last[0] != b'\n' {
                out.push('\n');
            }
        }
        out.push_str(&line);
        out.push('\n');

        file.write_all(out.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_data().await.map_err(|e| self.io_error(e))?;
        debug!(file = R::FILE, "Appended record");
        Ok(())
    }

    async fn read_unlocked(&self) -> Result<Vec<R>, InfraError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut lines = text.lines().enumerate();
        match lines.next() {
            None => return Ok(Vec::new()),
            Some((_, header)) if header.trim_end_matches('\r') == R::HEADER => {}
            Some((_, header)) => {
                return Err(InfraError::MalformedRecord {
                    file: R::FILE.to_string(),
                    line: 1,
                    reason: format!("unexpected header '{}'", header),
                })
            }
        }

        lines
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_no, line)| decode_row(line, line_no))
            .collect()
    }

    async fn rewrite_unlocked(&self, records: &[R]) -> Result<(), InfraError> {
        let mut out = String::from(R::HEADER);
        out.push('\n');
        for record in records {
            out.push_str(&encode_row(record)?);
            out.push('\n');
        }

        // Flushed to disk before the rename so a crash leaves the old or new table.
        let tmp = self.path.with_extension("csv.tmp");
        let mut file = fs::File::create(&tmp).await.map_err(|e| self.io_error(e))?;
        file.write_all(out.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_data().await.map_err(|e| self.io_error(e))?;
        drop(file);
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!(file = R::FILE, records = records.len(), "Rewrote table");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> InfraError {
        InfraError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
