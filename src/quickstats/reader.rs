//! Forward-only reader over the gzip, tab-separated statistics dump.
//!
//! Records are decoded one at a time from the compressed stream, so memory stays
//! bounded by the longest record no matter how large the dataset is. Restarting means
//! opening the file again. Reading blocks, so a reader over a file is driven from
//! `spawn_blocking`.

use crate::quickstats::error::QuickStatsError;
use async_compression::tokio::bufread::GzipDecoder;
use csv::{ByteRecord, ReaderBuilder};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio_util::io::SyncIoBridge;

/// Read access to a flat record by field name. Absent fields read as `""`.
pub trait FieldLookup {
    fn field(&self, name: &str) -> &str;
}

/// One data row, sharing the column index of the header it was read under.
#[derive(Debug, Clone)]
pub struct TabularRecord {
    columns: Arc<HashMap<String, usize>>,
    values: Vec<String>,
}

impl TabularRecord {
    /// Builds a standalone record from `(field, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut columns = HashMap::new();
        let mut values = Vec::new();
        for (idx, (name, value)) in pairs.into_iter().enumerate() {
            columns.insert(name.to_string(), idx);
            values.push(value.to_string());
        }
        Self {
            columns: Arc::new(columns),
            values,
        }
    }
}

impl FieldLookup for TabularRecord {
    fn field(&self, name: &str) -> &str {
        self.columns
            .get(name)
            .and_then(|&idx| self.values.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Decompressed bytes of a dump on disk, readable from a blocking thread.
pub type GzipFileSource = SyncIoBridge<GzipDecoder<BufReader<File>>>;

/// Opens a gzip dataset on disk. Concatenated gzip members are read through.
///
/// Must be called inside the runtime; the returned source must only be read from
/// a blocking thread.
pub async fn open_gzip(path: &Path) -> Result<GzipFileSource, QuickStatsError> {
    let file = File::open(path)
        .await
        .map_err(|e| QuickStatsError::Open(path.to_path_buf(), e))?;
    let mut decoder = GzipDecoder::new(BufReader::new(file));
    decoder.multiple_members(true);
    Ok(SyncIoBridge::new(decoder))
}

pub struct QuickStatsReader<R> {
    reader: csv::Reader<R>,
    columns: Arc<HashMap<String, usize>>,
    record: ByteRecord,
}

impl<R: Read> QuickStatsReader<R> {
    /// Wraps a decompressed stream and consumes its header row.
    ///
    /// Fields may be double-quoted (quotes escaped by doubling), in which case they
    /// can contain tabs and newlines. Rows may be shorter than the header.
    pub fn from_reader(source: R) -> Result<Self, QuickStatsError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(source);
        let header = reader
            .byte_headers()
            .map_err(|source| QuickStatsError::Read { line: 1, source })?;
        if header.is_empty() {
            return Err(QuickStatsError::MissingHeader);
        }
        let columns = header
            .iter()
            .enumerate()
            .map(|(idx, name)| (lossy(name), idx))
            .collect();
        Ok(Self {
            reader,
            columns: Arc::new(columns),
            record: ByteRecord::new(),
        })
    }

    /// Next data row, or `None` at the end of the stream. Invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn next_record(&mut self) -> Result<Option<TabularRecord>, QuickStatsError> {
        let more = self
            .reader
            .read_byte_record(&mut self.record)
            .map_err(|source| QuickStatsError::Read {
                line: source.position().map_or(0, |p| p.line()),
                source,
            })?;
        if !more {
            return Ok(None);
        }
        Ok(Some(TabularRecord {
            columns: Arc::clone(&self.columns),
            values: self.record.iter().map(lossy).collect(),
        }))
    }
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}
