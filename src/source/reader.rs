use crate::trace::{Dataset, TraceRecord};
use csv::StringRecord;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open {dataset} file '{path}': {source}")]
    Open {
        dataset: Dataset,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}: decode error near line {line}: {source}")]
    Csv {
        source_name: String,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name}: line {line}: schema mismatch, expected {expected} columns, found {found}")]
    SchemaMismatch {
        source_name: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("{source_name}: line {line}: malformed column '{column}': expected {expected}, got '{value}'")]
    MalformedRow {
        source_name: String,
        line: u64,
        column: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// One decoded row: the raw record is kept so it can be written back
/// byte-for-byte, next to its typed view.
#[derive(Debug, Clone)]
pub struct TraceRow<T> {
    pub line: u64,
    pub raw: StringRecord,
    pub record: T,
}

/// Streaming reader for a headerless, fixed-schema trace file.
///
/// Rows are decoded one at a time; a row with the wrong column count or an
/// unparsable required field ends the stream with an error.
pub struct TraceReader<R: Read, T> {
    source_name: String,
    csv: csv::Reader<R>,
    buffer: StringRecord,
    rows_read: u64,
    failed: bool,
    _record: PhantomData<T>,
}

impl<T: TraceRecord> TraceReader<BufReader<File>, T> {
    pub fn open(path: &Path) -> Result<Self, ReaderError> {
        let file = File::open(path).map_err(|source| ReaderError::Open {
            dataset: T::DATASET,
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }
}

impl<R: Read, T: TraceRecord> TraceReader<R, T> {
    pub fn from_reader(reader: R, source_name: impl Into<String>) -> Self {
        let csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        Self {
            source_name: source_name.into(),
            csv,
            buffer: StringRecord::new(),
            rows_read: 0,
            failed: false,
            _record: PhantomData,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Read the next row, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<TraceRow<T>>, ReaderError> {
        let more = self
            .csv
            .read_record(&mut self.buffer)
            .map_err(|source| ReaderError::Csv {
                source_name: self.source_name.clone(),
                line: source
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(self.rows_read + 1),
                source,
            })?;

        if !more {
            return Ok(None);
        }

        let line = self
            .buffer
            .position()
            .map(|p| p.line())
            .unwrap_or(self.rows_read + 1);

        if self.buffer.len() != T::COLUMNS.len() {
            return Err(ReaderError::SchemaMismatch {
                source_name: self.source_name.clone(),
                line,
                expected: T::COLUMNS.len(),
                found: self.buffer.len(),
            });
        }

        let record = T::from_record(&self.buffer).map_err(|e| ReaderError::MalformedRow {
            source_name: self.source_name.clone(),
            line,
            column: e.column,
            value: e.value,
            expected: e.expected,
        })?;

        self.rows_read += 1;
        Ok(Some(TraceRow {
            line,
            raw: self.buffer.clone(),
            record,
        }))
    }
}

impl<R: Read, T: TraceRecord> Iterator for TraceReader<R, T> {
    type Item = Result<TraceRow<T>, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
