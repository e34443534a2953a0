use csv::StringRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("csv encode error: {0}")]
    Csv(#[from] csv::Error),
}

/// Row count and content digest of a written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub rows: u64,
    pub sha256: String,
}

/// Passes bytes through while hashing them.
pub struct DigestWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    pub fn finish(self) -> (W, String) {
        (self.inner, format!("{:x}", self.hasher.finalize()))
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Headerless CSV sink that re-emits raw records unchanged.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<DigestWriter<W>>,
    rows: u64,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(DigestWriter::new(inner));
        Self { writer, rows: 0 }
    }

    pub fn write_row(&mut self, raw: &StringRecord) -> Result<(), WriterError> {
        self.writer.write_record(raw)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush buffered output and hand back the underlying writer.
    pub fn finish(self) -> Result<(W, ArtifactInfo), WriterError> {
        let rows = self.rows;
        let digest_writer = self
            .writer
            .into_inner()
            .map_err(|e| WriterError::Io(e.into_error()))?;
        let (mut inner, sha256) = digest_writer.finish();
        inner.flush()?;
        Ok((inner, ArtifactInfo { rows, sha256 }))
    }
}
