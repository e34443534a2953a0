pub mod csv_sink;
pub mod staged;

pub use csv_sink::{ArtifactInfo, CsvSink, DigestWriter, WriterError};
pub use staged::StagedFile;
