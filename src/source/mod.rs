pub mod reader;

pub use reader::{ReaderError, TraceReader, TraceRow};
