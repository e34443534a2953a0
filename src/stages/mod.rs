pub mod instance_validator;
pub mod machine_filter;
pub mod reconciler;
pub mod summary;

use thiserror::Error;

pub use instance_validator::{
    classify, validate_instances, ExclusionReason, InstanceReport, ValidationCounts,
    ValidationOutcome, Verdict,
};
pub use machine_filter::{
    filter_machine_events, is_add_event, EventTypeCounts, FilterOutcome, MachineEventReport,
};
pub use reconciler::{aggregate_tasks, DeclaredInstanceTotal, Reconciliation, TaskReport};
pub use summary::{ColumnStats, DatasetSummary, SummaryBuilder, SummaryError};

/// Fatal errors of a single streaming stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Reader(#[from] crate::source::ReaderError),

    #[error("output error: {0}")]
    Writer(#[from] crate::storage::WriterError),

    #[error("summary error: {0}")]
    Summary(#[from] SummaryError),
}
