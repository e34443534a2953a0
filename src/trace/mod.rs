pub mod batch_instance;
pub mod batch_task;
pub mod field;
pub mod machine_event;

use csv::StringRecord;
use serde::Serialize;
use std::fmt;

pub use batch_instance::BatchInstance;
pub use batch_task::BatchTask;
pub use field::{Field, FieldError};
pub use machine_event::{EventKind, MachineEvent};

/// The three raw datasets of a cluster trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    MachineEvents,
    BatchTasks,
    BatchInstances,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::MachineEvents => "machine_events",
            Dataset::BatchTasks => "batch_tasks",
            Dataset::BatchInstances => "batch_instances",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed-schema, headerless trace row.
pub trait TraceRecord: Sized {
    const DATASET: Dataset;
    const COLUMNS: &'static [&'static str];

    fn from_record(record: &StringRecord) -> Result<Self, FieldError>;
}

/// Records that expose numeric columns to the summary reporter.
pub trait NumericColumns {
    const NUMERIC_COLUMNS: &'static [&'static str];

    /// Value of the `index`-th entry of `NUMERIC_COLUMNS`, if present.
    fn numeric_value(&self, index: usize) -> Option<f64>;
}
