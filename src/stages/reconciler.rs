use super::StageError;
use crate::source::TraceReader;
use crate::trace::{BatchTask, Field};
use serde::Serialize;
use std::io::Read;
use tracing::{info, warn};

/// Sum of declared instance counts over batch tasks.
///
/// Rows whose `number_of_instances` is missing, non-numeric or not a whole
/// number are left out of the sum and counted in `excluded_rows` instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclaredInstanceTotal {
    pub declared_total: i128,
    pub counted_rows: u64,
    pub excluded_rows: u64,
}

impl DeclaredInstanceTotal {
    pub fn add(&mut self, task: &BatchTask) {
        match task.number_of_instances {
            Field::Present(n) => {
                self.declared_total += i128::from(n);
                self.counted_rows += 1;
            }
            Field::Absent | Field::Unparsable(_) => self.excluded_rows += 1,
        }
    }

    pub fn merge(&mut self, other: &DeclaredInstanceTotal) {
        self.declared_total += other.declared_total;
        self.counted_rows += other.counted_rows;
        self.excluded_rows += other.excluded_rows;
    }

    pub fn input_rows(&self) -> u64 {
        self.counted_rows + self.excluded_rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub input_rows: u64,
    pub declared_total: i128,
    pub declared_total_excluded_count: u64,
}

impl From<&DeclaredInstanceTotal> for TaskReport {
    fn from(total: &DeclaredInstanceTotal) -> Self {
        Self {
            input_rows: total.input_rows(),
            declared_total: total.declared_total,
            declared_total_excluded_count: total.excluded_rows,
        }
    }
}

/// Stream the batch task file and reduce it to its declared instance total.
pub fn aggregate_tasks<R: Read>(
    mut reader: TraceReader<R, BatchTask>,
    progress_interval: u64,
) -> Result<DeclaredInstanceTotal, StageError> {
    let mut total = DeclaredInstanceTotal::default();

    info!(source = %reader.source_name(), "Aggregating declared task instances");

    while let Some(row) = reader.next_row()? {
        total.add(&row.record);
        if progress_interval > 0 && total.input_rows() % progress_interval == 0 {
            info!(rows = total.input_rows(), "Batch task progress");
        }
    }

    info!(
        input_rows = total.input_rows(),
        declared_total = %total.declared_total,
        "Batch task aggregation finished"
    );
    if total.excluded_rows > 0 {
        warn!(
            rows = total.excluded_rows,
            "Batch tasks without a numeric instance count left out of the declared total"
        );
    }

    Ok(total)
}

/// Declared versus observed instance counts. Disagreement is expected and
/// reported, never corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub declared_total: i128,
    pub declared_total_excluded_count: u64,
    pub raw_instance_count: u64,
    pub valid_instance_count: u64,
    pub declared_minus_raw: i128,
    pub declared_minus_valid: i128,
    pub raw_minus_valid: i128,
}

impl Reconciliation {
    pub fn new(
        declared: &DeclaredInstanceTotal,
        raw_instance_count: u64,
        valid_instance_count: u64,
    ) -> Self {
        let raw = i128::from(raw_instance_count);
        let valid = i128::from(valid_instance_count);

        Self {
            declared_total: declared.declared_total,
            declared_total_excluded_count: declared.excluded_rows,
            raw_instance_count,
            valid_instance_count,
            declared_minus_raw: declared.declared_total - raw,
            declared_minus_valid: declared.declared_total - valid,
            raw_minus_valid: raw - valid,
        }
    }

    pub fn agrees(&self) -> bool {
        self.declared_minus_raw == 0 && self.raw_minus_valid == 0
    }

    pub fn log(&self) {
        info!(
            declared_total = %self.declared_total,
            raw_instance_count = self.raw_instance_count,
            valid_instance_count = self.valid_instance_count,
            "Task/instance reconciliation"
        );
        if !self.agrees() {
            warn!(
                declared_minus_raw = %self.declared_minus_raw,
                declared_minus_valid = %self.declared_minus_valid,
                raw_minus_valid = %self.raw_minus_valid,
                "Declared and observed instance counts disagree"
            );
        }
    }
}
