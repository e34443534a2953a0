use super::field::{optional, required, text, tri_state, whole_number, Field, FieldError};
use super::{Dataset, NumericColumns, TraceRecord};
use csv::StringRecord;

/// One realized execution attempt of a batch task unit.
///
/// Start, end and task id are tri-state: the validator classifies rows on
/// them instead of aborting the run. Timestamps are any finite number.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInstance {
    pub start_timestamp: Field<f64>,
    pub end_timestamp: Field<f64>,
    pub job_id: Option<i64>,
    pub task_id: Field<i64>,
    pub machine_id: Option<i64>,
    pub status: String,
    pub sequence_number: i64,
    pub total_sequence_number: i64,
    pub maximum_real_cpu_number: Option<f64>,
    pub average_real_cpu_number: Option<f64>,
    pub maximum_normalized_memory_usage: Option<f64>,
    pub average_normalized_memory_usage: Option<f64>,
}

impl TraceRecord for BatchInstance {
    const DATASET: Dataset = Dataset::BatchInstances;
    const COLUMNS: &'static [&'static str] = &[
        "start_timestamp",
        "end_timestamp",
        "job_id",
        "task_id",
        "machine_id",
        "status",
        "sequence_number",
        "total_sequence_number",
        "maximum_real_cpu_number",
        "average_real_cpu_number",
        "maximum_normalized_memory_usage",
        "average_normalized_memory_usage",
    ];

    fn from_record(record: &StringRecord) -> Result<Self, FieldError> {
        Ok(Self {
            start_timestamp: tri_state(record, 0),
            end_timestamp: tri_state(record, 1),
            job_id: optional(record, 2, "job_id")?,
            task_id: whole_number(record, 3),
            machine_id: optional(record, 4, "machine_id")?,
            status: text(record, 5),
            sequence_number: required(record, 6, "sequence_number")?,
            total_sequence_number: required(record, 7, "total_sequence_number")?,
            maximum_real_cpu_number: optional(record, 8, "maximum_real_cpu_number")?,
            average_real_cpu_number: optional(record, 9, "average_real_cpu_number")?,
            maximum_normalized_memory_usage: optional(
                record,
                10,
                "maximum_normalized_memory_usage",
            )?,
            average_normalized_memory_usage: optional(
                record,
                11,
                "average_normalized_memory_usage",
            )?,
        })
    }
}

impl NumericColumns for BatchInstance {
    const NUMERIC_COLUMNS: &'static [&'static str] = &[
        "start_timestamp",
        "end_timestamp",
        "job_id",
        "task_id",
        "machine_id",
        "sequence_number",
        "total_sequence_number",
        "maximum_real_cpu_number",
        "average_real_cpu_number",
        "maximum_normalized_memory_usage",
        "average_normalized_memory_usage",
    ];

    fn numeric_value(&self, index: usize) -> Option<f64> {
        match index {
            0 => self.start_timestamp.value(),
            1 => self.end_timestamp.value(),
            2 => self.job_id.map(|v| v as f64),
            3 => self.task_id.value().map(|v| v as f64),
            4 => self.machine_id.map(|v| v as f64),
            5 => Some(self.sequence_number as f64),
            6 => Some(self.total_sequence_number as f64),
            7 => self.maximum_real_cpu_number,
            8 => self.average_real_cpu_number,
            9 => self.maximum_normalized_memory_usage,
            10 => self.average_normalized_memory_usage,
            _ => None,
        }
    }
}
