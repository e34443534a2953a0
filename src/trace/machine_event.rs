use super::field::{optional, optional_text, required, text, FieldError};
use super::{Dataset, NumericColumns, TraceRecord};
use csv::StringRecord;
use serde::Serialize;

/// Machine lifecycle event.
///
/// Capacity columns are only populated for some event types, so they are
/// optional; timestamp and machine id are always required.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineEvent {
    pub timestamp: i64,
    pub machine_id: i64,
    pub event_type: String,
    pub event_detail: Option<String>,
    pub number_of_cpus: Option<i64>,
    pub normalized_memory: Option<f64>,
    pub normalized_disk_space: Option<f64>,
}

/// Known event vocabulary. `softerror` and `harderror` mark a machine as
/// temporarily or permanently unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EventKind {
    Add,
    SoftError,
    HardError,
    Other,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Add,
        EventKind::SoftError,
        EventKind::HardError,
        EventKind::Other,
    ];

    /// Exact, case-sensitive match against the trace vocabulary.
    pub fn classify(event_type: &str) -> Self {
        match event_type {
            "add" => EventKind::Add,
            "softerror" => EventKind::SoftError,
            "harderror" => EventKind::HardError,
            _ => EventKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Add => "add",
            EventKind::SoftError => "softerror",
            EventKind::HardError => "harderror",
            EventKind::Other => "other",
        }
    }
}

impl MachineEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.event_type)
    }
}

impl TraceRecord for MachineEvent {
    const DATASET: Dataset = Dataset::MachineEvents;
    const COLUMNS: &'static [&'static str] = &[
        "timestamp",
        "machine_id",
        "event_type",
        "event_detail",
        "number_of_cpus",
        "normalized_memory",
        "normalized_disk_space",
    ];

    fn from_record(record: &StringRecord) -> Result<Self, FieldError> {
        Ok(Self {
            timestamp: required(record, 0, "timestamp")?,
            machine_id: required(record, 1, "machine_id")?,
            event_type: text(record, 2),
            event_detail: optional_text(record, 3),
            number_of_cpus: optional(record, 4, "number_of_cpus")?,
            normalized_memory: optional(record, 5, "normalized_memory")?,
            normalized_disk_space: optional(record, 6, "normalized_disk_space")?,
        })
    }
}

impl NumericColumns for MachineEvent {
    const NUMERIC_COLUMNS: &'static [&'static str] = &[
        "timestamp",
        "machine_id",
        "number_of_cpus",
        "normalized_memory",
        "normalized_disk_space",
    ];

    fn numeric_value(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.timestamp as f64),
            1 => Some(self.machine_id as f64),
            2 => self.number_of_cpus.map(|v| v as f64),
            3 => self.normalized_memory,
            4 => self.normalized_disk_space,
            _ => None,
        }
    }
}
