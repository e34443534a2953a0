pub mod diff;

use crate::stages::{DatasetSummary, InstanceReport, MachineEventReport, Reconciliation, TaskReport};
use serde::Serialize;
use std::collections::BTreeMap;

pub use diff::{canonicalize, compare_reports, ReportComparison};

/// Machine-readable outcome of a run.
///
/// Contains no timestamps or paths: identical inputs give a byte-identical
/// report, which is what `verify` relies on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub machine_events: MachineEventReport,
    pub batch_tasks: TaskReport,
    pub batch_instances: InstanceReport,
    pub reconciliation: Reconciliation,
    pub summaries: BTreeMap<String, DatasetSummary>,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}
