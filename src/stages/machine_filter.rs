use super::summary::{DatasetSummary, SummaryBuilder};
use super::StageError;
use crate::source::TraceReader;
use crate::storage::{ArtifactInfo, CsvSink};
use crate::trace::{EventKind, MachineEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use tracing::info;

/// Per-type tally of machine events seen by the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventTypeCounts {
    counts: [u64; 4],
}

impl EventTypeCounts {
    pub fn record(&mut self, kind: EventKind) {
        self.counts[kind as usize] += 1;
    }

    pub fn get(&self, kind: EventKind) -> u64 {
        self.counts[kind as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn merge(&mut self, other: &EventTypeCounts) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts) {
            *mine += theirs;
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, u64> {
        EventKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), self.get(*kind)))
            .collect()
    }
}

/// Row predicate of the filter: exactly the literal `add`.
pub fn is_add_event(event: &MachineEvent) -> bool {
    event.kind() == EventKind::Add
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineEventReport {
    pub input_rows: u64,
    pub output_rows: u64,
    pub event_types: BTreeMap<String, u64>,
    pub artifact: ArtifactInfo,
}

pub struct FilterOutcome<W> {
    pub output: W,
    pub counts: EventTypeCounts,
    pub artifact: ArtifactInfo,
    pub summary: Option<DatasetSummary>,
}

impl<W> FilterOutcome<W> {
    pub fn report(&self) -> MachineEventReport {
        MachineEventReport {
            input_rows: self.counts.total(),
            output_rows: self.artifact.rows,
            event_types: self.counts.to_map(),
            artifact: self.artifact.clone(),
        }
    }
}

/// Stream machine events from `reader` into `sink`, keeping only `add` rows
/// in their original order and with their raw text unchanged.
pub fn filter_machine_events<R: Read, W: Write>(
    mut reader: TraceReader<R, MachineEvent>,
    mut sink: CsvSink<W>,
    mut summary: Option<SummaryBuilder<MachineEvent>>,
    progress_interval: u64,
) -> Result<FilterOutcome<W>, StageError> {
    let mut counts = EventTypeCounts::default();

    info!(source = %reader.source_name(), "Filtering machine events");

    while let Some(row) = reader.next_row()? {
        let kind = row.record.kind();
        counts.record(kind);

        if kind == EventKind::Add {
            sink.write_row(&row.raw)?;
            if let Some(builder) = summary.as_mut() {
                builder.observe(&row.record)?;
            }
        }

        if progress_interval > 0 && counts.total() % progress_interval == 0 {
            info!(rows = counts.total(), kept = sink.rows(), "Machine event progress");
        }
    }

    let (output, artifact) = sink.finish()?;

    info!(
        input_rows = counts.total(),
        add = counts.get(EventKind::Add),
        softerror = counts.get(EventKind::SoftError),
        harderror = counts.get(EventKind::HardError),
        other = counts.get(EventKind::Other),
        "Machine event filter finished"
    );

    Ok(FilterOutcome {
        output,
        counts,
        artifact,
        summary: summary.map(SummaryBuilder::finish),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReaderError;

    fn run(input: &str) -> Result<FilterOutcome<Vec<u8>>, StageError> {
        filter_machine_events(
            TraceReader::from_reader(input.as_bytes(), "server_event.csv"),
            CsvSink::new(Vec::new()),
            Some(SummaryBuilder::new(1_000)),
            0,
        )
    }

    #[test]
    fn test_keeps_only_add_rows_in_order() {
        let input = "\
0,3,add,,64,0.69,0.09
10,1,softerror,machine_fail,0,0,0
20,2,add,,32,0.5,0.05
30,3,harderror,disk,,,
40,3,add,,64,0.69,0.09
";
        let outcome = run(input).unwrap();
        assert_eq!(
            String::from_utf8(outcome.output.clone()).unwrap(),
            "0,3,add,,64,0.69,0.09\n20,2,add,,32,0.5,0.05\n40,3,add,,64,0.69,0.09\n"
        );
        let report = outcome.report();
        assert_eq!(report.input_rows, 5);
        assert_eq!(report.output_rows, 3);
        assert_eq!(report.event_types["add"], 3);
        assert_eq!(report.event_types["softerror"], 1);
        assert_eq!(report.event_types["harderror"], 1);
        assert_eq!(report.event_types["other"], 0);
    }

    #[test]
    fn test_duplicate_machine_adds_pass_through() {
        let input = "0,7,add,,64,0.5,0.1\n0,7,add,,64,0.5,0.1\n";
        let outcome = run(input).unwrap();
        assert_eq!(outcome.artifact.rows, 2);
    }

    #[test]
    fn test_unknown_type_is_excluded_without_error() {
        let input = "0,1,ADD,,64,0.5,0.1\n0,2,reboot,,,,\n0,3,add,,64,0.5,0.1\n";
        let outcome = run(input).unwrap();
        assert_eq!(outcome.artifact.rows, 1);
        assert_eq!(outcome.counts.get(EventKind::Other), 2);
    }

    #[test]
    fn test_malformed_row_aborts() {
        let input = "0,1,add,,64,0.5,0.1\nx,2,add,,64,0.5,0.1\n";
        let err = run(input).err().unwrap();
        assert!(matches!(
            err,
            StageError::Reader(ReaderError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_summary_covers_kept_rows_only() {
        let input = "0,1,add,,64,0.5,0.1\n5,2,softerror,,0,0,0\n9,3,add,,64,0.7,0.1\n";
        let outcome = run(input).unwrap();
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.rows, 2);
        let cpus = &summary.columns["number_of_cpus"];
        assert_eq!(cpus.count, 2);
        assert_eq!(cpus.mean, Some(64.0));
        assert_eq!(cpus.std, Some(0.0));
    }

    #[test]
    fn test_counts_merge() {
        let mut left = EventTypeCounts::default();
        left.record(EventKind::Add);
        left.record(EventKind::Other);
        let mut right = EventTypeCounts::default();
        right.record(EventKind::Add);
        left.merge(&right);
        assert_eq!(left.get(EventKind::Add), 2);
        assert_eq!(left.total(), 3);
    }
}
