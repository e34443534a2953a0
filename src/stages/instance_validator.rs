use super::summary::{DatasetSummary, SummaryBuilder};
use super::StageError;
use crate::source::TraceReader;
use crate::storage::{ArtifactInfo, CsvSink};
use crate::trace::{BatchInstance, Field};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// Integrity predicate a batch instance failed, in priority order: a row is
/// attributed to the first reason it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ExclusionReason {
    MissingStart,
    MissingEnd,
    MissingTaskId,
    InvertedInterval,
    NegativeEnd,
    NegativeStart,
}

impl ExclusionReason {
    pub const PRIORITY: [ExclusionReason; 6] = [
        ExclusionReason::MissingStart,
        ExclusionReason::MissingEnd,
        ExclusionReason::MissingTaskId,
        ExclusionReason::InvertedInterval,
        ExclusionReason::NegativeEnd,
        ExclusionReason::NegativeStart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::MissingStart => "missing-start",
            ExclusionReason::MissingEnd => "missing-end",
            ExclusionReason::MissingTaskId => "missing-task-id",
            ExclusionReason::InvertedInterval => "inverted-interval",
            ExclusionReason::NegativeEnd => "negative-end",
            ExclusionReason::NegativeStart => "negative-start",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Excluded(ExclusionReason),
}

/// Classify one instance. Unparsable start, end or task id count as missing.
pub fn classify(instance: &BatchInstance) -> Verdict {
    let start = match instance.start_timestamp {
        Field::Present(v) => v,
        _ => return Verdict::Excluded(ExclusionReason::MissingStart),
    };
    let end = match instance.end_timestamp {
        Field::Present(v) => v,
        _ => return Verdict::Excluded(ExclusionReason::MissingEnd),
    };
    if !instance.task_id.is_present() {
        return Verdict::Excluded(ExclusionReason::MissingTaskId);
    }
    if end < start {
        return Verdict::Excluded(ExclusionReason::InvertedInterval);
    }
    if end < 0.0 {
        return Verdict::Excluded(ExclusionReason::NegativeEnd);
    }
    if start < 0.0 {
        return Verdict::Excluded(ExclusionReason::NegativeStart);
    }
    Verdict::Valid
}

/// Classification tally. `valid + excluded == input` holds by construction,
/// and merging chunk tallies is plain addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationCounts {
    valid: u64,
    excluded: [u64; 6],
}

impl ValidationCounts {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Valid => self.valid += 1,
            Verdict::Excluded(reason) => self.excluded[reason as usize] += 1,
        }
    }

    pub fn merge(&mut self, other: &ValidationCounts) {
        self.valid += other.valid;
        for (mine, theirs) in self.excluded.iter_mut().zip(other.excluded) {
            *mine += theirs;
        }
    }

    pub fn valid(&self) -> u64 {
        self.valid
    }

    pub fn excluded(&self, reason: ExclusionReason) -> u64 {
        self.excluded[reason as usize]
    }

    pub fn total_excluded(&self) -> u64 {
        self.excluded.iter().sum()
    }

    pub fn input(&self) -> u64 {
        self.valid + self.total_excluded()
    }

    pub fn report(&self, artifact: ArtifactInfo) -> InstanceReport {
        InstanceReport {
            input_rows: self.input(),
            valid_rows: self.valid,
            excluded_rows: self.total_excluded(),
            exclusions: ExclusionReason::PRIORITY
                .iter()
                .map(|reason| (reason.as_str().to_string(), self.excluded(*reason)))
                .collect(),
            artifact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceReport {
    pub input_rows: u64,
    pub valid_rows: u64,
    pub excluded_rows: u64,
    pub exclusions: BTreeMap<String, u64>,
    pub artifact: ArtifactInfo,
}

pub struct ValidationOutcome<W> {
    pub output: W,
    pub counts: ValidationCounts,
    pub artifact: ArtifactInfo,
    pub summary: Option<DatasetSummary>,
}

impl<W> ValidationOutcome<W> {
    pub fn report(&self) -> InstanceReport {
        self.counts.report(self.artifact.clone())
    }
}

/// Stream batch instances from `reader`, writing valid rows to `sink`
/// untouched and tallying every excluded row under its reason.
pub fn validate_instances<R: Read, W: Write>(
    mut reader: TraceReader<R, BatchInstance>,
    mut sink: CsvSink<W>,
    mut summary: Option<SummaryBuilder<BatchInstance>>,
    progress_interval: u64,
) -> Result<ValidationOutcome<W>, StageError> {
    let mut counts = ValidationCounts::default();

    info!(source = %reader.source_name(), "Validating batch instances");

    while let Some(row) = reader.next_row()? {
        let verdict = classify(&row.record);
        counts.record(verdict);

        match verdict {
            Verdict::Valid => {
                sink.write_row(&row.raw)?;
                if let Some(builder) = summary.as_mut() {
                    builder.observe(&row.record)?;
                }
            }
            Verdict::Excluded(reason) => {
                debug!(line = row.line, reason = %reason, "Excluded batch instance");
            }
        }

        if progress_interval > 0 && counts.input() % progress_interval == 0 {
            info!(
                rows = counts.input(),
                valid = counts.valid(),
                "Batch instance progress"
            );
        }
    }

    let (output, artifact) = sink.finish()?;

    info!(
        input_rows = counts.input(),
        valid_rows = counts.valid(),
        excluded_rows = counts.total_excluded(),
        "Batch instance validation finished"
    );
    for reason in ExclusionReason::PRIORITY {
        let excluded = counts.excluded(reason);
        if excluded > 0 {
            warn!(reason = %reason, rows = excluded, "Batch instances excluded");
        }
    }

    Ok(ValidationOutcome {
        output,
        counts,
        artifact,
        summary: summary.map(SummaryBuilder::finish),
    })
}
