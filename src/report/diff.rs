use similar::{ChangeTag, TextDiff};

/// Result of comparing a run report with a baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportComparison {
    pub identical: bool,
    pub changed_lines: usize,
    pub diff: String,
}

/// Re-serialize a JSON report with sorted keys and fixed indentation so that
/// formatting differences never show up as regressions. Numbers keep their
/// literal text, so `i128` counts survive the round trip.
pub fn canonicalize(json: &str) -> Result<String, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let mut canonical = serde_json::to_string_pretty(&value)?;
    canonical.push('\n');
    Ok(canonical)
}

/// Compare two reports on their canonical form and render a unified diff.
pub fn compare_reports(
    baseline: &str,
    current: &str,
    baseline_label: &str,
    current_label: &str,
) -> Result<ReportComparison, serde_json::Error> {
    let baseline = canonicalize(baseline)?;
    let current = canonicalize(current)?;

    if baseline == current {
        return Ok(ReportComparison {
            identical: true,
            changed_lines: 0,
            diff: String::new(),
        });
    }

    let diff = TextDiff::from_lines(baseline.as_str(), current.as_str());
    let changed_lines = diff
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .count();
    let rendered = diff
        .unified_diff()
        .context_radius(3)
        .header(baseline_label, current_label)
        .to_string();

    Ok(ReportComparison {
        identical: false,
        changed_lines,
        diff: rendered,
    })
}
