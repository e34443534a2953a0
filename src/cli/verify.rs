use crate::report::compare_reports;
use console::style;
use std::fs;
use std::path::Path;

/// Compare a run report against a baseline. Returns `Ok(true)` when they
/// match; prints a diff and returns `Ok(false)` otherwise.
pub fn verify(baseline: &Path, report: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let baseline_text = fs::read_to_string(baseline)
        .map_err(|e| format!("failed to read baseline '{}': {}", baseline.display(), e))?;
    let report_text = fs::read_to_string(report)
        .map_err(|e| format!("failed to read report '{}': {}", report.display(), e))?;

    let comparison = compare_reports(
        &baseline_text,
        &report_text,
        &baseline.display().to_string(),
        &report.display().to_string(),
    )?;

    if comparison.identical {
        println!("{}", style("✓ Report matches baseline").green());
        return Ok(true);
    }

    println!(
        "{}",
        style(format!(
            "✗ Report differs from baseline ({} changed lines)",
            comparison.changed_lines
        ))
        .red()
        .bold()
    );
    print!("{}", comparison.diff);
    Ok(false)
}
