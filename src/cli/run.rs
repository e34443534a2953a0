use crate::config::parse::load_config;
use crate::pipeline::{Pipeline, PipelineError};
use crate::report::RunReport;
use crate::stages::ExclusionReason;
use console::style;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::parse::ConfigError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/tracesieve/config.yml");
            eprintln!("  /etc/tracesieve/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'tracesieve config init' to generate one.");
            std::process::exit(1);
        }
    };

    let report = run_pipeline(&config_path).await?;
    print_report(&report);
    Ok(())
}

pub async fn run_pipeline(config_path: &Path) -> Result<RunReport, RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    info!(
        machine_events = %config.inputs.machine_events.display(),
        batch_tasks = %config.inputs.batch_tasks.display(),
        batch_instances = %config.inputs.batch_instances.display(),
        parallel = config.pipeline.parallel,
        "Starting pipeline"
    );

    let report = Pipeline::new(config).run().await?;
    Ok(report)
}

fn print_report(report: &RunReport) {
    let machine = &report.machine_events;
    println!("{}", style("Machine events").bold());
    println!(
        "  {} of {} rows kept (add)",
        style(machine.output_rows).green(),
        machine.input_rows
    );
    for (event_type, count) in &machine.event_types {
        if event_type != "add" && *count > 0 {
            println!("  {:>9} excluded: {}", event_type, count);
        }
    }

    let instances = &report.batch_instances;
    println!("{}", style("Batch instances").bold());
    println!(
        "  {} of {} rows valid",
        style(instances.valid_rows).green(),
        instances.input_rows
    );
    for reason in ExclusionReason::PRIORITY {
        let count = instances
            .exclusions
            .get(reason.as_str())
            .copied()
            .unwrap_or(0);
        if count > 0 {
            println!(
                "  {:>17}: {}",
                reason.as_str(),
                style(count).yellow()
            );
        }
    }

    let rec = &report.reconciliation;
    println!("{}", style("Reconciliation").bold());
    println!("  declared instances:  {}", rec.declared_total);
    if rec.declared_total_excluded_count > 0 {
        println!(
            "  tasks without count: {}",
            style(rec.declared_total_excluded_count).yellow()
        );
    }
    println!("  raw instance rows:   {}", rec.raw_instance_count);
    println!("  valid instance rows: {}", rec.valid_instance_count);
    println!(
        "  declared - raw: {}, declared - valid: {}, raw - valid: {}",
        rec.declared_minus_raw, rec.declared_minus_valid, rec.raw_minus_valid
    );
}
