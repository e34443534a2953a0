use crate::config::Config;
use crate::report::RunReport;
use crate::source::TraceReader;
use crate::stages::{
    aggregate_tasks, filter_machine_events, validate_instances, DatasetSummary,
    DeclaredInstanceTotal, InstanceReport, MachineEventReport, Reconciliation, StageError,
    SummaryBuilder, TaskReport,
};
use crate::storage::{CsvSink, StagedFile};
use crate::trace::{Dataset, NumericColumns};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// Errors that abort a pipeline run. Nothing is published when one occurs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{dataset} stage failed: {source}")]
    Stage {
        dataset: Dataset,
        #[source]
        source: StageError,
    },

    #[error("failed to stage {dataset} output '{path}': {source}")]
    Output {
        dataset: Dataset,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to publish '{path}': {source}")]
    Publish {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("stage task failed to complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl PipelineError {
    fn stage(dataset: Dataset, source: impl Into<StageError>) -> Self {
        PipelineError::Stage {
            dataset,
            source: source.into(),
        }
    }

    fn output(dataset: Dataset, path: &Path, source: std::io::Error) -> Self {
        PipelineError::Output {
            dataset,
            path: path.display().to_string(),
            source,
        }
    }
}

/// Machine events reduced to their `add` subset, not yet published.
pub struct MachineStage {
    pub staged: StagedFile,
    pub report: MachineEventReport,
    pub summary: Option<DatasetSummary>,
}

/// Validated batch instances, not yet published.
pub struct InstanceStage {
    pub staged: StagedFile,
    pub report: InstanceReport,
    pub summary: Option<DatasetSummary>,
}

pub struct TaskStage {
    pub total: DeclaredInstanceTotal,
}

/// The whole run as an explicit composition of the three streaming stages,
/// the reconciliation and a final publish step.
pub struct Pipeline {
    config: Arc<Config>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let (machine, tasks, instances) = if self.config.pipeline.parallel {
            self.run_stages_concurrently().await?
        } else {
            self.run_stages_sequentially().await?
        };

        let reconciliation = Reconciliation::new(
            &tasks.total,
            instances.report.input_rows,
            instances.report.valid_rows,
        );
        reconciliation.log();

        let mut summaries = BTreeMap::new();
        if let Some(summary) = machine.summary {
            summaries.insert(Dataset::MachineEvents.to_string(), summary);
        }
        if let Some(summary) = instances.summary {
            summaries.insert(Dataset::BatchInstances.to_string(), summary);
        }

        let report = RunReport {
            machine_events: machine.report,
            batch_tasks: TaskReport::from(&tasks.total),
            batch_instances: instances.report,
            reconciliation,
            summaries,
        };

        let json = report.to_json()?;
        let report_path = self.config.outputs.report.clone();
        let machine_staged = machine.staged;
        let instance_staged = instances.staged;

        tokio::task::spawn_blocking(move || {
            let mut staged_report = StagedFile::create(&report_path)
                .and_then(|mut file| file.write_all(json.as_bytes()).map(|_| file))
                .map_err(|source| PipelineError::Publish {
                    path: report_path.display().to_string(),
                    source,
                })?;
            staged_report.flush().map_err(|source| PipelineError::Publish {
                path: report_path.display().to_string(),
                source,
            })?;

            // Report goes last so that a visible report implies visible outputs.
            for staged in [machine_staged, instance_staged, staged_report] {
                let path = staged.final_path().display().to_string();
                let published = staged
                    .commit()
                    .map_err(|source| PipelineError::Publish { path, source })?;
                info!(path = %published.display(), "Published artifact");
            }
            Ok::<(), PipelineError>(())
        })
        .await??;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );

        Ok(report)
    }

    async fn run_stages_concurrently(
        &self,
    ) -> Result<(MachineStage, TaskStage, InstanceStage), PipelineError> {
        let machine = {
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || machine_stage(&config))
        };
        let tasks = {
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || task_stage(&config))
        };
        let instances = {
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || instance_stage(&config))
        };

        let (machine, tasks, instances) = tokio::join!(machine, tasks, instances);
        let (machine, tasks, instances) = (machine?, tasks?, instances?);

        for err in [
            machine.as_ref().err(),
            tasks.as_ref().err(),
            instances.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        {
            error!(error = %err, "Stage failed");
        }

        Ok((machine?, tasks?, instances?))
    }

    async fn run_stages_sequentially(
        &self,
    ) -> Result<(MachineStage, TaskStage, InstanceStage), PipelineError> {
        let config = self.config.clone();
        let machine = tokio::task::spawn_blocking(move || machine_stage(&config)).await??;
        let config = self.config.clone();
        let tasks = tokio::task::spawn_blocking(move || task_stage(&config)).await??;
        let config = self.config.clone();
        let instances = tokio::task::spawn_blocking(move || instance_stage(&config)).await??;
        Ok((machine, tasks, instances))
    }
}

fn summary_builder<T: NumericColumns>(config: &Config) -> Option<SummaryBuilder<T>> {
    config
        .summary
        .enabled
        .then(|| SummaryBuilder::new(config.summary.max_values_per_column))
}

fn staged_sink(
    dataset: Dataset,
    path: &Path,
) -> Result<CsvSink<BufWriter<StagedFile>>, PipelineError> {
    let staged = StagedFile::create(path).map_err(|e| PipelineError::output(dataset, path, e))?;
    Ok(CsvSink::new(BufWriter::new(staged)))
}

fn unwrap_staged(
    dataset: Dataset,
    path: &Path,
    writer: BufWriter<StagedFile>,
) -> Result<StagedFile, PipelineError> {
    writer
        .into_inner()
        .map_err(|e| PipelineError::output(dataset, path, e.into_error()))
}

pub fn machine_stage(config: &Config) -> Result<MachineStage, PipelineError> {
    let dataset = Dataset::MachineEvents;
    let output_path = &config.outputs.machine_events;

    let reader = TraceReader::open(&config.inputs.machine_events)
        .map_err(|e| PipelineError::stage(dataset, e))?;
    let sink = staged_sink(dataset, output_path)?;

    let outcome = filter_machine_events(
        reader,
        sink,
        summary_builder(config),
        config.pipeline.progress_interval_rows,
    )
    .map_err(|e| PipelineError::stage(dataset, e))?;

    let report = outcome.report();
    let staged = unwrap_staged(dataset, output_path, outcome.output)?;

    Ok(MachineStage {
        staged,
        report,
        summary: outcome.summary,
    })
}

pub fn task_stage(config: &Config) -> Result<TaskStage, PipelineError> {
    let dataset = Dataset::BatchTasks;

    let reader = TraceReader::open(&config.inputs.batch_tasks)
        .map_err(|e| PipelineError::stage(dataset, e))?;
    let total = aggregate_tasks(reader, config.pipeline.progress_interval_rows)
        .map_err(|e| PipelineError::stage(dataset, e))?;

    Ok(TaskStage { total })
}

pub fn instance_stage(config: &Config) -> Result<InstanceStage, PipelineError> {
    let dataset = Dataset::BatchInstances;
    let output_path = &config.outputs.batch_instances;

    let reader = TraceReader::open(&config.inputs.batch_instances)
        .map_err(|e| PipelineError::stage(dataset, e))?;
    let sink = staged_sink(dataset, output_path)?;

    let outcome = validate_instances(
        reader,
        sink,
        summary_builder(config),
        config.pipeline.progress_interval_rows,
    )
    .map_err(|e| PipelineError::stage(dataset, e))?;

    let report = outcome.report();
    let staged = unwrap_staged(dataset, output_path, outcome.output)?;

    Ok(InstanceStage {
        staged,
        report,
        summary: outcome.summary,
    })
}
