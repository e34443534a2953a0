use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracesieve::config::parse_config;
use tracesieve::pipeline::{Pipeline, PipelineError};
use tracesieve::report::compare_reports;
use tracesieve::source::TraceReader;
use tracesieve::stages::{
    classify, is_add_event, validate_instances, ExclusionReason, ValidationCounts,
};
use tracesieve::storage::CsvSink;
use tracesieve::trace::{BatchInstance, MachineEvent};

const TASKS: &str = "\
0,100,1,10,3,Terminated,50,0.5
0,100,1,11,2,Terminated,50,0.5
0,100,1,12,,Waiting,,
0,100,1,13,3.0,Terminated,50,0.5
";

const INSTANCES: &str = "\
100,200,1,10,5,Terminated,1,1,1.0,0.50,0.1,0.05
,200,1,10,5,Terminated,2,1,,,,
100,,1,11,5,Failed,1,1,,,,
100,200,1,,5,Terminated,1,1,,,,
300,200,1,12,5,Terminated,1,1,,,,
-5,-1,1,12,5,Terminated,2,1,,,,
-5,10,1,12,5,Terminated,3,1,,,,
0,0,1,13,6,Terminated,1,1,2.0,1.0,0.2,0.1
100.0,200.0,1,13.0,6,Terminated,3,1,,,,
abc,50,1,13,6,Terminated,2,1,,,,
150,250,2,14,,Running,1,1,,,,
";

const VALID_INSTANCES: &str = "\
100,200,1,10,5,Terminated,1,1,1.0,0.50,0.1,0.05
0,0,1,13,6,Terminated,1,1,2.0,1.0,0.2,0.1
100.0,200.0,1,13.0,6,Terminated,3,1,,,,
150,250,2,14,,Running,1,1,,,,
";

/// 1313 `add` rows with identical capacity, interleaved with error events.
fn machine_events_fixture() -> (String, String) {
    let mut all = String::new();
    let mut adds = String::new();
    for i in 0..1313u64 {
        let add = format!("{},{},add,,64,0.692729,1\n", i * 10, 1000 + i);
        all.push_str(&add);
        adds.push_str(&add);
        if i % 100 == 0 {
            all.push_str(&format!("{},{},softerror,disk,,,\n", i * 10 + 1, 1000 + i));
        }
        if i % 250 == 0 {
            all.push_str(&format!("{},{},harderror,,,,\n", i * 10 + 2, 1000 + i));
        }
    }
    all.push_str("99999,5,decommission,,,,\n");
    (all, adds)
}

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new(machine_events: &str, tasks: &str, instances: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join("server_event.csv"), machine_events).unwrap();
        fs::write(root.join("batch_task.csv"), tasks).unwrap();
        fs::write(root.join("batch_instance.csv"), instances).unwrap();
        Self { _dir: dir, root }
    }

    fn out(&self, name: &str) -> PathBuf {
        self.root.join(name).join("prepared")
    }

    fn config_yaml(&self, out_dir: &Path, parallel: bool) -> String {
        format!(
            r#"
inputs:
  machine_events: {root}/server_event.csv
  batch_tasks: {root}/batch_task.csv
  batch_instances: {root}/batch_instance.csv
outputs:
  machine_events: {out}/machine_events_add.csv
  batch_instances: {out}/batch_instance_valid.csv
  report: {out}/report.json
pipeline:
  parallel: {parallel}
  progress_interval_rows: 500
"#,
            root = self.root.display(),
            out = out_dir.display(),
            parallel = parallel,
        )
    }

    async fn run(&self, out_dir: &Path, parallel: bool) -> Result<tracesieve::report::RunReport, PipelineError> {
        let config = parse_config(&self.config_yaml(out_dir, parallel)).unwrap();
        Pipeline::new(config).run().await
    }
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_full_pipeline_outputs_and_report() {
    let (machine_events, adds) = machine_events_fixture();
    let fixture = Fixture::new(&machine_events, TASKS, INSTANCES);
    let out = fixture.out("run");

    let report = fixture.run(&out, true).await.unwrap();

    assert_eq!(
        fs::read_to_string(out.join("machine_events_add.csv")).unwrap(),
        adds
    );
    assert_eq!(
        fs::read_to_string(out.join("batch_instance_valid.csv")).unwrap(),
        VALID_INSTANCES
    );
    assert_eq!(
        dir_entries(&out),
        vec![
            "batch_instance_valid.csv".to_string(),
            "machine_events_add.csv".to_string(),
            "report.json".to_string(),
        ]
    );

    let machine = &report.machine_events;
    assert_eq!(machine.output_rows, 1313);
    assert_eq!(machine.artifact.rows, 1313);
    assert_eq!(machine.event_types["add"], 1313);
    assert_eq!(machine.event_types["softerror"], 14);
    assert_eq!(machine.event_types["harderror"], 6);
    assert_eq!(machine.event_types["other"], 1);
    assert_eq!(machine.input_rows, 1313 + 14 + 6 + 1);

    let instances = &report.batch_instances;
    assert_eq!(instances.input_rows, 11);
    assert_eq!(instances.valid_rows, 4);
    assert_eq!(instances.excluded_rows, 7);
    assert_eq!(instances.valid_rows + instances.excluded_rows, instances.input_rows);
    assert_eq!(instances.exclusions["missing-start"], 2);
    assert_eq!(instances.exclusions["missing-end"], 1);
    assert_eq!(instances.exclusions["missing-task-id"], 1);
    assert_eq!(instances.exclusions["inverted-interval"], 1);
    assert_eq!(instances.exclusions["negative-end"], 1);
    assert_eq!(instances.exclusions["negative-start"], 1);

    let tasks = &report.batch_tasks;
    assert_eq!(tasks.input_rows, 4);
    assert_eq!(tasks.declared_total, 8);
    assert_eq!(tasks.declared_total_excluded_count, 1);

    let rec = &report.reconciliation;
    assert_eq!(rec.raw_instance_count, 11);
    assert_eq!(rec.valid_instance_count, 4);
    assert_eq!(rec.declared_minus_raw, -3);
    assert_eq!(rec.declared_minus_valid, 4);
    assert_eq!(rec.raw_minus_valid, 7);

    let on_disk = fs::read_to_string(out.join("report.json")).unwrap();
    assert_eq!(on_disk, report.to_json().unwrap());
}

#[tokio::test]
async fn test_machine_event_summary_matches_known_capacity() {
    let (machine_events, _) = machine_events_fixture();
    let fixture = Fixture::new(&machine_events, TASKS, INSTANCES);
    let report = fixture.run(&fixture.out("run"), true).await.unwrap();

    let summary = &report.summaries["machine_events"];
    assert_eq!(summary.rows, 1313);

    let cpus = &summary.columns["number_of_cpus"];
    assert_eq!(cpus.count, 1313);
    assert_eq!(cpus.mean, Some(64.0));
    assert_eq!(cpus.std, Some(0.0));
    assert_eq!(cpus.min, Some(64.0));
    assert_eq!(cpus.max, Some(64.0));

    let memory = &summary.columns["normalized_memory"];
    assert_eq!(memory.count, 1313);
    assert!((memory.mean.unwrap() - 0.692729).abs() < 1e-6);
    assert!((memory.p50.unwrap() - 0.692729).abs() < 1e-12);
}

#[tokio::test]
async fn test_filtered_output_is_ordered_subsequence_of_adds() {
    let (machine_events, _) = machine_events_fixture();
    let fixture = Fixture::new(&machine_events, TASKS, INSTANCES);
    let out = fixture.out("run");
    fixture.run(&out, false).await.unwrap();

    let input_adds: Vec<MachineEvent> =
        TraceReader::<_, MachineEvent>::from_reader(machine_events.as_bytes(), "input")
            .map(|row| row.unwrap().record)
            .filter(is_add_event)
            .collect();

    let output = fs::read_to_string(out.join("machine_events_add.csv")).unwrap();
    let output_rows: Vec<MachineEvent> =
        TraceReader::<_, MachineEvent>::from_reader(output.as_bytes(), "output")
            .map(|row| row.unwrap().record)
            .collect();

    assert!(output_rows.iter().all(is_add_event));
    assert_eq!(output_rows, input_adds);
}

#[tokio::test]
async fn test_validated_output_is_idempotent() {
    let fixture = Fixture::new("", TASKS, INSTANCES);
    let out = fixture.out("run");
    fixture.run(&out, true).await.unwrap();

    let valid = fs::read(out.join("batch_instance_valid.csv")).unwrap();
    let outcome = validate_instances(
        TraceReader::<_, BatchInstance>::from_reader(valid.as_slice(), "batch_instance_valid.csv"),
        CsvSink::new(Vec::new()),
        None,
        1_000,
    )
    .unwrap();

    let report = outcome.report();
    assert_eq!(report.excluded_rows, 0);
    assert_eq!(report.valid_rows, 4);
    assert_eq!(outcome.output, valid);
}

#[tokio::test]
async fn test_runs_are_deterministic_across_modes() {
    let (machine_events, _) = machine_events_fixture();
    let fixture = Fixture::new(&machine_events, TASKS, INSTANCES);
    let first = fixture.out("first");
    let second = fixture.out("second");

    let parallel = fixture.run(&first, true).await.unwrap();
    let sequential = fixture.run(&second, false).await.unwrap();

    assert_eq!(parallel, sequential);
    for name in ["machine_events_add.csv", "batch_instance_valid.csv", "report.json"] {
        assert_eq!(
            fs::read(first.join(name)).unwrap(),
            fs::read(second.join(name)).unwrap(),
            "{} differs between runs",
            name
        );
    }

    let comparison = compare_reports(
        &fs::read_to_string(first.join("report.json")).unwrap(),
        &fs::read_to_string(second.join("report.json")).unwrap(),
        "first",
        "second",
    )
    .unwrap();
    assert!(comparison.identical);
}

#[tokio::test]
async fn test_malformed_row_publishes_nothing() {
    let (machine_events, _) = machine_events_fixture();
    let broken = format!("{}100,200,1,15,5,Terminated,x,1,,,,\n", INSTANCES);
    let fixture = Fixture::new(&machine_events, TASKS, &broken);
    let out = fixture.out("run");

    for parallel in [true, false] {
        let err = fixture.run(&out, parallel).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("batch_instance.csv"), "{}", message);
        assert!(message.contains("line 12"), "{}", message);
        assert!(message.contains("sequence_number"), "{}", message);

        assert!(!out.join("machine_events_add.csv").exists());
        assert!(!out.join("batch_instance_valid.csv").exists());
        assert!(!out.join("report.json").exists());
        assert!(
            dir_entries(&out).is_empty(),
            "leftover files: {:?}",
            dir_entries(&out)
        );
    }
}

#[tokio::test]
async fn test_schema_mismatch_aborts_run() {
    let fixture = Fixture::new("1,2,add,,64,0.5\n", TASKS, INSTANCES);
    let out = fixture.out("run");

    let err = fixture.run(&out, true).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("server_event.csv"), "{}", message);
    assert!(message.contains("expected 7 columns, found 6"), "{}", message);
    assert!(dir_entries(&out).is_empty());
}

#[tokio::test]
async fn test_missing_input_file_is_reported() {
    let fixture = Fixture::new("", TASKS, INSTANCES);
    fs::remove_file(fixture.root.join("batch_task.csv")).unwrap();
    let out = fixture.out("run");

    let err = fixture.run(&out, false).await.unwrap_err();
    assert!(err.to_string().contains("batch_task.csv"));
    assert!(dir_entries(&out).is_empty());
}

#[tokio::test]
async fn test_empty_inputs_produce_empty_outputs() {
    let fixture = Fixture::new("", "", "");
    let out = fixture.out("run");
    let report = fixture.run(&out, true).await.unwrap();

    assert_eq!(fs::read(out.join("machine_events_add.csv")).unwrap(), b"");
    assert_eq!(fs::read(out.join("batch_instance_valid.csv")).unwrap(), b"");
    assert_eq!(report.machine_events.input_rows, 0);
    assert_eq!(report.batch_instances.input_rows, 0);
    assert_eq!(report.reconciliation.declared_total, 0);
    assert_eq!(
        report.machine_events.artifact.sha256,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );

    let cpus = &report.summaries["machine_events"].columns["number_of_cpus"];
    assert_eq!(cpus.count, 0);
    assert_eq!(cpus.mean, None);
}

#[test]
fn test_validation_counts_are_chunk_invariant() {
    let rows: Vec<BatchInstance> =
        TraceReader::<_, BatchInstance>::from_reader(INSTANCES.as_bytes(), "batch_instance.csv")
            .map(|row| row.unwrap().record)
            .collect();

    let mut whole = ValidationCounts::default();
    for row in &rows {
        whole.record(classify(row));
    }

    for split in 0..=rows.len() {
        let (left, right) = rows.split_at(split);
        let mut a = ValidationCounts::default();
        let mut b = ValidationCounts::default();
        left.iter().for_each(|row| a.record(classify(row)));
        right.iter().for_each(|row| b.record(classify(row)));
        a.merge(&b);
        assert_eq!(a, whole, "split at {}", split);
    }

    assert_eq!(whole.excluded(ExclusionReason::MissingStart), 2);
    assert_eq!(whole.valid() + whole.total_excluded(), rows.len() as u64);
}
