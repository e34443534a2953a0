pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# TRACESIEVE CONFIGURATION
# =============================================================================
# Filters, validates and reconciles a raw cluster trace (machine events, batch
# tasks, batch instances) into the datasets a cluster simulator replays.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/tracesieve/config.yml
#   3. /etc/tracesieve/config.yml
#
# Paths may use ~ and $env{VAR} expansion.

# =============================================================================
# INPUTS
# =============================================================================
# Headerless, comma-separated trace files. Column order is fixed:
#   machine_events:  timestamp, machine_id, event_type, event_detail,
#                    number_of_cpus, normalized_memory, normalized_disk_space
#   batch_tasks:     task_create_time, task_end_time, job_id, task_id,
#                    number_of_instances, status, cpus_requested,
#                    normalized_memory_requested
#   batch_instances: start_timestamp, end_timestamp, job_id, task_id,
#                    machine_id, status, sequence_number,
#                    total_sequence_number, max/avg real cpu,
#                    max/avg normalized memory usage

inputs:
  machine_events: $env{TRACE_DIR}/server_event.csv
  batch_tasks: $env{TRACE_DIR}/batch_task.csv
  batch_instances: $env{TRACE_DIR}/batch_instance.csv

# =============================================================================
# OUTPUTS
# =============================================================================
# machine_events:  "add" events only, same 7 columns, no header
# batch_instances: valid instances only, same 12 columns, no header
# report:          JSON counts, exclusion breakdown, reconciliation, summaries
#
# Outputs are written to a hidden partial file and renamed into place only
# after every stage succeeded.

outputs:
  machine_events: $env{TRACE_DIR}/prepared/machine_events_add.csv
  batch_instances: $env{TRACE_DIR}/prepared/batch_instance_valid.csv
  report: $env{TRACE_DIR}/prepared/report.json

# =============================================================================
# PIPELINE
# =============================================================================

pipeline:
  # Process the three input files concurrently
  parallel: true
  # Log progress every N rows per file
  progress_interval_rows: 1000000

# =============================================================================
# SUMMARY
# =============================================================================
# Descriptive statistics of the filtered/validated outputs, used to verify a
# run against a baseline report (`tracesieve verify --baseline ...`).

summary:
  enabled: true
  # Values buffered per numeric column; exceeding it fails the run
  max_values_per_column: 64000000
"#
    .to_string()
}
