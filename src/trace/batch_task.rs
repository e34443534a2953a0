use super::field::{text, tri_state, whole_number, Field, FieldError};
use super::{Dataset, TraceRecord};
use csv::StringRecord;

/// Declared batch task. Only `number_of_instances` takes part in
/// reconciliation, so no column of this record is fatal when malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTask {
    pub task_create_time: Field<i64>,
    pub task_end_time: Field<i64>,
    pub job_id: Field<i64>,
    pub task_id: Field<i64>,
    pub number_of_instances: Field<i64>,
    pub status: String,
    pub cpus_requested_per_instance: Field<i64>,
    pub normalized_memory_requested_per_instance: Field<f64>,
}

impl TraceRecord for BatchTask {
    const DATASET: Dataset = Dataset::BatchTasks;
    const COLUMNS: &'static [&'static str] = &[
        "task_create_time",
        "task_end_time",
        "job_id",
        "task_id",
        "number_of_instances",
        "status",
        "number_of_cpus_requested_per_instance",
        "normalized_memory_requested_per_instance",
    ];

    fn from_record(record: &StringRecord) -> Result<Self, FieldError> {
        Ok(Self {
            task_create_time: tri_state(record, 0),
            task_end_time: tri_state(record, 1),
            job_id: tri_state(record, 2),
            task_id: tri_state(record, 3),
            number_of_instances: whole_number(record, 4),
            status: text(record, 5),
            cpus_requested_per_instance: tri_state(record, 6),
            normalized_memory_requested_per_instance: tri_state(record, 7),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_row() {
        let row = StringRecord::from(vec![
            "86919", "86927", "1", "1", "1", "Terminated", "50", "0.0032",
        ]);
        let task = BatchTask::from_record(&row).unwrap();
        assert_eq!(task.number_of_instances, Field::Present(1));
        assert_eq!(task.cpus_requested_per_instance, Field::Present(50));
        assert_eq!(
            task.normalized_memory_requested_per_instance,
            Field::Present(0.0032)
        );
        assert_eq!(task.status, "Terminated");
    }

    #[test]
    fn test_integral_decimal_instance_count() {
        let row = StringRecord::from(vec!["1", "2", "3", "4", "3.0", "Terminated", "", ""]);
        let task = BatchTask::from_record(&row).unwrap();
        assert_eq!(task.number_of_instances, Field::Present(3));
    }

    #[test]
    fn test_bad_instance_count_is_not_fatal() {
        let row = StringRecord::from(vec!["1", "2", "3", "4", "many", "Failed", "", ""]);
        let task = BatchTask::from_record(&row).unwrap();
        assert_eq!(
            task.number_of_instances,
            Field::Unparsable("many".to_string())
        );
        assert_eq!(task.cpus_requested_per_instance, Field::Absent);
    }
}
