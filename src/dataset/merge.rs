//! Inner join of tasks and predictions on id.

use std::collections::HashMap;

use super::records::{MergedRecord, PredictionRecord, TaskRecord};
use crate::error::DataError;

/// Outcome of a merge: the joined records plus the ids left out on either side.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Joined records, in dataset order.
    pub records: Vec<MergedRecord>,
    /// Tasks with no prediction.
    pub tasks_without_prediction: Vec<String>,
    /// Predictions whose id is not in the dataset.
    pub orphan_predictions: Vec<String>,
}

impl MergeReport {
    pub fn skipped(&self) -> usize {
        self.tasks_without_prediction.len() + self.orphan_predictions.len()
    }
}

/// Joins predictions onto tasks by id.
///
/// Duplicate ids on either side fail with [`DataError::DuplicateKey`], naming
/// the first duplicate in input order. Ids present on only one side are
/// excluded and logged.
pub fn merge(
    tasks: &[TaskRecord],
    predictions: &[PredictionRecord],
) -> Result<MergeReport, DataError> {
    check_unique("task", tasks.iter().map(|t| t.id.as_str()))?;
    let by_id = check_unique("prediction", predictions.iter().map(|p| p.id.as_str()))?;

    let mut report = MergeReport::default();
    let mut matched = vec![false; predictions.len()];

    for task in tasks {
        match by_id.get(task.id.as_str()) {
            Some(&index) => {
                matched[index] = true;
                report
                    .records
                    .push(MergedRecord::new(task.clone(), &predictions[index]));
            }
            None => {
                tracing::warn!(id = %task.id, "Task has no prediction; excluded from evaluation");
                report.tasks_without_prediction.push(task.id.clone());
            }
        }
    }

    for (prediction, seen) in predictions.iter().zip(matched) {
        if !seen {
            tracing::warn!(
                id = %prediction.id,
                "Prediction references an id missing from the dataset; excluded from evaluation"
            );
            report.orphan_predictions.push(prediction.id.clone());
        }
    }

    tracing::info!(
        merged = report.records.len(),
        tasks_without_prediction = report.tasks_without_prediction.len(),
        orphan_predictions = report.orphan_predictions.len(),
        "Merged predictions onto tasks"
    );

    Ok(report)
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<&'a str, usize>, DataError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (index, id) in ids.enumerate() {
        if let Some(&first_index) = seen.get(id) {
            return Err(DataError::DuplicateKey {
                kind,
                id: id.to_string(),
                first_index,
                second_index: index,
            });
        }
        seen.insert(id, index);
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::records::TaskType;

    fn task(id: &str, task_type: TaskType, answer: &str) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            name: format!("task {}", id),
            task_type,
            instruction: format!("instruction {}", id),
            answer: answer.to_string(),
        }
    }

    fn prediction(id: &str, text: &str, nsteps: u32) -> PredictionRecord {
        PredictionRecord {
            id: id.to_string(),
            prediction: text.to_string(),
            nsteps,
        }
    }

    #[test]
    fn test_merge_joins_on_id() {
        let tasks = vec![
            task("1", TaskType::Global, "Paris"),
            task("2", TaskType::Causal, "42"),
        ];
        let predictions = vec![prediction("2", "41", 7), prediction("1", "Paris", 3)];

        let report = merge(&tasks, &predictions).expect("merge should succeed");
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].id(), "1");
        assert_eq!(report.records[0].prediction, "Paris");
        assert_eq!(report.records[0].nsteps, 3);
        assert_eq!(report.records[1].id(), "2");
        assert_eq!(report.records[1].prediction, "41");
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn test_merge_excludes_one_sided_ids() {
        let tasks = vec![
            task("1", TaskType::Global, "Paris"),
            task("4", TaskType::Global, "x"),
        ];
        let predictions = vec![prediction("1", "Paris", 1), prediction("3", "??", 2)];

        let report = merge(&tasks, &predictions).expect("merge should succeed");
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].id(), "1");
        assert_eq!(report.tasks_without_prediction, vec!["4".to_string()]);
        assert_eq!(report.orphan_predictions, vec!["3".to_string()]);
        assert!(report.records.iter().all(|r| r.id() != "3"));
    }

    #[test]
    fn test_merge_duplicate_prediction_fails() {
        let tasks = vec![task("1", TaskType::Global, "Paris")];
        let predictions = vec![
            prediction("1", "Paris", 1),
            prediction("2", "x", 1),
            prediction("1", "Lyon", 2),
        ];

        match merge(&tasks, &predictions) {
            Err(DataError::DuplicateKey {
                kind,
                id,
                first_index,
                second_index,
            }) => {
                assert_eq!(kind, "prediction");
                assert_eq!(id, "1");
                assert_eq!(first_index, 0);
                assert_eq!(second_index, 2);
            }
            other => panic!("expected DuplicateKey, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_duplicate_task_fails() {
        let tasks = vec![
            task("1", TaskType::Global, "Paris"),
            task("1", TaskType::Causal, "42"),
        ];
        let result = merge(&tasks, &[]);
        assert!(matches!(
            result,
            Err(DataError::DuplicateKey { kind: "task", .. })
        ));
    }

    #[test]
    fn test_merge_empty_inputs() {
        let report = merge(&[], &[]).expect("empty merge is fine");
        assert!(report.records.is_empty());
        assert_eq!(report.skipped(), 0);
    }
}
