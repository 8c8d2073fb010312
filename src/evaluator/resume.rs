//! Resuming an interrupted or partially failed run.

use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::checkpoint::{checkpoint_path, read_checkpoint};
use super::output::{read_output, OutputRecord};
use crate::dataset::MergedRecord;
use crate::error::DataError;

/// Judged records from a previous run of `output`, keyed by id.
///
/// Reads the output file and any leftover checkpoint; a checkpoint entry
/// overrides the output file entry for the same id. Failed records are
/// dropped so they get judged again.
pub fn load_previous(output: &Path) -> Result<HashMap<String, OutputRecord>, DataError> {
    let mut previous = HashMap::new();

    if output.exists() {
        for record in read_output(output)? {
            previous.insert(record.id.clone(), record);
        }
    }

    let checkpoint = checkpoint_path(output);
    if checkpoint.exists() {
        for record in read_checkpoint(&checkpoint)? {
            previous.insert(record.id.clone(), record);
        }
    }

    previous.retain(|_, record| record.is_judged());
    info!(
        output = %output.display(),
        judged = previous.len(),
        "Loaded previously judged records"
    );
    Ok(previous)
}

/// Splits `records` into those still to judge and previous results to keep.
///
/// A previous result is kept only when it was judged on the same
/// instruction, answer, prediction and step count; otherwise the record is
/// judged again. Previous results for ids no longer in `records` are
/// discarded.
pub fn partition_pending(
    records: Vec<MergedRecord>,
    mut previous: HashMap<String, OutputRecord>,
) -> (Vec<MergedRecord>, Vec<OutputRecord>) {
    let mut pending = Vec::new();
    let mut kept = Vec::new();

    for record in records {
        match previous.remove(record.id()) {
            Some(old) if judged_on(&old, &record) => kept.push(old),
            Some(_) => {
                warn!(id = %record.id(), "Input changed since the previous run; judging again");
                pending.push(record);
            }
            None => pending.push(record),
        }
    }
    (pending, kept)
}

fn judged_on(old: &OutputRecord, record: &MergedRecord) -> bool {
    old.instruction == record.task.instruction
        && old.answer == record.task.answer
        && old.prediction == record.prediction
        && old.nsteps == record.nsteps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{PredictionRecord, TaskRecord, TaskType};
    use crate::error::JudgeError;
    use crate::evaluator::output::write_output;
    use crate::judge::{Verdict, VerdictLabel};
    use chrono::Utc;
    use tempfile::TempDir;

    fn merged(id: &str) -> MergedRecord {
        let task = TaskRecord {
            id: id.to_string(),
            name: String::new(),
            task_type: TaskType::Global,
            instruction: "Do it".to_string(),
            answer: "done".to_string(),
        };
        let prediction = PredictionRecord {
            id: id.to_string(),
            prediction: "done".to_string(),
            nsteps: 1,
        };
        MergedRecord::new(task, &prediction)
    }

    fn judged(id: &str) -> OutputRecord {
        let verdict = Verdict {
            score: 1.0,
            label: VerdictLabel::Correct,
            rationale: None,
        };
        OutputRecord::judged(&merged(id), verdict, "m", Utc::now())
    }

    fn failed(id: &str) -> OutputRecord {
        let err = JudgeError::Fatal("401".to_string());
        OutputRecord::failed(&merged(id), &err, "m", Utc::now())
    }

    #[test]
    fn test_load_previous_missing_files() {
        let dir = TempDir::new().unwrap();
        let previous = load_previous(&dir.path().join("out.json")).unwrap();
        assert!(previous.is_empty());
    }

    #[test]
    fn test_load_previous_merges_output_and_checkpoint() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.json");
        write_output(&output, &[judged("1"), failed("2")]).unwrap();

        let lines = [judged("2"), failed("3")]
            .iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(checkpoint_path(&output), lines).unwrap();

        let previous = load_previous(&output).unwrap();
        let mut ids: Vec<&String> = previous.keys().collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_partition_pending() {
        let records = vec![merged("1"), merged("2"), merged("3")];
        let mut previous = HashMap::new();
        previous.insert("2".to_string(), judged("2"));
        previous.insert("9".to_string(), judged("9"));

        let (pending, kept) = partition_pending(records, previous);

        let pending_ids: Vec<&str> = pending.iter().map(|r| r.id()).collect();
        assert_eq!(pending_ids, vec!["1", "3"]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "2");
    }

    #[test]
    fn test_partition_pending_rejudges_changed_input() {
        let mut changed = merged("1");
        changed.prediction = "not done".to_string();
        let mut more_steps = merged("2");
        more_steps.nsteps = 9;
        let mut new_answer = merged("3");
        new_answer.task.answer = "finished".to_string();

        let previous: HashMap<String, OutputRecord> = ["1", "2", "3", "4"]
            .into_iter()
            .map(|id| (id.to_string(), judged(id)))
            .collect();
        let records = vec![changed, more_steps, new_answer, merged("4")];

        let (pending, kept) = partition_pending(records, previous);

        let pending_ids: Vec<&str> = pending.iter().map(|r| r.id()).collect();
        assert_eq!(pending_ids, vec!["1", "2", "3"]);
        assert_eq!(pending[0].prediction, "not done");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "4");
    }
}
