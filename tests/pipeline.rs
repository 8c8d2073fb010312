//! End-to-end tests for the evaluation pipeline with a deterministic judge.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use longchain_judge::aggregate::{load_and_summarize, Average};
use longchain_judge::dataset::TaskType;
use longchain_judge::error::{DataError, JudgeError};
use longchain_judge::evaluator::{checkpoint_path, read_output, RecordStatus};
use longchain_judge::judge::{Judge, JudgeInput, Verdict, VerdictLabel};
use longchain_judge::metrics::JudgeMetrics;
use longchain_judge::pipeline::{EvaluationPipeline, PipelineConfig, PipelineError};

/// Scores 1.0 on an exact (trimmed) match, 0.0 otherwise.
struct ExactMatchJudge;

#[async_trait]
impl Judge for ExactMatchJudge {
    fn model(&self) -> &str {
        "exact-match"
    }

    async fn judge(&self, input: &JudgeInput<'_>) -> Result<Verdict, JudgeError> {
        input.validate()?;
        if input.prediction == "UNPARSEABLE" {
            return Err(JudgeError::Parse("no verdict object or score line".to_string()));
        }
        let score = if input.prediction.trim() == input.answer.trim() {
            1.0
        } else {
            0.0
        };
        Ok(Verdict {
            score,
            label: VerdictLabel::from_score(score),
            rationale: Some("exact comparison".to_string()),
        })
    }
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn dataset() -> Value {
    json!([
        {"id": "1", "name": "capital", "type": "global", "instruction": "Capital of France?", "answer": "Paris"},
        {"id": "2", "name": "answer", "type": "causal", "instruction": "The answer?", "answer": "42"}
    ])
}

fn predictions() -> Value {
    json!([
        {"id": "2", "prediction": "41", "nsteps": 7},
        {"id": "1", "prediction": "Paris", "nsteps": 3}
    ])
}

fn pipeline(config: PipelineConfig) -> EvaluationPipeline {
    EvaluationPipeline::new(config, Arc::new(ExactMatchJudge), 2).unwrap()
}

#[tokio::test]
async fn test_two_task_scenario() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    write_json(&tasks, &dataset());
    write_json(&preds, &predictions());

    let config = PipelineConfig::new(&preds, &output).with_dataset_file(&tasks);
    let report = pipeline(config).run().await.unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(report.judged, 2);
    assert_eq!(report.failed, 0);

    let records = read_output(&output).unwrap();
    assert_eq!(records[0].id, "1");
    assert_eq!(records[0].score, Some(1.0));
    assert_eq!(records[0].nsteps, 3);
    assert_eq!(records[1].id, "2");
    assert_eq!(records[1].score, Some(0.0));
    assert_eq!(records[1].task_type, TaskType::Causal);

    assert_eq!(report.summary.average_score, Average::Value(0.5));
    assert_eq!(
        report.summary.group(TaskType::Global).unwrap().average_score,
        Average::Value(1.0)
    );
    assert_eq!(
        report.summary.group(TaskType::Causal).unwrap().average_score,
        Average::Value(0.0)
    );

    // The standalone summary agrees with the one computed during the run.
    assert_eq!(load_and_summarize(&output).unwrap(), report.summary);
    assert!(!checkpoint_path(&output).exists());
}

#[tokio::test]
async fn test_orphan_prediction_is_excluded() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    write_json(&tasks, &dataset());

    let mut with_orphan = predictions();
    with_orphan
        .as_array_mut()
        .unwrap()
        .push(json!({"id": "3", "prediction": "stray", "nsteps": 1}));
    write_json(&preds, &with_orphan);

    let config = PipelineConfig::new(&preds, &output).with_dataset_file(&tasks);
    let report = pipeline(config).run().await.unwrap();

    assert_eq!(report.orphan_predictions, 1);
    let ids: Vec<String> = read_output(&output)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_reruns_are_identical_except_timestamps() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    write_json(&tasks, &dataset());
    write_json(&preds, &predictions());

    let mut outputs = Vec::new();
    for name in ["first.json", "second.json"] {
        let output = dir.path().join(name);
        let config = PipelineConfig::new(&preds, &output).with_dataset_file(&tasks);
        pipeline(config).run().await.unwrap();

        let mut value: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        for entry in value.as_array_mut().unwrap() {
            entry.as_object_mut().unwrap().remove("judged_at");
        }
        outputs.push(value);
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_combined_predictions_file_without_dataset() {
    let dir = TempDir::new().unwrap();
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    write_json(
        &preds,
        &json!([
            {"folder": 10, "type": "Global", "instruct": "Open the page", "answer": "done", "prediction": "done", "nsteps": 12},
            {"folder": 9, "type": "causal", "instruct": "Explain", "answer": {"reason": "rain"}, "prediction": null, "nsteps": 4}
        ]),
    );

    let report = pipeline(PipelineConfig::new(&preds, &output))
        .run()
        .await
        .unwrap();

    assert_eq!(report.judged, 1);
    assert_eq!(report.failed, 1);

    let records = read_output(&output).unwrap();
    assert_eq!(records[0].id, "9");
    assert_eq!(records[0].status, RecordStatus::Failed);
    assert_eq!(records[0].answer, r#"{"reason":"rain"}"#);
    assert_eq!(records[1].id, "10");
    assert_eq!(records[1].task_type, TaskType::Global);
    assert_eq!(records[1].score, Some(1.0));
}

#[tokio::test]
async fn test_failed_record_does_not_abort_batch() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    write_json(&tasks, &dataset());
    write_json(
        &preds,
        &json!([
            {"id": "1", "prediction": "Paris", "nsteps": 3},
            {"id": "2", "prediction": "UNPARSEABLE", "nsteps": 7}
        ]),
    );

    let config = PipelineConfig::new(&preds, &output).with_dataset_file(&tasks);
    let report = pipeline(config).run().await.unwrap();

    assert_eq!(report.judged, 1);
    assert_eq!(report.failed, 1);

    let summary = load_and_summarize(&output).unwrap();
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.average_score, Average::Value(1.0));
    assert_eq!(
        summary.group(TaskType::Causal).unwrap().average_score,
        Average::NoData
    );
}

#[tokio::test]
async fn test_resume_keeps_judged_and_retries_failed() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    write_json(&tasks, &dataset());
    write_json(
        &preds,
        &json!([
            {"id": "1", "prediction": "Paris", "nsteps": 3},
            {"id": "2", "prediction": "UNPARSEABLE", "nsteps": 7}
        ]),
    );

    let config = PipelineConfig::new(&preds, &output).with_dataset_file(&tasks);
    pipeline(config.clone()).run().await.unwrap();
    let first_run = read_output(&output).unwrap();

    write_json(&preds, &predictions());
    let report = pipeline(config.with_resume(true)).run().await.unwrap();

    assert_eq!(report.carried_over, 1);
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.failed, 0);

    let records = read_output(&output).unwrap();
    assert_eq!(records[0], first_run[0]);
    assert_eq!(records[1].status, RecordStatus::Judged);
    assert_eq!(records[1].score, Some(0.0));
}

#[tokio::test]
async fn test_resume_rejudges_changed_prediction() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    write_json(&tasks, &dataset());
    write_json(&preds, &predictions());

    let config = PipelineConfig::new(&preds, &output).with_dataset_file(&tasks);
    pipeline(config.clone()).run().await.unwrap();
    let first_run = read_output(&output).unwrap();
    assert_eq!(first_run[0].score, Some(1.0));

    write_json(
        &preds,
        &json!([
            {"id": "1", "prediction": "Lyon", "nsteps": 9},
            {"id": "2", "prediction": "41", "nsteps": 7}
        ]),
    );
    let report = pipeline(config.with_resume(true)).run().await.unwrap();

    assert_eq!(report.carried_over, 1);
    assert_eq!(report.evaluated, 1);

    let records = read_output(&output).unwrap();
    assert_eq!(records[0].prediction, "Lyon");
    assert_eq!(records[0].nsteps, 9);
    assert_eq!(records[0].score, Some(0.0));
    assert_eq!(records[1], first_run[1]);
}

#[tokio::test]
async fn test_shards_cover_the_batch() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    write_json(&tasks, &dataset());
    write_json(&preds, &predictions());

    let mut ids = Vec::new();
    for shard in 0..2 {
        let output = dir.path().join(format!("shard-{}.json", shard));
        let config = PipelineConfig::new(&preds, &output)
            .with_dataset_file(&tasks)
            .with_shard(2, shard);
        let report = pipeline(config).run().await.unwrap();
        assert_eq!(report.records, 1);
        ids.extend(read_output(&output).unwrap().into_iter().map(|r| r.id));
    }

    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_duplicate_ids_abort_the_run() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    write_json(&tasks, &dataset());
    write_json(
        &preds,
        &json!([
            {"id": "1", "prediction": "Paris", "nsteps": 3},
            {"id": "1", "prediction": "Lyon", "nsteps": 5}
        ]),
    );

    let config = PipelineConfig::new(&preds, &output).with_dataset_file(&tasks);
    let err = pipeline(config).run().await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Data(DataError::DuplicateKey { .. })
    ));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_metrics_file_is_written() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.json");
    let preds = dir.path().join("preds.json");
    let output = dir.path().join("judged.json");
    let metrics_file = dir.path().join("metrics.prom");
    write_json(&tasks, &dataset());
    write_json(&preds, &predictions());

    let metrics = Arc::new(JudgeMetrics::new().unwrap());
    let config = PipelineConfig::new(&preds, &output)
        .with_dataset_file(&tasks)
        .with_metrics_file(&metrics_file);
    pipeline(config).with_metrics(metrics).run().await.unwrap();

    let text = std::fs::read_to_string(&metrics_file).unwrap();
    assert!(text.contains("judge_records_total{status=\"judged\"} 2"));
}

#[tokio::test]
async fn test_missing_input_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::new(dir.path().join("nope.json"), dir.path().join("out.json"));
    let err = pipeline(config).run().await.unwrap_err();
    assert!(matches!(err, PipelineError::Data(DataError::Io { .. })));
}
