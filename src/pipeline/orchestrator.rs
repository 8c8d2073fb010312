//! End-to-end evaluation run.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use super::config::PipelineConfig;
use crate::aggregate::{summarize_records, SummaryReport};
use crate::dataset::{load_combined, load_predictions, load_tasks, merge, natural_cmp};
use crate::error::{ConfigError, DataError};
use crate::evaluator::{
    checkpoint_path, load_previous, partition_pending, select_shard, write_output,
    BatchEvaluator,
};
use crate::judge::Judge;
use crate::metrics::JudgeMetrics;

/// Errors that abort a run. Record-level judging failures never do.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// What a run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output_file: PathBuf,
    /// Records written to the output file.
    pub records: usize,
    /// Records judged in this run, successfully or not.
    pub evaluated: usize,
    /// Judged records carried over by `--resume`.
    pub carried_over: usize,
    pub judged: usize,
    pub failed: usize,
    pub tasks_without_prediction: usize,
    pub orphan_predictions: usize,
    pub elapsed_secs: f64,
    pub summary: SummaryReport,
}

/// Loads, merges, judges and writes one batch.
pub struct EvaluationPipeline {
    config: PipelineConfig,
    judge: Arc<dyn Judge>,
    concurrency: usize,
    metrics: Option<Arc<JudgeMetrics>>,
}

impl EvaluationPipeline {
    pub fn new(
        config: PipelineConfig,
        judge: Arc<dyn Judge>,
        concurrency: usize,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            judge,
            concurrency,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<JudgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` for unreadable or malformed input, duplicate
    /// ids, or when the output cannot be written.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let config = &self.config;

        let (tasks, predictions) = match &config.dataset_file {
            Some(dataset) => (load_tasks(dataset)?, load_predictions(&config.input_file)?),
            None => load_combined(&config.input_file)?,
        };
        info!(
            tasks = tasks.len(),
            predictions = predictions.len(),
            "Loaded input files"
        );

        let merged = merge(&tasks, &predictions)?;
        let tasks_without_prediction = merged.tasks_without_prediction.len();
        let orphan_predictions = merged.orphan_predictions.len();

        let records = select_shard(merged.records, config.num_shards, config.shard_index)?;
        if config.num_shards > 1 {
            info!(
                shard = config.shard_index,
                num_shards = config.num_shards,
                records = records.len(),
                "Selected shard"
            );
        }

        let checkpoint = checkpoint_path(&config.output_file);
        let (pending, carried) = if config.resume {
            let previous = load_previous(&config.output_file)?;
            partition_pending(records, previous)
        } else {
            if checkpoint.exists() {
                warn!(
                    path = %checkpoint.display(),
                    "Discarding stale checkpoint; pass --resume to keep it"
                );
                remove_if_exists(&checkpoint)?;
            }
            (records, Vec::new())
        };
        if !carried.is_empty() {
            info!(
                carried_over = carried.len(),
                pending = pending.len(),
                "Resuming previous run"
            );
        }

        let mut evaluator = BatchEvaluator::new(self.judge.clone(), self.concurrency)
            .with_checkpoint(&checkpoint);
        if let Some(metrics) = &self.metrics {
            evaluator = evaluator.with_metrics(metrics.clone());
        }
        let outcome = evaluator.run(&pending).await?;
        let evaluated = outcome.records.len();

        let carried_over = carried.len();
        let mut all = carried;
        all.extend(outcome.records);
        all.sort_by(|a, b| natural_cmp(&a.id, &b.id));

        write_output(&config.output_file, &all)?;
        remove_if_exists(&checkpoint)?;
        info!(
            path = %config.output_file.display(),
            records = all.len(),
            "Wrote judged output"
        );

        if let (Some(metrics), Some(path)) = (&self.metrics, &config.metrics_file) {
            std::fs::write(path, metrics.export()?).map_err(|source| DataError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }

        let judged = all.iter().filter(|r| r.is_judged()).count();
        Ok(RunReport {
            output_file: config.output_file.clone(),
            records: all.len(),
            evaluated,
            carried_over,
            judged,
            failed: all.len() - judged,
            tasks_without_prediction,
            orphan_predictions,
            elapsed_secs: started.elapsed().as_secs_f64(),
            summary: summarize_records(&all),
        })
    }
}

fn remove_if_exists(path: &std::path::Path) -> Result<(), DataError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DataError::Write {
            path: path.display().to_string(),
            source,
        }),
    }
}
