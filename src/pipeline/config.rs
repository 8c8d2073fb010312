//! Run configuration for the evaluation pipeline.
//!
//! File locations and the selection of records a run judges. Judge settings
//! live in [`JudgeConfig`](crate::config::JudgeConfig).

use std::path::PathBuf;

use crate::error::ConfigError;

/// What one `evaluate` run reads, writes, and judges.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Predictions file. Also the task source when `dataset_file` is unset.
    pub input_file: PathBuf,
    /// Separate task dataset, joined with the predictions by id.
    pub dataset_file: Option<PathBuf>,
    /// Judged output file.
    pub output_file: PathBuf,
    /// Keep previously judged records from `output_file` and its checkpoint.
    pub resume: bool,
    pub num_shards: usize,
    pub shard_index: usize,
    /// Prometheus text export written at the end of the run.
    pub metrics_file: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(input_file: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            dataset_file: None,
            output_file: output_file.into(),
            resume: false,
            num_shards: 1,
            shard_index: 0,
            metrics_file: None,
        }
    }

    pub fn with_dataset_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_file = Some(path.into());
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_shard(mut self, num_shards: usize, shard_index: usize) -> Self {
        self.num_shards = num_shards;
        self.shard_index = shard_index;
        self
    }

    pub fn with_metrics_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_file = Some(path.into());
        self
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_shards == 0 {
            return Err(ConfigError::ValidationFailed(
                "num_shards must be at least 1".to_string(),
            ));
        }

        if self.shard_index >= self.num_shards {
            return Err(ConfigError::ValidationFailed(format!(
                "shard_index {} must be below num_shards {}",
                self.shard_index, self.num_shards
            )));
        }

        let inputs = std::iter::once(&self.input_file).chain(self.dataset_file.as_ref());
        for input in inputs {
            if *input == self.output_file {
                return Err(ConfigError::ValidationFailed(format!(
                    "output_file '{}' would overwrite an input file",
                    self.output_file.display()
                )));
            }
        }

        Ok(())
    }
}
