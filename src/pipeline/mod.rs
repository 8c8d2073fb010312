//! Pipeline orchestration for an evaluation run.
//!
//! # Pipeline Flow
//!
//! 1. **Load**: read the predictions file, and the dataset file when given
//! 2. **Merge**: join predictions onto tasks by id; one-sided ids are dropped
//!    with a warning
//! 3. **Select**: keep this process's shard, and with `resume` skip records
//!    already judged
//! 4. **Judge**: run the [`BatchEvaluator`](crate::evaluator::BatchEvaluator),
//!    checkpointing as records settle
//! 5. **Write**: replace the output file atomically and drop the checkpoint
//! 6. **Summarize**: compute the per-type report for the full output
//!
//! # Example
//!
//! ```rust,ignore
//! use longchain_judge::pipeline::{EvaluationPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new("predictions.json", "judged.json")
//!     .with_dataset_file("tasks.json")
//!     .with_resume(true);
//!
//! let pipeline = EvaluationPipeline::new(config, judge, 3)?;
//! let report = pipeline.run().await?;
//! println!("{} judged, {} failed", report.judged, report.failed);
//! ```

pub mod config;
pub mod orchestrator;

pub use config::PipelineConfig;
pub use orchestrator::{EvaluationPipeline, PipelineError, RunReport};
