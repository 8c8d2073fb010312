//! Batch evaluation of merged records.
//!
//! The [`BatchEvaluator`] fans records out to a [`Judge`](crate::judge::Judge)
//! under a concurrency limit, streams settled records to a checkpoint, and
//! returns them in natural id order. [`resume`] and [`shard`] decide which
//! records a run judges; [`output`] owns the output file format.

pub mod batch;
pub mod checkpoint;
pub mod output;
pub mod resume;
pub mod shard;

pub use batch::{BatchEvaluator, BatchOutcome};
pub use checkpoint::{checkpoint_path, read_checkpoint, CheckpointWriter};
pub use output::{read_output, write_output, FailureInfo, OutputRecord, RecordStatus};
pub use resume::{load_previous, partition_pending};
pub use shard::select_shard;
