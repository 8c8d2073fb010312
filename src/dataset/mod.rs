//! Task dataset and agent predictions.
//!
//! Loads the two input files, validates every record, and joins predictions
//! onto tasks by id.

pub mod loader;
pub mod merge;
pub mod order;
pub mod records;

pub use loader::{load_combined, load_predictions, load_tasks, read_json_array};
pub use merge::{merge, MergeReport};
pub use order::natural_cmp;
pub use records::{MergedRecord, PredictionRecord, TaskRecord, TaskType};
