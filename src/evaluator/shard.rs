//! Splitting a batch across independent processes.

use crate::dataset::{natural_cmp, MergedRecord};
use crate::error::ConfigError;

/// Records belonging to shard `shard_index` of `num_shards`.
///
/// Records are put in natural id order and the record at position `p` goes
/// to shard `p % num_shards`, so shards are disjoint and together cover the
/// whole batch.
pub fn select_shard(
    mut records: Vec<MergedRecord>,
    num_shards: usize,
    shard_index: usize,
) -> Result<Vec<MergedRecord>, ConfigError> {
    if num_shards == 0 {
        return Err(ConfigError::InvalidValue {
            key: "num_shards".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if shard_index >= num_shards {
        return Err(ConfigError::InvalidValue {
            key: "shard_index".to_string(),
            message: format!("{} is not below num_shards ({})", shard_index, num_shards),
        });
    }

    records.sort_by(|a, b| natural_cmp(a.id(), b.id()));
    Ok(records
        .into_iter()
        .enumerate()
        .filter(|(pos, _)| pos % num_shards == shard_index)
        .map(|(_, record)| record)
        .collect())
}
