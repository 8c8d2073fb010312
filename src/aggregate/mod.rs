//! Summary statistics over a judged output file.
//!
//! Only records with a verdict count towards averages. Failed or unjudged
//! entries are reported as excluded, never as zero. A group with no judged
//! records reports [`Average::NoData`], serialized as `"no_data"`.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

use crate::dataset::loader::read_json_array;
use crate::dataset::TaskType;
use crate::error::DataError;
use crate::evaluator::{OutputRecord, RecordStatus};
use crate::judge::{SCORE_MAX, SCORE_MIN};

/// Mean of a group, or an explicit marker when the group is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Average {
    Value(f64),
    NoData,
}

impl Average {
    /// Order-independent mean: values are summed in sorted order.
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Average::NoData;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Average::Value(sorted.iter().sum::<f64>() / sorted.len() as f64)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Average::Value(v) => Some(*v),
            Average::NoData => None,
        }
    }
}

impl Serialize for Average {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Average::Value(v) => serializer.serialize_f64(*v),
            Average::NoData => serializer.serialize_str("no_data"),
        }
    }
}

/// Counts and averages for one task type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Records with a verdict.
    pub count: usize,
    /// Records present but without a verdict.
    pub excluded: usize,
    pub average_score: Average,
    pub average_nsteps: Average,
}

/// Summary over a whole output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub count: usize,
    pub excluded: usize,
    pub average_score: Average,
    pub average_nsteps: Average,
    pub per_type: BTreeMap<TaskType, GroupSummary>,
}

impl SummaryReport {
    pub fn group(&self, task_type: TaskType) -> Option<&GroupSummary> {
        self.per_type.get(&task_type)
    }

    /// Plain-text table for terminal output.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<10} {:>8} {:>9} {:>10} {:>10}",
            "type", "judged", "excluded", "avg_score", "avg_steps"
        );
        for (task_type, group) in &self.per_type {
            let _ = writeln!(
                out,
                "{:<10} {:>8} {:>9} {:>10} {:>10}",
                task_type.as_str(),
                group.count,
                group.excluded,
                format_average(group.average_score, 4),
                format_average(group.average_nsteps, 1)
            );
        }
        let _ = writeln!(
            out,
            "{:<10} {:>8} {:>9} {:>10} {:>10}",
            "overall",
            self.count,
            self.excluded,
            format_average(self.average_score, 4),
            format_average(self.average_nsteps, 1)
        );
        out
    }
}

fn format_average(average: Average, precision: usize) -> String {
    match average {
        Average::Value(v) => format!("{:.*}", precision, v),
        Average::NoData => "no_data".to_string(),
    }
}

/// The fields of an output entry the summary needs.
///
/// Entries from other tools are accepted: a missing `status` counts as judged
/// when a score is present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredEntry {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub status: Option<RecordStatus>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub nsteps: Option<u32>,
}

impl From<&OutputRecord> for ScoredEntry {
    fn from(record: &OutputRecord) -> Self {
        Self {
            id: Some(serde_json::Value::String(record.id.clone())),
            task_type: record.task_type,
            status: Some(record.status),
            score: record.score,
            nsteps: Some(record.nsteps),
        }
    }
}

impl ScoredEntry {
    /// The score, if this entry counts towards averages.
    fn counted_score(&self) -> Option<f64> {
        if self.status == Some(RecordStatus::Failed) {
            return None;
        }
        let score = self.score?;
        if score.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&score) {
            Some(score)
        } else {
            warn!(id = ?self.id, score, "Ignoring out-of-range score");
            None
        }
    }
}

#[derive(Default)]
struct Accumulator {
    scores: Vec<f64>,
    nsteps: Vec<f64>,
    excluded: usize,
}

impl Accumulator {
    fn add(&mut self, entry: &ScoredEntry) {
        match entry.counted_score() {
            Some(score) => {
                self.scores.push(score);
                if let Some(n) = entry.nsteps {
                    self.nsteps.push(f64::from(n));
                }
            }
            None => self.excluded += 1,
        }
    }

    fn summary(&self) -> GroupSummary {
        GroupSummary {
            count: self.scores.len(),
            excluded: self.excluded,
            average_score: Average::of(&self.scores),
            average_nsteps: Average::of(&self.nsteps),
        }
    }
}

/// Computes overall and per-type averages.
///
/// `global` and `causal` always appear; `unknown` appears only when some
/// entry has that type.
pub fn summarize(entries: &[ScoredEntry]) -> SummaryReport {
    let mut overall = Accumulator::default();
    let mut groups: BTreeMap<TaskType, Accumulator> = BTreeMap::new();
    groups.insert(TaskType::Global, Accumulator::default());
    groups.insert(TaskType::Causal, Accumulator::default());

    for entry in entries {
        overall.add(entry);
        groups.entry(entry.task_type).or_default().add(entry);
    }

    let total = overall.summary();
    SummaryReport {
        count: total.count,
        excluded: total.excluded,
        average_score: total.average_score,
        average_nsteps: total.average_nsteps,
        per_type: groups
            .iter()
            .map(|(task_type, acc)| (*task_type, acc.summary()))
            .collect(),
    }
}

/// Summarizes records produced by the batch evaluator.
pub fn summarize_records(records: &[OutputRecord]) -> SummaryReport {
    let entries: Vec<ScoredEntry> = records.iter().map(ScoredEntry::from).collect();
    summarize(&entries)
}

/// Reads a judged output file and summarizes it.
pub fn load_and_summarize(path: &Path) -> Result<SummaryReport, DataError> {
    let entries = read_json_array(path)?
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let id = value.get("id").map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            serde_json::from_value::<ScoredEntry>(value).map_err(|e| DataError::DataFormat {
                index,
                id,
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(summarize(&entries))
}
