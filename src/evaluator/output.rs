//! Judged output records and the output file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::loader::read_json_array;
use crate::dataset::{MergedRecord, TaskType};
use crate::error::{DataError, FailureKind, JudgeError};
use crate::judge::{Verdict, VerdictLabel};

/// Whether a record received a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Judged,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Judged => "judged",
            RecordStatus::Failed => "failed",
        }
    }
}

/// Why a record has no verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&JudgeError> for FailureInfo {
    fn from(err: &JudgeError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One entry of the judged output file.
///
/// A judged record carries `score` and `verdict`; a failed one carries
/// `error` instead. Field order here is the order written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub instruction: String,
    pub answer: String,
    pub prediction: String,
    pub nsteps: u32,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureInfo>,
    pub judge_model: String,
    pub judged_at: DateTime<Utc>,
}

impl OutputRecord {
    pub fn judged(
        record: &MergedRecord,
        verdict: Verdict,
        judge_model: &str,
        judged_at: DateTime<Utc>,
    ) -> Self {
        let mut out = Self::base(record, RecordStatus::Judged, judge_model, judged_at);
        out.score = Some(verdict.score);
        out.verdict = Some(verdict.label);
        out.judge_rationale = verdict.rationale;
        out
    }

    pub fn failed(
        record: &MergedRecord,
        error: &JudgeError,
        judge_model: &str,
        judged_at: DateTime<Utc>,
    ) -> Self {
        let mut out = Self::base(record, RecordStatus::Failed, judge_model, judged_at);
        out.error = Some(FailureInfo::from(error));
        out
    }

    fn base(
        record: &MergedRecord,
        status: RecordStatus,
        judge_model: &str,
        judged_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: record.task.id.clone(),
            name: record.task.name.clone(),
            task_type: record.task.task_type,
            instruction: record.task.instruction.clone(),
            answer: record.task.answer.clone(),
            prediction: record.prediction.clone(),
            nsteps: record.nsteps,
            status,
            score: None,
            verdict: None,
            judge_rationale: None,
            error: None,
            judge_model: judge_model.to_string(),
            judged_at,
        }
    }

    pub fn is_judged(&self) -> bool {
        self.status == RecordStatus::Judged && self.score.is_some()
    }
}

/// Reads a judged output file written by [`write_output`].
pub fn read_output(path: &Path) -> Result<Vec<OutputRecord>, DataError> {
    read_json_array(path)?
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let id = value.get("id").and_then(|v| v.as_str()).map(str::to_string);
            serde_json::from_value(value).map_err(|e| DataError::DataFormat {
                index,
                id,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Writes `records` as a pretty-printed JSON array.
///
/// The file is written next to its destination and renamed into place, so an
/// interrupted run never leaves a half-written output file behind.
pub fn write_output(path: &Path, records: &[OutputRecord]) -> Result<(), DataError> {
    let json = serde_json::to_string_pretty(records)?;
    let tmp = temp_path(path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DataError::Write {
            path: parent.display().to_string(),
            source,
        })?;
    }

    fs::write(&tmp, json).map_err(|source| DataError::Write {
        path: tmp.display().to_string(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| DataError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
