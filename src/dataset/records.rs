//! Task, prediction, and merged record types.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Dependency structure of a task. Only used as an aggregation key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Global,
    Causal,
    /// Missing or unrecognised type in the source data.
    #[default]
    Unknown,
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(TaskType::from_raw(raw.as_deref()))
    }
}

impl TaskType {
    /// Classifies a raw type string. Matching is case-insensitive.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("global") => TaskType::Global,
            Some("causal") => TaskType::Causal,
            _ => TaskType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Global => "global",
            TaskType::Causal => "causal",
            TaskType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub instruction: String,
    /// Expected answer; structured answers are kept as their JSON text.
    pub answer: String,
}

/// One agent prediction for a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub id: String,
    pub prediction: String,
    pub nsteps: u32,
}

/// A task joined with its prediction, ready to be judged.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub task: TaskRecord,
    pub prediction: String,
    pub nsteps: u32,
}

impl MergedRecord {
    pub fn new(task: TaskRecord, prediction: &PredictionRecord) -> Self {
        Self {
            task,
            prediction: prediction.prediction.clone(),
            nsteps: prediction.nsteps,
        }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }
}

/// Wire shape of a dataset entry, before validation.
///
/// The original dataset spells `id` as `folder` and `instruction` as
/// `instruct`; both spellings are read and the canonical one wins.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTask {
    #[serde(default)]
    pub id: Option<IdValue>,
    #[serde(default)]
    pub folder: Option<IdValue>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub instruct: Option<String>,
    #[serde(default)]
    pub answer: Option<AnswerValue>,
}

impl RawTask {
    pub fn resolved_id(&self) -> Option<String> {
        self.id.as_ref().or(self.folder.as_ref()).map(|v| v.0.clone())
    }
}

/// Wire shape of a prediction entry. Task fields may also be present and are ignored here.
#[derive(Debug, Deserialize)]
pub(crate) struct RawPrediction {
    #[serde(default)]
    pub id: Option<IdValue>,
    #[serde(default)]
    pub folder: Option<IdValue>,
    /// A null prediction means the agent produced nothing; it is judged as empty.
    #[serde(default, deserialize_with = "nullable_text")]
    pub prediction: Option<String>,
    #[serde(default)]
    pub nsteps: Option<u32>,
}

impl RawPrediction {
    pub fn resolved_id(&self) -> Option<String> {
        self.id.as_ref().or(self.folder.as_ref()).map(|v| v.0.clone())
    }
}

/// An id given either as a string or as a number.
#[derive(Debug, Clone)]
pub(crate) struct IdValue(pub String);

impl<'de> Deserialize<'de> for IdValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(IdValue(s)),
            serde_json::Value::Number(n) => Ok(IdValue(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected a string or number id, found {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Answers are usually text, but some datasets inline the structured answer.
#[derive(Debug, Clone)]
pub(crate) struct AnswerValue(pub String);

impl<'de> Deserialize<'de> for AnswerValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(AnswerValue(s)),
            other => Ok(AnswerValue(other.to_string())),
        }
    }
}

/// Distinguishes an explicit `null` (Some("")) from a missing field (None).
fn nullable_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
