//! Loading dataset and prediction files.
//!
//! Both files are JSON arrays. Every entry is validated individually so a
//! malformed record is reported by its index (and id, when one is readable).

use std::path::Path;

use serde_json::Value;

use super::records::{json_kind, PredictionRecord, RawPrediction, RawTask, TaskRecord, TaskType};
use crate::error::DataError;

/// Reads a file and parses it as a JSON array.
pub fn read_json_array(path: &Path) -> Result<Vec<Value>, DataError> {
    let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| DataError::InvalidJson {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(DataError::InvalidJson {
            path: path.display().to_string(),
            message: format!("expected a top-level array, found {}", json_kind(&other)),
        }),
    }
}

/// Loads the task dataset.
pub fn load_tasks(path: &Path) -> Result<Vec<TaskRecord>, DataError> {
    let values = read_json_array(path)?;
    let tasks = parse_tasks(&values)?;
    tracing::info!(path = %path.display(), count = tasks.len(), "Loaded task dataset");
    Ok(tasks)
}

/// Loads a predictions file.
pub fn load_predictions(path: &Path) -> Result<Vec<PredictionRecord>, DataError> {
    let values = read_json_array(path)?;
    let predictions = parse_predictions(&values)?;
    tracing::info!(path = %path.display(), count = predictions.len(), "Loaded predictions");
    Ok(predictions)
}

/// Loads a predictions file whose entries also carry the task fields.
pub fn load_combined(path: &Path) -> Result<(Vec<TaskRecord>, Vec<PredictionRecord>), DataError> {
    let values = read_json_array(path)?;
    let tasks = parse_tasks(&values)?;
    let predictions = parse_predictions(&values)?;
    tracing::info!(
        path = %path.display(),
        count = predictions.len(),
        "Loaded predictions with embedded task fields"
    );
    Ok((tasks, predictions))
}

/// Validates dataset entries.
pub fn parse_tasks(values: &[Value]) -> Result<Vec<TaskRecord>, DataError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| parse_task(index, value))
        .collect()
}

/// Validates prediction entries.
pub fn parse_predictions(values: &[Value]) -> Result<Vec<PredictionRecord>, DataError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| parse_prediction(index, value))
        .collect()
}

fn parse_task(index: usize, value: &Value) -> Result<TaskRecord, DataError> {
    let raw: RawTask = decode(index, value)?;
    let id = require_id(index, raw.resolved_id())?;

    let instruction = raw
        .instruction
        .or(raw.instruct)
        .ok_or_else(|| missing(index, &id, "instruction"))?;
    let answer = raw.answer.ok_or_else(|| missing(index, &id, "answer"))?.0;

    let task_type = TaskType::from_raw(raw.task_type.as_deref());
    if task_type == TaskType::Unknown {
        tracing::warn!(
            id = %id,
            raw_type = raw.task_type.as_deref().unwrap_or("<missing>"),
            "Task type is missing or unrecognised; grouping as unknown"
        );
    }

    Ok(TaskRecord {
        name: raw.name.unwrap_or_default(),
        task_type,
        instruction: instruction.trim().to_string(),
        answer,
        id,
    })
}

fn parse_prediction(index: usize, value: &Value) -> Result<PredictionRecord, DataError> {
    let raw: RawPrediction = decode(index, value)?;
    let id = require_id(index, raw.resolved_id())?;

    let prediction = raw
        .prediction
        .ok_or_else(|| missing(index, &id, "prediction"))?;
    let nsteps = raw.nsteps.ok_or_else(|| missing(index, &id, "nsteps"))?;

    Ok(PredictionRecord {
        id,
        prediction,
        nsteps,
    })
}

fn decode<T: serde::de::DeserializeOwned>(index: usize, value: &Value) -> Result<T, DataError> {
    if !value.is_object() {
        return Err(DataError::DataFormat {
            index,
            id: None,
            message: format!("expected an object, found {}", json_kind(value)),
        });
    }

    T::deserialize(value).map_err(|e| DataError::DataFormat {
        index,
        id: peek_id(value),
        message: e.to_string(),
    })
}

/// Best-effort id for error messages when full decoding failed.
fn peek_id(value: &Value) -> Option<String> {
    let raw = value.get("id").or_else(|| value.get("folder"))?;
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn require_id(index: usize, id: Option<String>) -> Result<String, DataError> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(DataError::DataFormat {
            index,
            id: None,
            message: "missing field `id`".to_string(),
        }),
    }
}

fn missing(index: usize, id: &str, field: &str) -> DataError {
    DataError::DataFormat {
        index,
        id: Some(id.to_string()),
        message: format!("missing field `{}`", field),
    }
}
