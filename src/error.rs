//! Error types for longchain-judge operations.
//!
//! Errors are split by how far they propagate:
//! - [`DataError`]: file-level input problems that abort a run
//! - [`LlmError`]: transport and API failures from the judge backend
//! - [`JudgeError`]: record-level judging failures, contained to one record
//! - [`ConfigError`]: invalid judge configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while loading, validating, or merging input files.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not valid JSON: {message}")]
    InvalidJson { path: String, message: String },

    #[error("Malformed record at index {index}{}: {message}", id_suffix(.id))]
    DataFormat {
        index: usize,
        id: Option<String>,
        message: String,
    },

    #[error("Duplicate {kind} id '{id}' at indices {first_index} and {second_index}")]
    DuplicateKey {
        kind: &'static str,
        id: String,
        first_index: usize,
        second_index: usize,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn id_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" (id '{}')", id),
        None => String::new(),
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API base URL: JUDGE_API_BASE not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Connection(_) | LlmError::Timeout { .. } | LlmError::RateLimited(_) => true,
            LlmError::RequestFailed(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("timeout")
                    || msg.contains("connection")
                    || msg.contains("temporarily")
            }
            LlmError::ApiError { code, .. } => *code >= 500 || *code == 429,
            LlmError::MissingApiBase | LlmError::ParseError(_) => false,
        }
    }
}

/// Category of a record-level judging failure, as written to the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retryable backend failure that exhausted the attempt ceiling.
    Transient,
    /// The backend answered but no verdict could be extracted.
    Parse,
    /// Non-retryable backend failure (auth, invalid request).
    Fatal,
    /// The record itself cannot be judged (empty instruction/answer/prediction).
    InvalidInput,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transient => "transient",
            FailureKind::Parse => "parse",
            FailureKind::Fatal => "fatal",
            FailureKind::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record-level judging failures. None of these abort a batch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JudgeError {
    #[error("Judge backend unavailable after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    #[error("Could not extract a verdict: {0}")]
    Parse(String),

    #[error("Judge backend rejected the request: {0}")]
    Fatal(String),

    #[error("Record cannot be judged: {0}")]
    InvalidInput(String),
}

impl JudgeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            JudgeError::Transient { .. } => FailureKind::Transient,
            JudgeError::Parse(_) => FailureKind::Parse,
            JudgeError::Fatal(_) => FailureKind::Fatal,
            JudgeError::InvalidInput(_) => FailureKind::InvalidInput,
        }
    }
}

/// Errors that can occur while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
