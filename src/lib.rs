//! longchain-judge: LLM-as-judge evaluation for long-chain web agent tasks.
//!
//! This library loads agent predictions and the task dataset, scores each
//! prediction against its reference answer with an LLM judge, writes a judged
//! output file, and summarizes scores per task type.

// Core modules
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod judge;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use aggregate::{Average, SummaryReport};
pub use config::JudgeConfig;
pub use error::{ConfigError, DataError, FailureKind, JudgeError, LlmError};
pub use evaluator::{BatchEvaluator, OutputRecord};
pub use judge::{Judge, JudgeInput, LlmJudge, Verdict};
pub use pipeline::{EvaluationPipeline, PipelineConfig};
