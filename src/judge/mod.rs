//! LLM-as-judge scoring.
//!
//! - [`prompt`]: the rubric and per-record user message
//! - [`verdict`]: strict extraction of a score from a free-form reply
//! - [`client`]: the [`Judge`] trait and the retrying [`LlmJudge`]

pub mod client;
pub mod prompt;
pub mod verdict;

pub use client::{Judge, JudgeInput, LlmJudge};
pub use prompt::{build_user_prompt, JUDGE_SYSTEM_PROMPT};
pub use verdict::{parse_verdict, Verdict, VerdictLabel, SCORE_MAX, SCORE_MIN};
