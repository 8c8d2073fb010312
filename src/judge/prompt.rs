//! Prompts sent to the judge model.

/// System prompt describing the grading rubric and the reply format.
pub const JUDGE_SYSTEM_PROMPT: &str = r#"You grade the final answers of web and GUI agents on long, multi-step tasks.

You receive the task instruction, the reference answer and the agent's prediction.
The reference answer may contain several sub-results (for example a JSON object
with one entry per item the task asked for). Compare the prediction against it
and decide how much of the required result the agent actually produced.

Scoring:
- 1.0 when every required element of the reference answer is present and correct.
- Between 0.0 and 1.0 when only part of the required elements are correct; use
  the share of correct elements.
- 0.0 when the prediction is wrong, empty, a refusal, or unrelated to the task.

Ignore formatting, ordering, capitalization and harmless extra detail. Numbers,
names, dates and prices must match the reference. Do not reward effort or
reasoning that does not end in the requested result.

Reply with a single JSON object and nothing else:
{"verdict": "correct" | "partially_correct" | "incorrect", "score": <number between 0.0 and 1.0>, "rationale": "<one or two sentences>"}"#;

/// Builds the user message for one record.
pub fn build_user_prompt(instruction: &str, answer: &str, prediction: &str) -> String {
    format!(
        "## Task Instruction\n{}\n\n## Reference Answer\n{}\n\n## Agent Prediction\n{}\n\nGrade the prediction and reply with the JSON object only.",
        instruction.trim(),
        answer.trim(),
        prediction.trim()
    )
}
