//! Verdict extraction from judge replies.
//!
//! Replies are expected to be a JSON object with `verdict`, `score` and
//! `rationale`. Models do not always comply, so the parser accepts the object
//! inside markdown fences or surrounded by prose, a numeric score given as a
//! string, a bare verdict label, and as a last resort a `score: x` line. It
//! never guesses: anything it cannot read as a score on the [0, 1] scale is a
//! parse failure.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

use crate::error::JudgeError;
use crate::utils::json_extraction::{try_extract_json_objects, JsonExtractionResult};

/// Lowest score on the judge scale.
pub const SCORE_MIN: f64 = 0.0;

/// Highest score on the judge scale.
pub const SCORE_MAX: f64 = 1.0;

static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?im)^[\s*#>-]*"?score"?\**\s*[:=]\s*\**\s*(-?[0-9]+(?:\.[0-9]+)?)\**\s*(?:[,;.](?:\s|$)|$)"#,
    )
    .expect("static regex is valid")
});

const RATIONALE_KEYS: &[&str] = &["rationale", "reason", "reasoning", "explanation"];

/// Categorical verdict reported alongside the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictLabel {
    Correct,
    PartiallyCorrect,
    Incorrect,
}

impl VerdictLabel {
    /// Score a bare label stands for.
    pub fn anchor(&self) -> f64 {
        match self {
            VerdictLabel::Correct => SCORE_MAX,
            VerdictLabel::PartiallyCorrect => 0.5,
            VerdictLabel::Incorrect => SCORE_MIN,
        }
    }

    /// Label matching a score. Only the ends of the scale are full verdicts.
    pub fn from_score(score: f64) -> Self {
        if score >= SCORE_MAX {
            VerdictLabel::Correct
        } else if score <= SCORE_MIN {
            VerdictLabel::Incorrect
        } else {
            VerdictLabel::PartiallyCorrect
        }
    }

    /// Lenient label parsing: case, spaces and hyphens are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace(['-', ' '], "_");
        match normalized.as_str() {
            "correct" | "right" | "pass" | "yes" => Some(VerdictLabel::Correct),
            "partially_correct" | "partial" | "partly_correct" | "partially" => {
                Some(VerdictLabel::PartiallyCorrect)
            }
            "incorrect" | "wrong" | "fail" | "no" => Some(VerdictLabel::Incorrect),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictLabel::Correct => "correct",
            VerdictLabel::PartiallyCorrect => "partially_correct",
            VerdictLabel::Incorrect => "incorrect",
        }
    }
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed judge verdict. `score` is always finite and within the scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub score: f64,
    pub label: VerdictLabel,
    pub rationale: Option<String>,
}

impl Verdict {
    fn new(score: f64, rationale: Option<String>) -> Result<Self, JudgeError> {
        if !score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&score) {
            return Err(JudgeError::Parse(format!(
                "score {} is outside [{}, {}]",
                score, SCORE_MIN, SCORE_MAX
            )));
        }
        Ok(Self {
            score,
            label: VerdictLabel::from_score(score),
            rationale,
        })
    }
}

/// Extracts a verdict from a raw judge reply.
///
/// The last JSON object carrying a `score` or `verdict` key wins, so an
/// answer echoed earlier in the reply does not shadow the verdict. When both
/// are present the score is authoritative and the label is derived from it.
pub fn parse_verdict(reply: &str) -> Result<Verdict, JudgeError> {
    if reply.trim().is_empty() {
        return Err(JudgeError::Parse("empty reply".to_string()));
    }

    match try_extract_json_objects(reply) {
        JsonExtractionResult::Found(objects) => {
            let candidate = objects
                .iter()
                .rev()
                .filter_map(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
                .find(|object| field(object, "score").is_some() || field(object, "verdict").is_some());
            if let Some(object) = candidate {
                return verdict_from_object(&object);
            }
            score_line(reply)
        }
        JsonExtractionResult::Truncated { .. } => score_line(reply).map_err(|_| {
            JudgeError::Parse("reply was cut off before the verdict object closed".to_string())
        }),
        JsonExtractionResult::NotFound => score_line(reply),
    }
}

fn verdict_from_object(object: &Map<String, Value>) -> Result<Verdict, JudgeError> {
    let rationale = RATIONALE_KEYS
        .iter()
        .filter_map(|key| field(object, key))
        .find_map(|value| value.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if let Some(value) = field(object, "score") {
        let score = score_value(value)?;
        return Verdict::new(score, rationale);
    }

    let label = field(object, "verdict")
        .and_then(Value::as_str)
        .and_then(VerdictLabel::parse)
        .ok_or_else(|| {
            JudgeError::Parse(format!(
                "unrecognised verdict {}",
                field(object, "verdict").map(Value::to_string).unwrap_or_default()
            ))
        })?;
    Verdict::new(label.anchor(), rationale)
}

/// Reads a score given as a number or a numeric string. A percentage string
/// such as `"50%"` is divided by 100.
fn score_value(value: &Value) -> Result<f64, JudgeError> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(percent) => percent.trim().parse::<f64>().ok().map(|p| p / 100.0),
                None => s.parse::<f64>().ok(),
            }
        }
        _ => None,
    };
    score.ok_or_else(|| JudgeError::Parse(format!("score {} is not a number", value)))
}

fn score_line(reply: &str) -> Result<Verdict, JudgeError> {
    let Some(caps) = SCORE_LINE.captures_iter(reply).last() else {
        return Err(JudgeError::Parse("no verdict object or score line".to_string()));
    };
    let score = caps[1]
        .parse::<f64>()
        .map_err(|e| JudgeError::Parse(format!("bad score line: {}", e)))?;
    Verdict::new(score, None)
}

/// Case-insensitive key lookup.
fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let verdict =
            parse_verdict(r#"{"verdict": "correct", "score": 1.0, "rationale": "Matches."}"#)
                .unwrap();
        assert_eq!(verdict.score, 1.0);
        assert_eq!(verdict.label, VerdictLabel::Correct);
        assert_eq!(verdict.rationale.as_deref(), Some("Matches."));
    }

    #[test]
    fn test_fenced_object_with_prose() {
        let reply = "The agent found two of four items.\n```json\n{\"score\": 0.5, \"reason\": \"half\"}\n```";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.score, 0.5);
        assert_eq!(verdict.label, VerdictLabel::PartiallyCorrect);
        assert_eq!(verdict.rationale.as_deref(), Some("half"));
    }

    #[test]
    fn test_echoed_answer_does_not_shadow_verdict() {
        let reply = r#"Expected {"price": 120, "airline": "X"}. Verdict: {"score": 0, "verdict": "incorrect"}"#;
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.label, VerdictLabel::Incorrect);
    }

    #[test]
    fn test_last_verdict_object_wins() {
        let reply = r#"{"score": 1.0} on reflection {"score": 0.25}"#;
        assert_eq!(parse_verdict(reply).unwrap().score, 0.25);
    }

    #[test]
    fn test_label_only_maps_to_anchor() {
        let verdict = parse_verdict(r#"{"verdict": "Partially Correct"}"#).unwrap();
        assert_eq!(verdict.score, 0.5);

        let verdict = parse_verdict(r#"{"Verdict": "wrong"}"#).unwrap();
        assert_eq!(verdict.score, 0.0);
    }

    #[test]
    fn test_score_as_string() {
        assert_eq!(parse_verdict(r#"{"score": " 0.75 "}"#).unwrap().score, 0.75);
    }

    #[test]
    fn test_score_wins_over_label() {
        let verdict = parse_verdict(r#"{"verdict": "correct", "score": 0.6}"#).unwrap();
        assert_eq!(verdict.score, 0.6);
        assert_eq!(verdict.label, VerdictLabel::PartiallyCorrect);
    }

    #[test]
    fn test_score_line_fallback() {
        let reply = "The prediction lists every item.\n**Score**: 1\n";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.score, 1.0);
        assert!(verdict.rationale.is_none());
    }

    #[test]
    fn test_percentage_score_is_scaled() {
        let verdict = parse_verdict(r#"{"score": "50%"}"#).unwrap();
        assert_eq!(verdict.score, 0.5);
        assert_eq!(verdict.label, VerdictLabel::PartiallyCorrect);

        let verdict = parse_verdict(r#"{"score": "1%"}"#).unwrap();
        assert_eq!(verdict.score, 0.01);
        assert_eq!(verdict.label, VerdictLabel::PartiallyCorrect);

        assert_eq!(parse_verdict(r#"{"score": "100 %"}"#).unwrap().score, 1.0);
        assert!(parse_verdict(r#"{"score": "150%"}"#).is_err());
    }

    #[test]
    fn test_score_line_accepts_trailing_punctuation() {
        assert_eq!(parse_verdict("Score: 0.5.\nDone").unwrap().score, 0.5);
        assert_eq!(parse_verdict("**Score: 1**").unwrap().score, 1.0);
        assert_eq!(parse_verdict("score = 0, since nothing matched").unwrap().score, 0.0);
    }

    #[test]
    fn test_score_line_on_other_scales_is_parse_error() {
        for reply in ["Score: 1/5", "Score: 1 out of 10", "Score: 3/10", "score: 0.5x"] {
            let err = parse_verdict(reply).unwrap_err();
            assert!(matches!(err, JudgeError::Parse(_)), "{reply}");
        }
    }

    #[test]
    fn test_out_of_range_score_is_parse_error() {
        let err = parse_verdict(r#"{"score": 7}"#).unwrap_err();
        assert!(matches!(err, JudgeError::Parse(_)));

        let err = parse_verdict("score: -0.5").unwrap_err();
        assert!(matches!(err, JudgeError::Parse(_)));
    }

    #[test]
    fn test_non_finite_score_is_parse_error() {
        assert!(parse_verdict(r#"{"score": "NaN"}"#).is_err());
        assert!(parse_verdict(r#"{"score": "inf"}"#).is_err());
    }

    #[test]
    fn test_unknown_label_is_parse_error() {
        let err = parse_verdict(r#"{"verdict": "maybe"}"#).unwrap_err();
        assert!(matches!(err, JudgeError::Parse(_)));
    }

    #[test]
    fn test_no_verdict_is_parse_error() {
        assert!(parse_verdict("I think the agent did fine.").is_err());
        assert!(parse_verdict("   ").is_err());
        assert!(parse_verdict(r#"{"answer": "yes"}"#).is_err());
    }

    #[test]
    fn test_truncated_reply_is_parse_error() {
        let err = parse_verdict(r#"{"verdict": "correct", "rationale": "the agent"#).unwrap_err();
        match err {
            JudgeError::Parse(msg) => assert!(msg.contains("cut off")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_label_from_score_edges() {
        assert_eq!(VerdictLabel::from_score(1.0), VerdictLabel::Correct);
        assert_eq!(VerdictLabel::from_score(0.0), VerdictLabel::Incorrect);
        assert_eq!(VerdictLabel::from_score(0.01), VerdictLabel::PartiallyCorrect);
    }
}
