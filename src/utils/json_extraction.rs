//! JSON extraction utilities for parsing LLM responses.
//!
//! Judge replies are asked to be a bare JSON object, but models routinely wrap
//! it in markdown fences, prepend reasoning, or echo structured answers before
//! the verdict. These helpers find every complete JSON object in a reply so
//! the caller can pick the one it needs.
//!
//! # Example
//!
//! ```
//! use longchain_judge::utils::json_extraction::extract_json_objects;
//!
//! let reply = "Reasoning first.\n```json\n{\"score\": 1.0}\n```";
//! let objects = extract_json_objects(reply);
//! assert_eq!(objects, vec!["{\"score\": 1.0}".to_string()]);
//! ```

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:[A-Za-z0-9_-]+)?[ \t]*\r?\n?([\s\S]*?)```").expect("static regex is valid")
});

/// Result of looking for a JSON object in a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonExtractionResult {
    /// At least one complete object; the list is in order of appearance.
    Found(Vec<String>),
    /// An object was opened but never closed (the reply was cut off).
    Truncated {
        partial_json: String,
        unclosed_braces: usize,
    },
    /// No JSON-like content.
    NotFound,
}

/// Brace depth bookkeeping for a scanned string.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonStructureAnalysis {
    pub unclosed_braces: usize,
    pub in_string: bool,
    pub json_start: Option<usize>,
}

/// Tracks brace depth, ignoring braces inside string literals.
pub fn analyze_json_structure(s: &str) -> JsonStructureAnalysis {
    let mut depth: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut json_start = None;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' if json_start.is_some() => in_string = !in_string,
            '{' if !in_string => {
                json_start.get_or_insert(i);
                depth += 1;
            }
            '}' if !in_string => depth -= 1,
            _ => {}
        }
    }

    JsonStructureAnalysis {
        unclosed_braces: depth.max(0) as usize,
        in_string,
        json_start,
    }
}

/// Index of the brace closing the object that starts at `s[0]`.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Every valid top-level JSON object in `content`, in order of appearance.
///
/// Fenced code blocks are searched first; objects inside fences come before
/// objects found in the surrounding prose.
pub fn extract_json_objects(content: &str) -> Vec<String> {
    let mut objects = Vec::new();

    for caps in FENCED_BLOCK.captures_iter(content) {
        if let Some(block) = caps.get(1) {
            objects.extend(scan_objects(block.as_str()));
        }
    }

    let unfenced = FENCED_BLOCK.replace_all(content, " ");
    for object in scan_objects(&unfenced) {
        if !objects.contains(&object) {
            objects.push(object);
        }
    }

    objects
}

/// Like [`extract_json_objects`], but distinguishes a cut-off reply from one
/// with no JSON at all.
pub fn try_extract_json_objects(content: &str) -> JsonExtractionResult {
    let objects = extract_json_objects(content);
    if !objects.is_empty() {
        return JsonExtractionResult::Found(objects);
    }

    let trimmed = content.trim();
    let analysis = analyze_json_structure(trimmed);
    match analysis.json_start {
        Some(start) if analysis.unclosed_braces > 0 || analysis.in_string => {
            JsonExtractionResult::Truncated {
                partial_json: trimmed[start..].to_string(),
                unclosed_braces: analysis.unclosed_braces,
            }
        }
        _ => JsonExtractionResult::NotFound,
    }
}

/// Non-overlapping scan: after a valid object, resume after its closing brace.
fn scan_objects(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(rel) = text[offset..].find('{') {
        let start = offset + rel;
        match find_matching_brace(&text[start..]) {
            Some(end) => {
                let candidate = &text[start..=start + end];
                if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                    found.push(candidate.to_string());
                    offset = start + end + 1;
                } else {
                    offset = start + 1;
                }
            }
            None => offset = start + 1,
        }
    }

    found
}
