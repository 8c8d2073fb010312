//! Shared utility functions for longchain-judge.

pub mod json_extraction;

pub use json_extraction::{
    analyze_json_structure, extract_json_objects, find_matching_brace, try_extract_json_objects,
    JsonExtractionResult, JsonStructureAnalysis,
};
