//! Qualitative analysis: rubrics, providers and prompts

pub mod gemini;
pub mod heuristics;
pub mod prompts;
pub mod provider;
pub mod rubric;
