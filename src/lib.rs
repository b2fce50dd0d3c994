//! Candidate scoring library

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod output;
pub mod processing;
pub mod tasks;

pub use config::Config;
pub use error::{Result, ScoringError};
pub use processing::analyzer::{CandidateScorer, MatchResult};
pub use processing::combiner::combine;
pub use processing::contact::extract_contact_info;
pub use processing::similarity::similarity_score;
pub use tasks::{ScoringPool, ScoringTask, TaskStatus};
