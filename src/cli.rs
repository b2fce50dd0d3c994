//! CLI interface for the candidate scorer

use crate::config::ProviderKind;
use crate::error::{Result, ScoringError};
use crate::output::formatter::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "candidate-scorer")]
#[command(about = "Score job candidates against a job description")]
#[command(long_about = "Score CVs and cover letters with a rubric, match them semantically against a job description and report skill gaps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a single candidate
    Score {
        /// Path to the CV (TXT, MD)
        #[arg(long)]
        cv: PathBuf,

        /// Path to the cover letter
        #[arg(long)]
        cover_letter: Option<PathBuf>,

        /// Path to the job description
        #[arg(short, long)]
        job: Option<PathBuf>,

        #[command(flatten)]
        options: ScoringOptions,
    },

    /// Score and rank several CVs against one job description
    Batch {
        /// Path to the job description
        #[arg(short, long)]
        job: PathBuf,

        /// CV files to rank
        #[arg(long = "cv", required = true, num_args = 1..)]
        cvs: Vec<PathBuf>,

        #[command(flatten)]
        options: ScoringOptions,
    },

    /// List the skills detected in a document
    Skills {
        file: PathBuf,
    },

    /// Extract and validate contact details from a CV
    Contact {
        file: PathBuf,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(clap::Args, Clone)]
pub struct ScoringOptions {
    /// Output format
    #[arg(short, long, value_enum, default_value = "console")]
    pub format: OutputFormat,

    /// Qualitative provider, overriding the config file
    #[arg(short, long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Skip the embedding model and use the local vectorizer
    #[arg(long)]
    pub offline: bool,

    /// Show strengths, gaps and detected skills
    #[arg(short, long)]
    pub detailed: bool,

    /// Save output to file
    #[arg(short, long)]
    pub save: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Check the configuration for errors
    Validate,
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if allowed_extensions.contains(&ext.to_lowercase().as_str()) => Ok(()),
        Some(ext) => Err(ScoringError::invalid_input(format!(
            "Unsupported file extension: .{}. Allowed: {}",
            ext,
            allowed_extensions.join(", ")
        ))),
        None => Err(ScoringError::invalid_input(format!(
            "File has no extension: {}",
            path.display()
        ))),
    }
}

/// Read a plain-text input document
pub async fn read_document(path: &Path) -> Result<String> {
    validate_file_extension(path, &["txt", "md"])?;

    let bytes = tokio::fs::read(path).await?;
    String::from_utf8(bytes)
        .map_err(|_| ScoringError::invalid_input(format!("{} is not valid UTF-8 text", path.display())))
}

/// Label a candidate by file stem
pub fn candidate_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
