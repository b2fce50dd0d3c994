//! candidate-scorer: rubric, semantic and skill-gap scoring for job candidates

use anyhow::{Context, Result};
use candidate_scorer::cli::{self, Cli, Commands, ConfigAction, ScoringOptions};
use candidate_scorer::output::formatter::{formatter_for, save_report_to_file};
use candidate_scorer::output::report::{rank_candidates, ScoreReport};
use candidate_scorer::processing::contact::ContactExtractor;
use candidate_scorer::processing::skill_matcher::SkillExtractor;
use candidate_scorer::tasks::{ScoringJob, ScoringPool};
use candidate_scorer::{CandidateScorer, Config};
use clap::Parser;
use log::{error, info, warn};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Config::load().context("Failed to load configuration"),
    }
}

fn apply_overrides(config: &mut Config, options: &ScoringOptions) {
    if let Some(provider) = options.provider {
        config.qualitative.provider = provider;
    }
    if options.offline {
        config.embedding.enabled = false;
    }
}

fn emit(content: &str, options: &ScoringOptions) -> Result<()> {
    println!("{}", content);
    if let Some(path) = &options.save {
        save_report_to_file(content, path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
        info!("Report saved to {}", path.display());
    }
    Ok(())
}

async fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => Ok(Some(
            cli::read_document(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        )),
        None => Ok(None),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Score {
            cv,
            cover_letter,
            job,
            options,
        } => {
            apply_overrides(&mut config, &options);

            let cv_text = cli::read_document(&cv)
                .await
                .with_context(|| format!("Failed to read CV {}", cv.display()))?;
            let cover_letter_text = read_optional(cover_letter.as_deref()).await?;
            let job_text = read_optional(job.as_deref()).await?;

            let scorer = CandidateScorer::from_config(&config)
                .await
                .context("Failed to initialise scoring engine")?;

            info!("Scoring {}", cv.display());
            let result = scorer
                .score_candidate(&cv_text, cover_letter_text.as_deref(), job_text.as_deref())
                .await
                .context("Scoring failed")?;

            let report = ScoreReport::from_result(&result);
            let output = formatter_for(options.format, options.detailed).format_report(&report)?;
            emit(&output, &options)?;
        }

        Commands::Batch { job, cvs, options } => {
            apply_overrides(&mut config, &options);

            let job_text = cli::read_document(&job)
                .await
                .with_context(|| format!("Failed to read job description {}", job.display()))?;

            let scorer = Arc::new(
                CandidateScorer::from_config(&config)
                    .await
                    .context("Failed to initialise scoring engine")?,
            );
            let pool = ScoringPool::new(scorer, config.workers.max_concurrent);

            let mut tasks = Vec::with_capacity(cvs.len());
            for path in &cvs {
                match cli::read_document(path).await {
                    Ok(cv_text) => {
                        let task = pool.submit(ScoringJob::new(cv_text).with_job(job_text.clone()));
                        tasks.push((cli::candidate_label(path), task));
                    }
                    Err(e) => warn!("Skipping {}: {}", path.display(), e),
                }
            }

            info!("Scoring {} candidate(s) with {} worker(s)", tasks.len(), config.workers.max_concurrent);

            let mut results = Vec::with_capacity(tasks.len());
            for (label, task) in tasks {
                match task.wait().await {
                    Ok(result) => results.push((label, result)),
                    Err(e) => warn!("Candidate {} could not be scored: {}", label, e),
                }
            }
            pool.shutdown(Duration::from_secs(5)).await;

            let ranking = rank_candidates(results);
            let output = formatter_for(options.format, options.detailed).format_ranking(&ranking)?;
            emit(&output, &options)?;
        }

        Commands::Skills { file } => {
            let text = cli::read_document(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let extractor = SkillExtractor::new(&config.skills).context("Invalid skills configuration")?;

            let skills = extractor.extract_skills(&text);
            println!("Detected {} skill(s) in {}:", skills.len(), file.display());
            for skill in skills.iter() {
                println!("  • {}", skill);
            }
        }

        Commands::Contact { file } => {
            let text = cli::read_document(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let extractor = ContactExtractor::new();
            let info = extractor.extract(&text);

            println!("Name:     {}", info.name.as_deref().unwrap_or("-"));
            match &info.email {
                Some(email) => {
                    let check = extractor.validate_email(email);
                    println!("Email:    {} ({})", email, check.note);
                }
                None => println!("Email:    -"),
            }
            match &info.phone {
                Some(phone) => {
                    let check = extractor.validate_phone(phone);
                    println!("Phone:    {} ({})", phone, check.note);
                }
                None => println!("Phone:    -"),
            }
            println!("LinkedIn: {}", info.linkedin_url.as_deref().unwrap_or("-"));
        }

        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
                println!("{}", content);
            }
            ConfigAction::Path => {
                let path = cli.config.unwrap_or_else(Config::config_path);
                println!("{}", path.display());
            }
            ConfigAction::Validate => {
                config.validate().context("Configuration is invalid")?;
                println!("Configuration is valid");
            }
        },
    }

    Ok(())
}
