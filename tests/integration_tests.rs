//! Integration tests for the candidate scorer

use async_trait::async_trait;
use candidate_scorer::config::{EmbeddingConfig, ProviderKind, SkillsConfig};
use candidate_scorer::llm::heuristics::HeuristicProvider;
use candidate_scorer::llm::provider::{AnalysisRequest, QualitativeProvider};
use candidate_scorer::llm::rubric::{Rubric, RubricScorer};
use candidate_scorer::processing::analyzer::DegradedComponent;
use candidate_scorer::processing::combiner::{ScoreCombiner, ScoringState};
use candidate_scorer::processing::embeddings::{EmbeddingAdapter, EmbeddingMode, EmbeddingProvider};
use candidate_scorer::processing::skill_matcher::{match_skills, SkillExtractor};
use candidate_scorer::{combine, extract_contact_info, CandidateScorer, Config, ScoringError};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(Path::new("tests/fixtures").join(name)).unwrap()
}

/// Letter-frequency vectors: deterministic and sensitive to content
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn name(&self) -> &str {
        "letters"
    }

    async fn embed_chunk(&self, text: &str) -> candidate_scorer::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }
}

struct UnreachableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnreachableEmbedder {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn embed_chunk(&self, _text: &str) -> candidate_scorer::Result<Vec<f32>> {
        Err(ScoringError::provider("connection refused"))
    }
}

/// Awards the same fraction of every category ceiling
struct FractionProvider(f64);

#[async_trait]
impl QualitativeProvider for FractionProvider {
    fn name(&self) -> &str {
        "fraction"
    }

    async fn analyze(&self, request: &AnalysisRequest<'_>) -> candidate_scorer::Result<Value> {
        let scores: serde_json::Map<String, Value> = request
            .rubric
            .categories()
            .iter()
            .map(|c| (c.key.to_string(), json!(c.ceiling * self.0)))
            .collect();
        Ok(json!({ "category_scores": scores, "strengths": ["consistent"], "summary": "ok" }))
    }
}

fn scorer(
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    provider: Arc<dyn QualitativeProvider>,
) -> CandidateScorer {
    let config = EmbeddingConfig::default();
    let skills = Arc::new(SkillExtractor::new(&SkillsConfig::default()).unwrap());
    let timeout = Duration::from_secs(10);

    CandidateScorer::new(
        Arc::new(EmbeddingAdapter::new(embedder, &config)),
        RubricScorer::new(Rubric::cv(), Arc::clone(&provider), timeout),
        RubricScorer::new(Rubric::cover_letter(), provider, timeout),
        skills,
        ScoreCombiner::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_marks_cv_and_cover_letter_scores_100() {
    let scorer = scorer(Some(Arc::new(LetterEmbedder)), Arc::new(FractionProvider(1.0)));
    let result = scorer
        .score_candidate(&fixture("sample_resume.txt"), Some(&fixture("sample_cover_letter.txt")), None)
        .await
        .unwrap();

    assert_eq!(result.state, ScoringState::CvCoverLetter);
    assert!((result.final_score - 100.0).abs() < 1e-9);
    assert!(!result.degraded);
}

#[tokio::test]
async fn test_half_marks_cv_only_scores_50() {
    let scorer = scorer(None, Arc::new(FractionProvider(0.5)));
    let result = scorer
        .score_candidate(&fixture("sample_resume.txt"), None, None)
        .await
        .unwrap();

    assert_eq!(result.state, ScoringState::CvOnly);
    assert!((result.cv_score - 30.0).abs() < 1e-9);
    assert!((result.final_score - 50.0).abs() < 1e-9);
}

#[test]
fn test_cv_with_job_match_weighting() {
    let result = combine(Some(60.0), None, Some(80.0)).unwrap();
    assert!((result.final_score - 88.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_identical_cv_and_job_match_fully() {
    let scorer = scorer(Some(Arc::new(LetterEmbedder)), Arc::new(FractionProvider(1.0)));
    let text = fixture("sample_resume.txt");
    let result = scorer.score_candidate(&text, None, Some(&text)).await.unwrap();

    assert_eq!(result.embedding_mode, Some(EmbeddingMode::Provider));
    assert!((result.jd_match_score.unwrap() - 100.0).abs() < 1e-6);
    assert!((result.final_score - 100.0).abs() < 1e-6);
    assert!(result.missing_skills.is_empty());
}

#[tokio::test]
async fn test_unreachable_embedding_provider_degrades() {
    let scorer = scorer(Some(Arc::new(UnreachableEmbedder)), Arc::new(FractionProvider(0.8)));
    let result = scorer
        .score_candidate(&fixture("sample_resume.txt"), None, Some(&fixture("sample_job.txt")))
        .await
        .unwrap();

    assert!(result.degraded);
    assert_eq!(result.degraded_components, vec![DegradedComponent::Embedding]);
    assert_eq!(result.embedding_mode, Some(EmbeddingMode::Fallback));
    let jd = result.jd_match_score.unwrap();
    assert!((0.0..=100.0).contains(&jd));
    assert!((0.0..=100.0).contains(&result.final_score));
}

#[tokio::test]
async fn test_empty_job_text_is_not_an_error() {
    let scorer = scorer(Some(Arc::new(LetterEmbedder)), Arc::new(FractionProvider(0.5)));
    let result = scorer
        .score_candidate(&fixture("sample_resume.txt"), None, Some(""))
        .await
        .unwrap();

    assert!(result.missing_skills.is_empty());
    assert!(result.jd_match_score.is_none());
    assert_eq!(result.state, ScoringState::CvOnly);
}

#[tokio::test]
async fn test_skill_gap_against_sample_job() {
    let scorer = scorer(Some(Arc::new(LetterEmbedder)), Arc::new(FractionProvider(0.5)));
    let result = scorer
        .score_candidate(&fixture("sample_resume.txt"), None, Some(&fixture("sample_job.txt")))
        .await
        .unwrap();

    for skill in ["rust", "postgresql", "docker", "aws", "terraform"] {
        assert!(result.matched_skills.contains(skill), "expected {} matched", skill);
    }
    for skill in ["kafka", "kubernetes"] {
        assert!(result.missing_skills.contains(skill), "expected {} missing", skill);
    }
    assert!(result.candidate_skills.contains("python"));
}

#[test]
fn test_matched_and_missing_partition_job_skills() {
    let extractor = SkillExtractor::new(&SkillsConfig::default()).unwrap();
    let documents = [
        fixture("sample_resume.txt"),
        fixture("sample_job.txt"),
        fixture("sample_cover_letter.txt"),
        "Go, Kubernetes, GraphQL and React developer".to_string(),
        String::new(),
    ];

    for cv in &documents {
        for job in &documents {
            let candidate = extractor.extract_skills(cv);
            let required = extractor.extract_skills(job);
            let gap = match_skills(&candidate, &required);

            for skill in gap.matched.iter() {
                assert!(candidate.contains(skill));
                assert!(required.contains(skill));
                assert!(!gap.missing.contains(skill));
            }
            for skill in gap.missing.iter() {
                assert!(required.contains(skill));
                assert!(!candidate.contains(skill));
            }
            assert_eq!(gap.matched.len() + gap.missing.len(), required.len());
        }
    }
}

#[tokio::test]
async fn test_cv_only_scoring_is_idempotent() {
    let skills = Arc::new(SkillExtractor::new(&SkillsConfig::default()).unwrap());
    let provider: Arc<dyn QualitativeProvider> = Arc::new(HeuristicProvider::new(Arc::clone(&skills)));
    let scorer = scorer(None, provider);
    let cv = fixture("sample_resume.txt");

    let first = scorer.score_candidate(&cv, None, None).await.unwrap();
    let second = scorer.score_candidate(&cv, None, None).await.unwrap();

    assert_eq!(first.final_score, second.final_score);
    assert_eq!(first.cv_breakdown, second.cv_breakdown);
    assert!(first.cv_score > 0.0 && first.cv_score <= 60.0);
}

#[tokio::test]
async fn test_final_score_is_bounded_for_every_input_combination() {
    let cv = fixture("sample_resume.txt");
    let cover_letter = fixture("sample_cover_letter.txt");
    let job = fixture("sample_job.txt");

    for fraction in [0.0, 0.37, 1.0] {
        let scorer = scorer(Some(Arc::new(LetterEmbedder)), Arc::new(FractionProvider(fraction)));
        for cl in [None, Some(cover_letter.as_str())] {
            for jd in [None, Some(job.as_str())] {
                let result = scorer.score_candidate(&cv, cl, jd).await.unwrap();
                assert!((0.0..=100.0).contains(&result.final_score));
                assert!((0.0..=60.0).contains(&result.cv_score));
            }
        }
    }
}

#[tokio::test]
async fn test_missing_gemini_key_degrades_qualitative_scores() {
    let mut config = Config::default();
    config.embedding.enabled = false;
    config.qualitative.provider = ProviderKind::Gemini;
    config.qualitative.api_key_env = "CANDIDATE_SCORER_TEST_UNSET_KEY".to_string();

    let scorer = CandidateScorer::from_config(&config).await.unwrap();
    let result = scorer
        .score_candidate(&fixture("sample_resume.txt"), Some(&fixture("sample_cover_letter.txt")), None)
        .await
        .unwrap();

    assert!(result.degraded);
    assert_eq!(
        result.degraded_components,
        vec![DegradedComponent::CvAnalysis, DegradedComponent::CoverLetterAnalysis]
    );
    assert_eq!(result.final_score, 0.0);
}

#[tokio::test]
async fn test_heuristic_config_scores_sample_candidate() {
    let mut config = Config::default();
    config.embedding.enabled = false;
    config.qualitative.provider = ProviderKind::Heuristic;

    let scorer = CandidateScorer::from_config(&config).await.unwrap();
    let result = scorer
        .score_candidate(
            &fixture("sample_resume.txt"),
            Some(&fixture("sample_cover_letter.txt")),
            Some(&fixture("sample_job.txt")),
        )
        .await
        .unwrap();

    assert_eq!(result.state, ScoringState::Full);
    assert_eq!(result.qualitative_provider, "heuristic");
    assert!(result.cv_score > 20.0);
    assert!(result.cover_letter_score.unwrap() > 5.0);
    assert_eq!(result.degraded_components, vec![DegradedComponent::Embedding]);
}

#[test]
fn test_config_round_trip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");

    let mut config = Config::default();
    config.scoring.quality_weight = 0.3;
    config.scoring.jd_weight = 0.7;
    config.qualitative.provider = ProviderKind::Heuristic;
    config.save_to(&path).unwrap();

    let loaded = Config::from_path(&path).unwrap();
    assert_eq!(loaded.scoring.quality_weight, 0.3);
    assert_eq!(loaded.qualitative.provider, ProviderKind::Heuristic);
}

#[test]
fn test_bad_weights_in_config_file_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[scoring]\nquality_weight = 0.9\njd_weight = 0.9\n").unwrap();

    assert!(matches!(Config::from_path(&path), Err(ScoringError::Configuration(_))));
}

#[test]
fn test_contact_details_from_sample_resume() {
    let info = extract_contact_info(&fixture("sample_resume.txt"));

    assert_eq!(info.name.as_deref(), Some("Jane Doe"));
    assert_eq!(info.email.as_deref(), Some("jane.doe@example-corp.io"));
    assert_eq!(info.linkedin_url.as_deref(), Some("https://linkedin.com/in/jane-doe"));
    assert!(info.phone.is_some());
}
