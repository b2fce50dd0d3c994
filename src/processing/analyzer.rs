//! Candidate scoring engine combining rubric analysis, semantic JD matching
//! and skill-gap analysis

use crate::config::Config;
use crate::error::{Result, ScoringError};
use crate::llm::provider::build_provider;
use crate::llm::rubric::{QualitativeFeedback, RubricKind, RubricScorer, ScoreBreakdown, SubScore};
use crate::processing::combiner::{CombinerWeights, ScoreCombiner, ScoringState};
use crate::processing::embeddings::{EmbeddingAdapter, EmbeddingMode, EmbeddingProvider};
use crate::processing::similarity::similarity_score;
use crate::processing::skill_matcher::{match_skills, SkillExtractor, SkillSet};
use crate::processing::static_embedder::StaticModelEmbedder;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Coordinates every scoring component. Holds no per-call state.
pub struct CandidateScorer {
    embeddings: Arc<EmbeddingAdapter>,
    cv_scorer: RubricScorer,
    cover_letter_scorer: RubricScorer,
    skills: Arc<SkillExtractor>,
    combiner: ScoreCombiner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedComponent {
    Embedding,
    CvAnalysis,
    CoverLetterAnalysis,
}

impl DegradedComponent {
    pub fn description(&self) -> &'static str {
        match self {
            DegradedComponent::Embedding => "embedding provider (local vectorizer used)",
            DegradedComponent::CvAnalysis => "CV analysis (zero baseline used)",
            DegradedComponent::CoverLetterAnalysis => "cover letter analysis (zero baseline used)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub final_score: f64,
    pub state: ScoringState,

    pub cv_score: f64,
    pub cover_letter_score: Option<f64>,
    pub jd_match_score: Option<f64>,

    pub cv_breakdown: ScoreBreakdown,
    pub cover_letter_breakdown: Option<ScoreBreakdown>,
    pub cv_feedback: QualitativeFeedback,
    pub cover_letter_feedback: Option<QualitativeFeedback>,

    pub candidate_skills: SkillSet,
    pub matched_skills: SkillSet,
    pub missing_skills: SkillSet,
    /// Near-miss spellings found in the CV, keyed by missing skill
    pub skill_suggestions: BTreeMap<String, Vec<String>>,

    pub degraded: bool,
    pub degraded_components: Vec<DegradedComponent>,
    pub embedding_mode: Option<EmbeddingMode>,
    pub qualitative_provider: String,

    pub processing_time_ms: u64,
    pub scored_at: DateTime<Utc>,
}

/// Treat whitespace-only text as absent
fn present(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

impl CandidateScorer {
    pub fn new(
        embeddings: Arc<EmbeddingAdapter>,
        cv_scorer: RubricScorer,
        cover_letter_scorer: RubricScorer,
        skills: Arc<SkillExtractor>,
        combiner: ScoreCombiner,
    ) -> Result<Self> {
        if cv_scorer.rubric().kind() != RubricKind::Cv
            || cover_letter_scorer.rubric().kind() != RubricKind::CoverLetter
        {
            return Err(ScoringError::configuration(
                "CV and cover letter scorers were given the wrong rubrics",
            ));
        }

        Ok(Self {
            embeddings,
            cv_scorer,
            cover_letter_scorer,
            skills,
            combiner,
        })
    }

    /// Wire up every component from configuration.
    ///
    /// An embedding model that fails to load is logged and replaced by the
    /// local vectorizer; configuration problems are fatal.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let skills = Arc::new(SkillExtractor::new(&config.skills)?);
        let provider = build_provider(&config.qualitative, Arc::clone(&skills))?;
        let timeout = config.qualitative.timeout();

        let embedder: Option<Arc<dyn EmbeddingProvider>> = if config.embedding.enabled {
            match StaticModelEmbedder::load_async(&config.embedding.model).await {
                Ok(model) => Some(Arc::new(model)),
                Err(e) => {
                    warn!("Embedding model unavailable, semantic matching will be degraded: {}", e);
                    None
                }
            }
        } else {
            info!("Embedding model disabled, using local vectorizer");
            None
        };

        Self::new(
            Arc::new(EmbeddingAdapter::new(embedder, &config.embedding)),
            RubricScorer::new(config.cv_rubric()?, Arc::clone(&provider), timeout),
            RubricScorer::new(config.cover_letter_rubric()?, provider, timeout),
            skills,
            ScoreCombiner::new(CombinerWeights::from_config(&config.scoring)?),
        )
    }

    pub fn extract_skills(&self, text: &str) -> SkillSet {
        self.skills.extract_skills(text)
    }

    /// Score one candidate. Only a missing CV (or an internal invariant
    /// breaking) is an error; provider trouble degrades the result instead.
    pub async fn score_candidate(
        &self,
        cv_text: &str,
        cover_letter_text: Option<&str>,
        job_text: Option<&str>,
    ) -> Result<MatchResult> {
        let start_time = Instant::now();

        if cv_text.trim().is_empty() {
            return Err(ScoringError::invalid_input("CV text is required"));
        }
        let cover_letter = present(cover_letter_text);
        let job = present(job_text);

        debug!(
            "Scoring candidate (cover letter: {}, job description: {})",
            cover_letter.is_some(),
            job.is_some()
        );

        let cv_analysis = self.cv_scorer.score(cv_text, job);
        let cover_letter_analysis = async {
            match cover_letter {
                Some(text) => Some(self.cover_letter_scorer.score(text, job).await),
                None => None,
            }
        };
        let embedding_pair = async {
            match job {
                Some(job) => Some(self.embeddings.embed_pair(cv_text, job).await),
                None => None,
            }
        };

        let (cv, cover, pair): (SubScore, Option<SubScore>, _) =
            tokio::join!(cv_analysis, cover_letter_analysis, embedding_pair);

        let mut degraded_components = Vec::new();
        if cv.degraded {
            degraded_components.push(DegradedComponent::CvAnalysis);
        }
        if cover.as_ref().map_or(false, |c| c.degraded) {
            degraded_components.push(DegradedComponent::CoverLetterAnalysis);
        }

        let (jd_match_score, embedding_mode) = match &pair {
            Some((cv_embedding, job_embedding)) => {
                if cv_embedding.is_fallback() {
                    degraded_components.push(DegradedComponent::Embedding);
                }
                let score = similarity_score(&cv_embedding.vector, &job_embedding.vector)?;
                (Some(score), Some(cv_embedding.mode))
            }
            None => (None, None),
        };

        let candidate_skills = self.skills.extract_skills(cv_text);
        let (matched_skills, missing_skills, skill_suggestions) = match job {
            Some(job) => {
                let gap = match_skills(&candidate_skills, &self.skills.extract_skills(job));
                let suggestions = self.skills.suggest_similar(&gap.missing, cv_text);
                (gap.matched, gap.missing, suggestions)
            }
            None => (SkillSet::new(), SkillSet::new(), BTreeMap::new()),
        };

        let combined = self.combiner.combine(
            Some(cv.score),
            cover.as_ref().map(|c| c.score),
            jd_match_score,
        )?;

        let degraded = !degraded_components.is_empty();
        if degraded {
            warn!(
                "Candidate scored in degraded mode: {}",
                degraded_components
                    .iter()
                    .map(|c| c.description())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Final score {:.2} ({}) in {}ms",
            combined.final_score,
            combined.state.description(),
            processing_time_ms
        );

        let (cover_letter_score, cover_letter_breakdown, cover_letter_feedback) = match cover {
            Some(c) => (Some(c.score), Some(c.breakdown), Some(c.feedback)),
            None => (None, None, None),
        };

        Ok(MatchResult {
            final_score: combined.final_score,
            state: combined.state,
            cv_score: cv.score,
            cover_letter_score,
            jd_match_score,
            cv_breakdown: cv.breakdown,
            cover_letter_breakdown,
            cv_feedback: cv.feedback,
            cover_letter_feedback,
            candidate_skills,
            matched_skills,
            missing_skills,
            skill_suggestions,
            degraded,
            degraded_components,
            embedding_mode,
            qualitative_provider: cv.provider,
            processing_time_ms,
            scored_at: Utc::now(),
        })
    }
}
