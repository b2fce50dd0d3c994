//! Presentation-ready views of scoring results

use crate::processing::analyzer::{DegradedComponent, MatchResult};
use crate::processing::combiner::ScoringState;
use crate::processing::embeddings::EmbeddingMode;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Round to two decimals. Scores are only ever rounded for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryLine {
    pub category: String,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSection {
    pub score: f64,
    pub maximum: f64,
    pub breakdown: Vec<CategoryLine>,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillGap {
    pub candidate: Vec<String>,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub suggestions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub final_score: f64,
    pub state: ScoringState,
    pub state_description: String,
    pub cv: DocumentSection,
    pub cover_letter: Option<DocumentSection>,
    pub jd_match_score: Option<f64>,
    pub skills: SkillGap,
    pub degraded: bool,
    pub degraded_components: Vec<DegradedComponent>,
    pub embedding_mode: Option<EmbeddingMode>,
    pub qualitative_provider: String,
    pub processing_time_ms: u64,
    pub scored_at: String,
}

impl ScoreReport {
    pub fn from_result(result: &MatchResult) -> Self {
        let cover_letter = match (
            result.cover_letter_score,
            &result.cover_letter_breakdown,
            &result.cover_letter_feedback,
        ) {
            (Some(score), Some(breakdown), Some(feedback)) => Some(DocumentSection {
                score: round2(score),
                maximum: 40.0,
                breakdown: breakdown
                    .iter()
                    .map(|(category, points)| CategoryLine {
                        category: category.to_string(),
                        points: round2(points),
                    })
                    .collect(),
                strengths: feedback.strengths.clone(),
                gaps: feedback.gaps.clone(),
                summary: feedback.summary.clone(),
            }),
            _ => None,
        };

        Self {
            final_score: round2(result.final_score),
            state: result.state,
            state_description: result.state.description().to_string(),
            cv: DocumentSection {
                score: round2(result.cv_score),
                maximum: 60.0,
                breakdown: result
                    .cv_breakdown
                    .iter()
                    .map(|(category, points)| CategoryLine {
                        category: category.to_string(),
                        points: round2(points),
                    })
                    .collect(),
                strengths: result.cv_feedback.strengths.clone(),
                gaps: result.cv_feedback.gaps.clone(),
                summary: result.cv_feedback.summary.clone(),
            },
            cover_letter,
            jd_match_score: result.jd_match_score.map(round2),
            skills: SkillGap {
                candidate: result.candidate_skills.to_vec(),
                matched: result.matched_skills.to_vec(),
                missing: result.missing_skills.to_vec(),
                suggestions: result.skill_suggestions.clone(),
            },
            degraded: result.degraded,
            degraded_components: result.degraded_components.clone(),
            embedding_mode: result.embedding_mode,
            qualitative_provider: result.qualitative_provider.clone(),
            processing_time_ms: result.processing_time_ms,
            scored_at: result.scored_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub label: String,
    pub report: ScoreReport,
}

/// Highest final score first; ties keep label order
pub fn rank_candidates(results: Vec<(String, MatchResult)>) -> Vec<RankedCandidate> {
    let mut results = results;
    results.sort_by(|(label_a, a), (label_b, b)| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| label_a.cmp(label_b))
    });

    results
        .into_iter()
        .enumerate()
        .map(|(i, (label, result))| RankedCandidate {
            rank: i + 1,
            label,
            report: ScoreReport::from_result(&result),
        })
        .collect()
}
