//! Final score policy over whichever sub-scores are present

use crate::config::ScoringConfig;
use crate::error::{Result, ScoringError};
use serde::{Deserialize, Serialize};

pub const CV_MAX: f64 = 60.0;
pub const COVER_LETTER_MAX: f64 = 40.0;
pub const JD_MATCH_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringState {
    CvOnly,
    CvCoverLetter,
    CvJobMatch,
    Full,
}

impl ScoringState {
    pub fn from_presence(cover_letter: bool, jd_match: bool) -> Self {
        match (cover_letter, jd_match) {
            (false, false) => ScoringState::CvOnly,
            (true, false) => ScoringState::CvCoverLetter,
            (false, true) => ScoringState::CvJobMatch,
            (true, true) => ScoringState::Full,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScoringState::CvOnly => "CV only",
            ScoringState::CvCoverLetter => "CV + cover letter",
            ScoringState::CvJobMatch => "CV + job match",
            ScoringState::Full => "CV + cover letter + job match",
        }
    }
}

/// Split between the document-quality term and the JD-match term
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinerWeights {
    quality: f64,
    jd: f64,
}

impl Default for CombinerWeights {
    fn default() -> Self {
        Self { quality: 0.4, jd: 0.6 }
    }
}

impl CombinerWeights {
    pub fn new(quality: f64, jd: f64) -> Result<Self> {
        if !(quality.is_finite() && jd.is_finite()) || quality < 0.0 || jd < 0.0 {
            return Err(ScoringError::configuration("Scoring weights must be non-negative numbers"));
        }
        if ((quality + jd) - 1.0).abs() > 1e-9 {
            return Err(ScoringError::configuration(format!(
                "Scoring weights must sum to 1.0, got {} + {}",
                quality, jd
            )));
        }
        Ok(Self { quality, jd })
    }

    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        Self::new(config.quality_weight, config.jd_weight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedScore {
    pub state: ScoringState,
    pub final_score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCombiner {
    weights: CombinerWeights,
}

impl ScoreCombiner {
    pub fn new(weights: CombinerWeights) -> Self {
        Self { weights }
    }

    /// CV is required. Full precision is kept; the result is clamped to [0, 100].
    pub fn combine(
        &self,
        cv_score: Option<f64>,
        cover_letter_score: Option<f64>,
        jd_match_score: Option<f64>,
    ) -> Result<CombinedScore> {
        let cv = cv_score.ok_or_else(|| ScoringError::invalid_input("A CV score is required"))?;
        check_range("cv_score", cv, CV_MAX)?;
        if let Some(cl) = cover_letter_score {
            check_range("cover_letter_score", cl, COVER_LETTER_MAX)?;
        }
        if let Some(jd) = jd_match_score {
            check_range("jd_match_score", jd, JD_MATCH_MAX)?;
        }

        let state = ScoringState::from_presence(cover_letter_score.is_some(), jd_match_score.is_some());
        let raw = match (cover_letter_score, jd_match_score) {
            (None, None) => cv / CV_MAX * 100.0,
            (Some(cl), None) => cv + cl,
            (None, Some(jd)) => self.weights.quality * (cv / CV_MAX * 100.0) + self.weights.jd * jd,
            // The CV + cover letter sum already spans 0-100 and stands in for quality
            (Some(cl), Some(jd)) => self.weights.quality * (cv + cl) + self.weights.jd * jd,
        };

        Ok(CombinedScore {
            state,
            final_score: raw.clamp(0.0, 100.0),
        })
    }
}

/// Combine with the default 0.4 / 0.6 weighting
pub fn combine(
    cv_score: Option<f64>,
    cover_letter_score: Option<f64>,
    jd_match_score: Option<f64>,
) -> Result<CombinedScore> {
    ScoreCombiner::default().combine(cv_score, cover_letter_score, jd_match_score)
}

fn check_range(name: &str, value: f64, max: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=max).contains(&value) {
        return Err(ScoringError::invalid_input(format!(
            "{} must be within [0, {}], got {}",
            name, max, value
        )));
    }
    Ok(())
}
