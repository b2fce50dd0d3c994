//! Console and JSON renderers for score reports

use crate::error::Result;
use crate::output::report::{DocumentSection, RankedCandidate, ScoreReport};
use clap::ValueEnum;
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

pub trait OutputFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String>;
    fn format_ranking(&self, ranking: &[RankedCandidate]) -> Result<String>;
}

pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

pub struct JsonFormatter {
    pretty: bool,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let (prefix, color) = match level {
            1 => ("█", Color::Blue),
            2 => ("▓", Color::Green),
            _ => ("▒", Color::Yellow),
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_score_badge(&self, score: f64) -> String {
        let (badge, color) = match score {
            s if s >= 85.0 => ("STRONG MATCH", Color::Green),
            s if s >= 70.0 => ("GOOD MATCH", Color::BrightGreen),
            s if s >= 55.0 => ("PARTIAL MATCH", Color::Yellow),
            s if s >= 40.0 => ("WEAK MATCH", Color::BrightYellow),
            _ => ("POOR MATCH", Color::Red),
        };

        if self.use_colors {
            format!("[{}]", badge.color(color).bold())
        } else {
            format!("[{}]", badge)
        }
    }

    fn format_document(&self, title: &str, section: &DocumentSection) -> String {
        let mut output = self.format_header(title, 2);
        output.push_str(&format!("Score: {:.2} / {:.0}\n", section.score, section.maximum));

        for line in &section.breakdown {
            output.push_str(&format!("  {:<28} {:>6.2}\n", line.category, line.points));
        }
        if !section.summary.is_empty() {
            output.push_str(&format!("{}\n", self.colorize(&section.summary, Color::Cyan)));
        }

        if self.detailed {
            for strength in &section.strengths {
                output.push_str(&format!("  {} {}\n", self.colorize("+", Color::Green), strength));
            }
            for gap in &section.gaps {
                output.push_str(&format!("  {} {}\n", self.colorize("-", Color::Red), gap));
            }
        }
        output
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("CANDIDATE SCORE", 1));
        output.push_str(&format!(
            "Scored: {} | Provider: {} | Processing time: {}ms\n",
            report.scored_at, report.qualitative_provider, report.processing_time_ms
        ));
        output.push_str(&format!(
            "Final Score: {:.2} {}\n",
            report.final_score,
            self.format_score_badge(report.final_score)
        ));
        output.push_str(&format!("Inputs: {}\n", report.state_description));

        if report.degraded {
            let components: Vec<_> = report.degraded_components.iter().map(|c| c.description()).collect();
            output.push_str(&format!(
                "{} {}\n",
                self.colorize("Degraded:", Color::Yellow),
                components.join(", ")
            ));
        }

        output.push_str(&self.format_document("CV", &report.cv));
        if let Some(cover_letter) = &report.cover_letter {
            output.push_str(&self.format_document("Cover Letter", cover_letter));
        }

        if let Some(jd) = report.jd_match_score {
            output.push_str(&self.format_header("Job Match", 2));
            output.push_str(&format!("Semantic match: {:.2}%\n", jd));

            let matched = if report.skills.matched.is_empty() {
                "none".to_string()
            } else {
                report.skills.matched.join(", ")
            };
            let missing = if report.skills.missing.is_empty() {
                "none".to_string()
            } else {
                report.skills.missing.join(", ")
            };
            output.push_str(&format!("Matched skills: {}\n", self.colorize(&matched, Color::Green)));
            output.push_str(&format!("Missing skills: {}\n", self.colorize(&missing, Color::Red)));

            for (skill, near) in &report.skills.suggestions {
                output.push_str(&format!("  '{}' may appear as: {}\n", skill, near.join(", ")));
            }
        } else if self.detailed && !report.skills.candidate.is_empty() {
            output.push_str(&self.format_header("Detected Skills", 3));
            output.push_str(&format!("{}\n", report.skills.candidate.join(", ")));
        }

        Ok(output)
    }

    fn format_ranking(&self, ranking: &[RankedCandidate]) -> Result<String> {
        let mut output = self.format_header("CANDIDATE RANKING", 1);

        for candidate in ranking {
            let jd = candidate
                .report
                .jd_match_score
                .map_or_else(|| "-".to_string(), |s| format!("{:.2}", s));
            output.push_str(&format!(
                "{:>3}. {:<32} final {:>6.2}  cv {:>5.2}  jd {:>6} {}{}\n",
                candidate.rank,
                candidate.label,
                candidate.report.final_score,
                candidate.report.cv.score,
                jd,
                self.format_score_badge(candidate.report.final_score),
                if candidate.report.degraded {
                    format!(" {}", self.colorize("(degraded)", Color::Yellow))
                } else {
                    String::new()
                }
            ));
        }

        if self.detailed {
            for candidate in ranking {
                output.push_str(&self.format_header(&format!("#{} {}", candidate.rank, candidate.label), 2));
                output.push_str(&self.format_report(&candidate.report)?);
            }
        }
        Ok(output)
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn format_ranking(&self, ranking: &[RankedCandidate]) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(ranking)?)
        } else {
            Ok(serde_json::to_string(ranking)?)
        }
    }
}

pub fn formatter_for(format: OutputFormat, detailed: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter::new(true, detailed)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::report::{CategoryLine, SkillGap};
    use crate::processing::combiner::ScoringState;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn report() -> ScoreReport {
        ScoreReport {
            final_score: 88.0,
            state: ScoringState::CvJobMatch,
            state_description: ScoringState::CvJobMatch.description().to_string(),
            cv: DocumentSection {
                score: 60.0,
                maximum: 60.0,
                breakdown: vec![CategoryLine {
                    category: "experience".to_string(),
                    points: 20.0,
                }],
                strengths: vec!["Clear impact statements".to_string()],
                gaps: Vec::new(),
                summary: "Solid CV".to_string(),
            },
            cover_letter: None,
            jd_match_score: Some(80.0),
            skills: SkillGap {
                candidate: vec!["rust".to_string()],
                matched: vec!["rust".to_string()],
                missing: vec!["kubernetes".to_string()],
                suggestions: BTreeMap::new(),
            },
            degraded: false,
            degraded_components: Vec::new(),
            embedding_mode: None,
            qualitative_provider: "heuristic".to_string(),
            processing_time_ms: 12,
            scored_at: "2024-01-01 00:00:00 UTC".to_string(),
        }
    }

    #[test]
    fn test_console_report_plain() {
        let output = ConsoleFormatter::new(false, true).format_report(&report()).unwrap();
        assert!(output.contains("Final Score: 88.00 [STRONG MATCH]"));
        assert!(output.contains("Semantic match: 80.00%"));
        assert!(output.contains("Missing skills: kubernetes"));
        assert!(output.contains("+ Clear impact statements"));
        assert!(!output.contains("Degraded"));
    }

    #[test]
    fn test_json_report_round_trips_fields() {
        let output = JsonFormatter::new(false).format_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["final_score"], 88.0);
        assert_eq!(value["state"], "cv_job_match");
        assert_eq!(value["skills"]["missing"][0], "kubernetes");
    }

    #[test]
    fn test_save_report_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports").join("candidate.json");

        save_report_to_file("{}", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
