//! Prompt templates for rubric analysis

use crate::llm::rubric::{Rubric, RubricKind};
use regex::{Captures, Regex};

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub cv_analysis: String,
    pub cover_letter_analysis: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            cv_analysis: CV_ANALYSIS_TEMPLATE.to_string(),
            cover_letter_analysis: COVER_LETTER_ANALYSIS_TEMPLATE.to_string(),
        }
    }
}

/// Excerpts already truncated by the caller
#[derive(Debug, Clone)]
pub struct PromptParams<'a> {
    pub document: &'a str,
    pub job: Option<&'a str>,
}

impl PromptTemplates {
    pub fn render(&self, rubric: &Rubric, params: &PromptParams<'_>) -> String {
        let template = match rubric.kind() {
            RubricKind::Cv => &self.cv_analysis,
            RubricKind::CoverLetter => &self.cover_letter_analysis,
        };

        let job_section = match params.job {
            Some(job) => format!("<JOB DESCRIPTION>\n{}\n</JOB DESCRIPTION>\n\n", job),
            None => String::new(),
        };

        let total = format_points(rubric.total());
        let criteria = render_criteria(rubric);
        let schema = render_schema(rubric);

        // Single pass: substituted text is never scanned for placeholders
        let placeholder = Regex::new(r"\{([a-z_]+)\}").expect("Invalid placeholder regex");
        placeholder
            .replace_all(template, |caps: &Captures| match &caps[1] {
                "total" => total.clone(),
                "criteria" => criteria.clone(),
                "schema" => schema.clone(),
                "job_section" => job_section.clone(),
                "document" => params.document.to_string(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

fn render_criteria(rubric: &Rubric) -> String {
    rubric
        .categories()
        .iter()
        .map(|c| format!("- {} ({} points)", c.label, format_points(c.ceiling)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_schema(rubric: &Rubric) -> String {
    let scores = rubric
        .categories()
        .iter()
        .map(|c| format!("        \"{}\": <score out of {}>", c.key, format_points(c.ceiling)))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "{{\n    \"category_scores\": {{\n{}\n    }},\n    \"strengths\": [<key strengths>],\n    \"gaps\": [<areas to improve>],\n    \"matched_skills\": [<skills matching the job>],\n    \"missing_skills\": [<job skills not evidenced>],\n    \"summary\": \"<brief overall summary>\"\n}}",
        scores
    )
}

fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{:.0}", points)
    } else {
        format!("{}", points)
    }
}

const CV_ANALYSIS_TEMPLATE: &str = r#"You are an expert HR recruiter and CV analyst. Provide objective, fair, and constructive feedback.

TASK: Evaluate the CV below. Score it out of {total} points based on:
{criteria}

{job_section}<CV>
{document}
</CV>

Respond ONLY with a valid JSON object in this format:
{schema}"#;

const COVER_LETTER_ANALYSIS_TEMPLATE: &str = r#"You are an expert HR recruiter analyzing cover letters. Provide objective and constructive feedback.

TASK: Evaluate the cover letter below. Score it out of {total} points based on:
{criteria}

{job_section}<COVER LETTER>
{document}
</COVER LETTER>

Respond ONLY with a valid JSON object in this format:
{schema}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cv_prompt_rendering() {
        let templates = PromptTemplates::default();
        let params = PromptParams {
            document: "Software Engineer with Python experience at Tech Corp.",
            job: Some("Senior Software Engineer role requiring React and Python."),
        };

        let prompt = templates.render(&Rubric::cv(), &params);

        assert!(prompt.contains("Software Engineer with Python experience at Tech Corp"));
        assert!(prompt.contains("<JOB DESCRIPTION>"));
        assert!(prompt.contains("out of 60 points"));
        assert!(prompt.contains("- Relevant work experience (20 points)"));
        assert!(prompt.contains("\"progression\": <score out of 8>"));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn test_cover_letter_prompt_without_job() {
        let templates = PromptTemplates::default();
        let params = PromptParams {
            document: "Dear Hiring Manager",
            job: None,
        };

        let prompt = templates.render(&Rubric::cover_letter(), &params);

        assert!(prompt.contains("<COVER LETTER>\nDear Hiring Manager\n</COVER LETTER>"));
        assert!(prompt.contains("out of 40 points"));
        assert!(!prompt.contains("<JOB DESCRIPTION>"));
        assert!(!prompt.contains("{job_section}"));
    }

    #[test]
    fn test_placeholders_in_user_text_are_left_alone() {
        let templates = PromptTemplates::default();
        let params = PromptParams {
            document: "CV body mentioning {schema}",
            job: Some("Paste {document} here and score out of {total}"),
        };

        let prompt = templates.render(&Rubric::cv(), &params);

        assert!(prompt.contains("Paste {document} here and score out of {total}"));
        assert!(prompt.contains("CV body mentioning {schema}"));
        assert_eq!(prompt.matches("CV body mentioning").count(), 1);
    }
}
