//! Document structures and section detection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    content: String,
    kind: DocumentKind,
    metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    CoverLetter,
    JobDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub sections: BTreeMap<SectionType, SectionInfo>,
    pub word_count: usize,
    pub character_count: usize,
}

/// Byte range of a section body, header line included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Skills,
    Experience,
    Education,
    Summary,
    Projects,
    Certifications,
}

const SECTION_PATTERNS: &[(SectionType, &[&str])] = &[
    (SectionType::Skills, &["skills", "technical skills", "core competencies", "expertise"]),
    (
        SectionType::Experience,
        &["experience", "work experience", "professional experience", "employment", "work history"],
    ),
    (SectionType::Education, &["education", "academic background", "qualifications"]),
    (SectionType::Summary, &["summary", "profile", "objective", "about me", "overview"]),
    (SectionType::Projects, &["projects", "portfolio", "notable projects"]),
    (SectionType::Certifications, &["certifications", "certificates", "licenses"]),
];

/// Longest line still considered a header
const MAX_HEADER_CHARS: usize = 40;

impl Document {
    pub fn new(content: impl Into<String>, kind: DocumentKind) -> Self {
        let content = content.into();
        let word_count = content.split_whitespace().count();
        let character_count = content.chars().count();
        let sections = detect_sections(&content);

        Self {
            content,
            kind,
            metadata: DocumentMetadata {
                sections,
                word_count,
                character_count,
            },
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn has_section(&self, section: SectionType) -> bool {
        self.metadata.sections.contains_key(&section)
    }

    pub fn section_text(&self, section: SectionType) -> Option<&str> {
        self.metadata
            .sections
            .get(&section)
            .map(|info| &self.content[info.start_index..info.end_index])
    }
}

fn header_type(line: &str) -> Option<SectionType> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_HEADER_CHARS {
        return None;
    }

    let normalized = trimmed
        .trim_end_matches(':')
        .trim_start_matches(|c: char| c == '#' || c.is_whitespace())
        .trim()
        .to_lowercase();

    SECTION_PATTERNS.iter().find_map(|(section, patterns)| {
        patterns
            .iter()
            .any(|p| {
                normalized == *p
                    || normalized
                        .strip_prefix(p)
                        .map_or(false, |rest| rest.starts_with(':'))
            })
            .then_some(*section)
    })
}

/// First occurrence of each section header wins
fn detect_sections(content: &str) -> BTreeMap<SectionType, SectionInfo> {
    let mut headers: Vec<(SectionType, usize)> = Vec::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        if let Some(section) = header_type(line) {
            headers.push((section, offset));
        }
        offset += line.len();
    }

    let mut sections = BTreeMap::new();
    for (i, (section, start_index)) in headers.iter().enumerate() {
        let end_index = headers
            .get(i + 1)
            .map(|(_, next)| *next)
            .unwrap_or(content.len());

        sections.entry(*section).or_insert(SectionInfo {
            start_index: *start_index,
            end_index,
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe\n\nSummary\nBackend engineer.\n\nExperience:\nAcme Corp 2018-2024\n\nEducation\nBSc Computer Science\n\nSkills: Rust, SQL\n";

    #[test]
    fn test_document_metadata() {
        let doc = Document::new("Rust engineer with SQL", DocumentKind::Resume);
        assert_eq!(doc.metadata().word_count, 4);
        assert_eq!(doc.metadata().character_count, 22);
        assert_eq!(doc.kind(), DocumentKind::Resume);
        assert!(!doc.is_blank());
    }

    #[test]
    fn test_section_detection() {
        let doc = Document::new(RESUME, DocumentKind::Resume);

        assert!(doc.has_section(SectionType::Summary));
        assert!(doc.has_section(SectionType::Experience));
        assert!(doc.has_section(SectionType::Education));
        assert!(doc.has_section(SectionType::Skills));
        assert!(!doc.has_section(SectionType::Projects));

        let education = doc.section_text(SectionType::Education).unwrap();
        assert!(education.starts_with("Education"));
        assert!(education.contains("BSc Computer Science"));
        assert!(!education.contains("Skills"));
    }

    #[test]
    fn test_long_lines_are_not_headers() {
        let doc = Document::new(
            "I have broad experience leading teams across several industries\n",
            DocumentKind::CoverLetter,
        );
        assert!(doc.metadata().sections.is_empty());
    }

    #[test]
    fn test_blank_document() {
        assert!(Document::new("  \n\t", DocumentKind::JobDescription).is_blank());
    }
}
