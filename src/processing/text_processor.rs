//! Text normalization and chunking

use crate::error::{Result, ScoringError};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

pub struct TextProcessor {
    paragraph_regex: Regex,
    whitespace_regex: Regex,
}

/// A unit of text no longer than the chunk budget, tagged with whether it
/// opens a new paragraph.
#[derive(Debug, Clone)]
struct Piece {
    text: String,
    new_paragraph: bool,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProcessor {
    pub fn new() -> Self {
        let paragraph_regex = Regex::new(r"\n[ \t\r\f\v]*\n").expect("Invalid paragraph regex");
        let whitespace_regex = Regex::new(r"\s+").expect("Invalid whitespace regex");

        Self {
            paragraph_regex,
            whitespace_regex,
        }
    }

    /// Split text into segments of at most `max_chars` characters.
    ///
    /// Paragraph boundaries are preferred, then sentence boundaries, then
    /// whitespace, and only then hard character cuts. Lengths are counted in
    /// Unicode scalar values. Empty input yields no segments.
    pub fn chunk(&self, text: &str, max_chars: usize) -> Result<Vec<String>> {
        if max_chars == 0 {
            return Err(ScoringError::invalid_input("max_chars must be greater than zero"));
        }

        let normalized = self.normalize_unicode(text);
        let mut pieces = Vec::new();

        for paragraph in self.paragraph_regex.split(&normalized) {
            let paragraph = self.normalize_whitespace(paragraph);
            if paragraph.is_empty() {
                continue;
            }

            for (i, unit) in self.split_to_fit(&paragraph, max_chars).into_iter().enumerate() {
                pieces.push(Piece {
                    text: unit,
                    new_paragraph: i == 0,
                });
            }
        }

        Ok(Self::pack(pieces, max_chars))
    }

    /// Break one paragraph into units that each fit the budget
    fn split_to_fit(&self, paragraph: &str, max_chars: usize) -> Vec<String> {
        if char_len(paragraph) <= max_chars {
            return vec![paragraph.to_string()];
        }

        let mut units = Vec::new();
        for sentence in self.split_sentences(paragraph) {
            if char_len(&sentence) <= max_chars {
                units.push(sentence);
                continue;
            }

            for word in sentence.split_whitespace() {
                if char_len(word) <= max_chars {
                    units.push(word.to_string());
                } else {
                    units.extend(hard_cut(word, max_chars));
                }
            }
        }

        units
    }

    /// Greedily merge pieces into segments without exceeding the budget
    fn pack(pieces: Vec<Piece>, max_chars: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for piece in pieces {
            let piece_len = char_len(&piece.text);
            let separator = if current.is_empty() {
                ""
            } else if piece.new_paragraph {
                "\n\n"
            } else {
                " "
            };

            if current_len + separator.len() + piece_len <= max_chars {
                current.push_str(separator);
                current.push_str(&piece.text);
                current_len += separator.len() + piece_len;
            } else {
                chunks.push(std::mem::take(&mut current));
                current.push_str(&piece.text);
                current_len = piece_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Lower-cased Unicode words
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| word.to_lowercase())
            .filter(|word| word.chars().any(|c| c.is_alphanumeric()))
            .collect()
    }

    /// Split text into sentences
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        text.unicode_sentences()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Collapse runs of whitespace (tabs, newlines) into single spaces
    pub fn normalize_whitespace(&self, text: &str) -> String {
        self.whitespace_regex.replace_all(text, " ").trim().to_string()
    }

    /// Map typographic punctuation onto ASCII equivalents
    pub fn normalize_unicode(&self, text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' => '\'',
                '\u{201C}' | '\u{201D}' => '"',
                '\u{2013}' | '\u{2014}' => '-',
                '\u{2026}' => '.',
                '\u{00A0}' => ' ',
                _ => c,
            })
            .collect()
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn hard_cut(word: &str, max_chars: usize) -> Vec<String> {
    word.chars()
        .collect::<Vec<char>>()
        .chunks(max_chars)
        .map(|cs| cs.iter().collect())
        .collect()
}
