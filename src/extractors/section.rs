//! Sentences found under skill-like section headers.
//!
//! Job postings are commonly divided into sections ("Qualifications:",
//! "REQUIRED SKILLS"). Every sentence inside a section whose header mentions
//! one of the configured keywords is a candidate, with the header line as its
//! context.

use super::{is_bulleted, next_line, sentence_spans, CandidateSkills, SkillExtractor};
use crate::candidate::CandidateSkill;
use crate::config::ExtractionConfig;
use crate::document::Document;
use crate::error::{Result, SkillError};
use std::collections::VecDeque;
use std::sync::Arc;

pub const SECTION_EXTRACT_NAME: &str = "section_extract";

const MAX_HEADER_WORDS: usize = 6;

#[derive(Debug, Clone)]
pub struct SectionExtractSkillExtractor {
    section_keywords: Vec<String>,
    bullet_chars: Vec<char>,
    text_fields: Vec<String>,
}

impl SectionExtractSkillExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Self::with_keywords(["skills", "competencies", "qualifications", "requirements"], config)
    }

    pub fn with_keywords<I, S>(keywords: I, config: &ExtractionConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        config.validate()?;
        let section_keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if section_keywords.is_empty() {
            return Err(SkillError::Config("At least one section keyword is required".to_string()));
        }

        Ok(Self {
            section_keywords,
            bullet_chars: config.bullet_chars.clone(),
            text_fields: config.text_fields.clone(),
        })
    }

    fn is_wanted_section(&self, header: &str) -> bool {
        let lower = header.to_lowercase();
        self.section_keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// A short, unbulleted line that ends with ':' or is written in capitals.
fn is_header(line: &str, bullet_chars: &[char]) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty()
        || is_bulleted(trimmed, bullet_chars)
        || trimmed.split_whitespace().count() > MAX_HEADER_WORDS
    {
        return false;
    }
    if trimmed.ends_with(':') {
        return true;
    }
    let mut letters = trimmed.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

impl SkillExtractor for SectionExtractSkillExtractor {
    fn name(&self) -> &str {
        SECTION_EXTRACT_NAME
    }

    fn candidate_skills<'a>(&'a self, document: &Arc<Document>) -> Result<CandidateSkills<'a>> {
        let text = document.text(&self.text_fields)?;
        Ok(Box::new(SectionSentences {
            extractor: self,
            document: Arc::clone(document),
            text,
            cursor: 0,
            header: None,
            pending: VecDeque::new(),
        }))
    }
}

struct SectionSentences<'a> {
    extractor: &'a SectionExtractSkillExtractor,
    document: Arc<Document>,
    text: String,
    cursor: usize,
    /// Header of the current section, when that section is wanted
    header: Option<String>,
    pending: VecDeque<CandidateSkill>,
}

impl Iterator for SectionSentences<'_> {
    type Item = CandidateSkill;

    fn next(&mut self) -> Option<CandidateSkill> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                return Some(candidate);
            }

            let (line_start, line, next) = next_line(&self.text, self.cursor)?;
            self.cursor = next;

            if is_header(line, &self.extractor.bullet_chars) {
                self.header = self
                    .extractor
                    .is_wanted_section(line)
                    .then(|| line.trim().to_string());
                continue;
            }

            let Some(header) = &self.header else {
                continue;
            };

            for span in sentence_spans(line) {
                let sentence = &line[span.clone()];
                let body = sentence.trim_start_matches(|c: char| {
                    c.is_whitespace() || self.extractor.bullet_chars.contains(&c)
                });
                if body.is_empty() {
                    continue;
                }
                let offset = span.start + (sentence.len() - body.len());
                self.pending.push_back(CandidateSkill::new(
                    body,
                    header.as_str(),
                    line_start + offset,
                    &self.document,
                    SECTION_EXTRACT_NAME,
                ));
            }
        }
    }
}
