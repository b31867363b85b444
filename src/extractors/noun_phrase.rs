//! Noun phrases ending in a target word ("communication skills",
//! "strong analytical abilities").
//!
//! A phrase is the target word plus the run of content words directly in
//! front of it on the same line. The run stops at punctuation, at a stop word
//! (articles, pronouns, prepositions, conjunctions, auxiliary verbs) or after
//! `MAX_MODIFIERS` words. A bare target word ("skills") is not a candidate.

use super::{is_bulleted, next_line, CandidateSkills, SkillExtractor};
use crate::candidate::CandidateSkill;
use crate::config::ExtractionConfig;
use crate::document::Document;
use crate::error::{Result, SkillError};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

pub const SKILL_ENDING_NAME: &str = "skill_ending_pattern";
pub const ABILITY_ENDING_NAME: &str = "ability_ending_pattern";

const MAX_MODIFIERS: usize = 4;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\p{L}[\p{L}\p{N}'’-]*").unwrap();
    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "an", "the", "this", "that", "these", "those", "other", "such", "any", "all", "some",
        "each", "every", "no", "of", "in", "on", "at", "to", "for", "with", "by", "from", "as",
        "into", "about", "and", "or", "but", "nor", "i", "you", "he", "she", "it", "we", "they",
        "your", "our", "their", "his", "her", "its", "my", "is", "are", "was", "were", "be", "been",
        "being", "am", "has", "have", "had", "having", "do", "does", "did", "will", "would", "shall",
        "should", "can", "could", "may", "might", "must", "possess", "possesses", "demonstrate",
        "demonstrated", "demonstrates", "require", "requires", "required", "include", "includes",
        "including", "using", "use", "need", "needs", "needed", "who", "which", "what", "also",
        "very", "more", "most", "not",
    ]
    .into_iter()
    .collect();
}

/// Pattern-based extractor: no ontology, no confidence.
///
/// With `only_bulleted_lines` (the default) only lines starting with a bullet
/// marker are scanned. Text without any line break therefore produces no
/// candidates in that mode; turn the flag off for single-paragraph sources.
#[derive(Debug, Clone)]
pub struct NounPhraseEndingExtractor {
    name: String,
    endings: HashSet<String>,
    only_bulleted_lines: bool,
    bullet_chars: Vec<char>,
    text_fields: Vec<String>,
}

impl NounPhraseEndingExtractor {
    /// Extractor for phrases ending in any of `endings`.
    ///
    /// Each ending must be a single word; anything else is a configuration error.
    pub fn new<I, S>(name: impl Into<String>, endings: I, config: &ExtractionConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        config.validate()?;

        let mut set = HashSet::new();
        for ending in endings {
            let ending = ending.as_ref().trim().to_lowercase();
            let single_word = WORD
                .find(&ending)
                .map(|m| m.start() == 0 && m.end() == ending.len())
                .unwrap_or(false);
            if !single_word {
                return Err(SkillError::Config(format!(
                    "Unsupported target word {:?}: endings must be single words",
                    ending
                )));
            }
            set.insert(ending);
        }
        if set.is_empty() {
            return Err(SkillError::Config("At least one target word is required".to_string()));
        }

        let extractor = Self {
            name: name.into(),
            endings: set,
            only_bulleted_lines: config.only_bulleted_lines,
            bullet_chars: config.bullet_chars.clone(),
            text_fields: config.text_fields.clone(),
        };
        tracing::debug!(
            "Created {} extractor (endings: {:?}, only_bulleted_lines: {})",
            extractor.name,
            extractor.endings,
            extractor.only_bulleted_lines
        );
        Ok(extractor)
    }

    /// Phrases ending in "skill" or "skills".
    pub fn skills(config: &ExtractionConfig) -> Result<Self> {
        Self::new(SKILL_ENDING_NAME, ["skill", "skills"], config)
    }

    /// Phrases ending in "ability" or "abilities".
    pub fn abilities(config: &ExtractionConfig) -> Result<Self> {
        Self::new(ABILITY_ENDING_NAME, ["ability", "abilities"], config)
    }

    pub fn only_bulleted_lines(&self) -> bool {
        self.only_bulleted_lines
    }

    /// Matching phrases in one line as (byte range within the line).
    fn phrases_in_line(&self, line: &str) -> Vec<std::ops::Range<usize>> {
        let words: Vec<regex::Match<'_>> = WORD.find_iter(line).collect();
        let mut phrases = Vec::new();

        for (i, word) in words.iter().enumerate() {
            if !self.endings.contains(&word.as_str().to_lowercase()) {
                continue;
            }

            let mut first = i;
            while first > 0 && i - first < MAX_MODIFIERS {
                let prev = &words[first - 1];
                let gap = &line[prev.end()..words[first].start()];
                if !gap.chars().all(char::is_whitespace) {
                    break;
                }
                let lower = prev.as_str().to_lowercase();
                if STOP_WORDS.contains(lower.as_str()) || self.endings.contains(&lower) {
                    break;
                }
                first -= 1;
            }

            if first < i {
                phrases.push(words[first].start()..word.end());
            }
        }

        phrases
    }
}

impl SkillExtractor for NounPhraseEndingExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidate_skills<'a>(&'a self, document: &Arc<Document>) -> Result<CandidateSkills<'a>> {
        let text = document.text(&self.text_fields)?;

        if self.only_bulleted_lines && !text.contains('\n') {
            tracing::debug!(
                "Document {} has no line breaks; no bulleted lines to scan",
                document.id
            );
            return Ok(Box::new(std::iter::empty()));
        }

        Ok(Box::new(NounPhraseMatches {
            extractor: self,
            document: Arc::clone(document),
            text,
            cursor: 0,
            pending: VecDeque::new(),
        }))
    }
}

/// Walks the text line by line, buffering the candidates of one line at a time.
struct NounPhraseMatches<'a> {
    extractor: &'a NounPhraseEndingExtractor,
    document: Arc<Document>,
    text: String,
    cursor: usize,
    pending: VecDeque<CandidateSkill>,
}

impl Iterator for NounPhraseMatches<'_> {
    type Item = CandidateSkill;

    fn next(&mut self) -> Option<CandidateSkill> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                return Some(candidate);
            }

            let (line_start, line, next) = next_line(&self.text, self.cursor)?;
            self.cursor = next;

            if self.extractor.only_bulleted_lines && !is_bulleted(line, &self.extractor.bullet_chars) {
                continue;
            }

            for range in self.extractor.phrases_in_line(line) {
                self.pending.push_back(CandidateSkill::new(
                    &line[range.clone()],
                    line.trim(),
                    line_start + range.start,
                    &self.document,
                    &self.extractor.name,
                ));
            }
        }
    }
}
