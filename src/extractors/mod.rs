//! # Skill Extractors
//!
//! Every strategy turns one document into a lazy, restartable sequence of
//! [`CandidateSkill`] records behind the same [`SkillExtractor`] trait:
//!
//! - [`NounPhraseEndingExtractor`]: noun phrases ending in "skill(s)" or "ability/abilities"
//! - [`SectionExtractSkillExtractor`]: sentences under skill/qualification headers
//! - [`ExactMatchSkillExtractor`]: exact, longest-first competency name matches
//! - [`OccupationScopedExactMatchSkillExtractor`]: exact matching restricted to the document's occupation
//! - [`FuzzyMatchSkillExtractor`]: edit-distance tolerant competency name matches
//!
//! Offsets (`start_index`) are byte offsets into the newline-joined text of the
//! configured fields.

pub mod noun_phrase;
pub mod section;
pub mod exact;
pub mod fuzzy;

pub use exact::{ExactMatchSkillExtractor, NameMatcher, OccupationScopedExactMatchSkillExtractor};
pub use fuzzy::{fuzzy_confidence, FuzzyMatchSkillExtractor};
pub use noun_phrase::NounPhraseEndingExtractor;
pub use section::SectionExtractSkillExtractor;

use crate::candidate::{CandidateSkill, SkillCounts};
use crate::document::Document;
use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;
use std::sync::Arc;

/// Pull-based sequence of candidates for one document.
pub type CandidateSkills<'a> = Box<dyn Iterator<Item = CandidateSkill> + Send + 'a>;

pub trait SkillExtractor: Send + Sync {
    /// Stable identifier of the algorithm, copied into every candidate.
    fn name(&self) -> &str;

    /// Candidates found in `document`.
    ///
    /// Fails up front (before any candidate is produced) when the document
    /// lacks the text this extractor needs. Call again to restart.
    fn candidate_skills<'a>(&'a self, document: &Arc<Document>) -> Result<CandidateSkills<'a>>;

    /// Occurrences of each skill name within one document.
    fn document_skill_counts(&self, document: &Arc<Document>) -> Result<SkillCounts> {
        Ok(self.candidate_skills(document)?.collect())
    }
}

lazy_static! {
    /// Sentence terminators (with trailing whitespace) and line breaks
    static ref SENTENCE_BREAK: Regex = Regex::new(r"[.!?;]+(?:\s+|$)|\n").unwrap();
}

/// Byte ranges of the sentences in `text`, trimmed, empty ones dropped.
pub(crate) fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK.find_iter(text) {
        push_trimmed(text, start..m.start(), &mut spans);
        start = m.end();
    }
    push_trimmed(text, start..text.len(), &mut spans);
    spans
}

fn push_trimmed(text: &str, range: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing < slice.len() {
        spans.push(range.start + leading..range.end - trailing);
    }
}

/// The sentence containing byte offset `pos`, or the whole text if none does.
pub(crate) fn sentence_at<'t>(text: &'t str, spans: &[Range<usize>], pos: usize) -> &'t str {
    let idx = spans.partition_point(|s| s.end <= pos);
    match spans.get(idx) {
        Some(span) if span.start <= pos => &text[span.clone()],
        _ => text.trim(),
    }
}

/// Next line starting at byte `from`: (line start, line without `\r`, start of following line).
pub(crate) fn next_line(text: &str, from: usize) -> Option<(usize, &str, usize)> {
    if from >= text.len() {
        return None;
    }
    let rest = &text[from..];
    let (line, next) = match rest.find('\n') {
        Some(i) => (&rest[..i], from + i + 1),
        None => (rest, text.len()),
    };
    Some((from, line.strip_suffix('\r').unwrap_or(line), next))
}

/// Whether `line` starts (after indentation) with one of the bullet markers.
pub(crate) fn is_bulleted(line: &str, bullet_chars: &[char]) -> bool {
    line.trim_start()
        .chars()
        .next()
        .map(|c| bullet_chars.contains(&c))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_spans() {
        let text = "First one. Second; third\n\n  Fourth line  ";
        let sentences: Vec<&str> = sentence_spans(text).into_iter().map(|r| &text[r]).collect();
        assert_eq!(sentences, vec!["First one", "Second", "third", "Fourth line"]);
    }

    #[test]
    fn test_sentence_keeps_inner_dots() {
        let text = "Experience with Node.js required.";
        let spans = sentence_spans(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(sentence_at(text, &spans, 18), "Experience with Node.js required");
    }

    #[test]
    fn test_next_line() {
        let text = "a\r\nbb\nccc";
        assert_eq!(next_line(text, 0), Some((0, "a", 3)));
        assert_eq!(next_line(text, 3), Some((3, "bb", 6)));
        assert_eq!(next_line(text, 6), Some((6, "ccc", 9)));
        assert_eq!(next_line(text, 9), None);
    }

    #[test]
    fn test_is_bulleted() {
        let bullets = ['-', '•'];
        assert!(is_bulleted("  • Teamwork skills", &bullets));
        assert!(is_bulleted("- item", &bullets));
        assert!(!is_bulleted("Teamwork skills", &bullets));
        assert!(!is_bulleted("", &bullets));
    }
}
