//! Edit-distance tolerant competency name matching.
//!
//! Windowing: each sentence is tokenized and only token n-grams whose length
//! equals the token count of some competency name (capped at
//! `max_ngram_tokens`) are compared, and only against names with that token
//! count whose character length is within `max_edit_distance` of the window.
//! Names longer than `max_ngram_tokens` tokens, and spellings that split or
//! merge tokens, are therefore never matched.
//!
//! Confidence is `1 - distance / max(len(window), len(name))` in characters,
//! which lies in `[0, 1]` and never increases with distance. For one window
//! the smallest distance wins, ties going to the smallest identifier.
//! Overlapping windows inside a sentence keep the longer span, then the
//! higher confidence, then the earlier start, so a near miss on a longer
//! name is not displaced by an exact hit on a shorter one. Candidates are
//! emitted in ascending `start_index`.

use super::exact::normalize_name;
use super::{sentence_spans, CandidateSkills, SkillExtractor};
use crate::candidate::CandidateSkill;
use crate::config::ExtractionConfig;
use crate::document::Document;
use crate::error::Result;
use crate::ontology::{Competency, CompetencyOntology};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;

pub const FUZZY_MATCH_NAME: &str = "fuzzy_match";

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[\p{L}\p{N}_][\p{L}\p{N}_+#'’&/-]*").unwrap();
}

/// Confidence for an edit distance between strings of `len_a` and `len_b` characters.
pub fn fuzzy_confidence(distance: usize, len_a: usize, len_b: usize) -> f64 {
    let longest = len_a.max(len_b);
    if longest == 0 {
        return if distance == 0 { 1.0 } else { 0.0 };
    }
    (1.0 - distance as f64 / longest as f64).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
struct FuzzyEntry {
    identifier: String,
    name: String,
    chars: usize,
}

#[derive(Debug, Clone)]
struct FuzzyHit {
    span: Range<usize>,
    identifier: String,
    confidence: f64,
}

#[derive(Debug, Clone)]
pub struct FuzzyMatchSkillExtractor {
    /// Token count -> names with that many tokens
    entries_by_tokens: BTreeMap<usize, Vec<FuzzyEntry>>,
    max_edit_distance: usize,
    min_confidence: f64,
    max_ngram_tokens: usize,
    text_fields: Vec<String>,
}

impl FuzzyMatchSkillExtractor {
    pub fn new<'c, I>(competencies: I, config: &ExtractionConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'c Competency>,
    {
        config.validate()?;

        // Smallest identifier per normalized name
        let mut by_name: HashMap<String, String> = HashMap::new();
        for competency in competencies {
            let name = normalize_name(&competency.name);
            if name.is_empty() {
                continue;
            }
            by_name
                .entry(name)
                .and_modify(|id| {
                    if competency.identifier < *id {
                        *id = competency.identifier.clone();
                    }
                })
                .or_insert_with(|| competency.identifier.clone());
        }

        let mut entries_by_tokens: BTreeMap<usize, Vec<FuzzyEntry>> = BTreeMap::new();
        let mut skipped = 0;
        for (name, identifier) in by_name {
            // Compare in the same token-joined form the windows use
            let words: Vec<&str> = TOKEN.find_iter(&name).map(|m| m.as_str()).collect();
            let tokens = words.len();
            if tokens == 0 || tokens > config.max_ngram_tokens {
                skipped += 1;
                continue;
            }
            let name = words.join(" ");
            entries_by_tokens.entry(tokens).or_default().push(FuzzyEntry {
                identifier,
                chars: name.chars().count(),
                name,
            });
        }
        for entries in entries_by_tokens.values_mut() {
            entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        }

        tracing::debug!(
            "Created fuzzy match extractor with {} names ({} skipped as longer than {} tokens)",
            entries_by_tokens.values().map(Vec::len).sum::<usize>(),
            skipped,
            config.max_ngram_tokens
        );

        Ok(Self {
            entries_by_tokens,
            max_edit_distance: config.max_edit_distance,
            min_confidence: config.min_confidence,
            max_ngram_tokens: config.max_ngram_tokens,
            text_fields: config.text_fields.clone(),
        })
    }

    pub fn from_ontology(ontology: &CompetencyOntology, config: &ExtractionConfig) -> Result<Self> {
        Self::new(ontology.competencies(), config)
    }

    /// Best-matching competency for one normalized window, if any passes the thresholds.
    fn best_match(&self, window: &str, tokens: usize) -> Option<(&FuzzyEntry, usize, f64)> {
        let entries = self.entries_by_tokens.get(&tokens)?;
        let window_chars = window.chars().count();
        let mut best: Option<(&FuzzyEntry, usize, f64)> = None;

        for entry in entries {
            if entry.chars.abs_diff(window_chars) > self.max_edit_distance {
                continue;
            }
            let distance = strsim::levenshtein(window, &entry.name);
            if distance > self.max_edit_distance {
                continue;
            }
            let confidence = fuzzy_confidence(distance, window_chars, entry.chars);
            if confidence < self.min_confidence {
                continue;
            }
            // Entries are sorted by identifier, so strict comparison keeps the smallest on ties
            if best.map_or(true, |(_, d, _)| distance < d) {
                best = Some((entry, distance, confidence));
            }
        }

        best
    }

    /// Non-overlapping hits within one sentence, ascending by start.
    fn hits_in_sentence(&self, text: &str, sentence: &Range<usize>) -> Vec<FuzzyHit> {
        let slice = &text[sentence.clone()];
        let tokens: Vec<Range<usize>> = TOKEN
            .find_iter(slice)
            .map(|m| sentence.start + m.start()..sentence.start + m.end())
            .collect();

        let mut hits = Vec::new();
        for (&n, _) in self.entries_by_tokens.range(1..=self.max_ngram_tokens) {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                let normalized = window
                    .iter()
                    .map(|t| text[t.clone()].to_lowercase())
                    .collect::<Vec<_>>()
                    .join(" ");
                if let Some((entry, _, confidence)) = self.best_match(&normalized, n) {
                    hits.push(FuzzyHit {
                        span: window[0].start..window[n - 1].end,
                        identifier: entry.identifier.clone(),
                        confidence,
                    });
                }
            }
        }

        // Longest span first, as exact matching does
        hits.sort_by(|a, b| {
            b.span
                .len()
                .cmp(&a.span.len())
                .then_with(|| b.confidence.total_cmp(&a.confidence))
                .then_with(|| a.span.start.cmp(&b.span.start))
        });

        let mut kept: Vec<FuzzyHit> = Vec::new();
        for hit in hits {
            let overlaps = kept
                .iter()
                .any(|k| hit.span.start < k.span.end && k.span.start < hit.span.end);
            if !overlaps {
                kept.push(hit);
            }
        }
        kept.sort_by_key(|hit| hit.span.start);
        kept
    }
}

impl SkillExtractor for FuzzyMatchSkillExtractor {
    fn name(&self) -> &str {
        FUZZY_MATCH_NAME
    }

    fn candidate_skills<'a>(&'a self, document: &Arc<Document>) -> Result<CandidateSkills<'a>> {
        let text = document.text(&self.text_fields)?;
        let sentences = sentence_spans(&text);
        Ok(Box::new(FuzzyMatches {
            extractor: self,
            document: Arc::clone(document),
            text,
            sentences: sentences.into(),
            pending: VecDeque::new(),
        }))
    }
}

/// Scores one sentence at a time as candidates are pulled.
struct FuzzyMatches<'a> {
    extractor: &'a FuzzyMatchSkillExtractor,
    document: Arc<Document>,
    text: String,
    sentences: VecDeque<Range<usize>>,
    pending: VecDeque<CandidateSkill>,
}

impl Iterator for FuzzyMatches<'_> {
    type Item = CandidateSkill;

    fn next(&mut self) -> Option<CandidateSkill> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                return Some(candidate);
            }

            let sentence = self.sentences.pop_front()?;
            for hit in self.extractor.hits_in_sentence(&self.text, &sentence) {
                self.pending.push_back(
                    CandidateSkill::new(
                        &self.text[hit.span.clone()],
                        &self.text[sentence.clone()],
                        hit.span.start,
                        &self.document,
                        FUZZY_MATCH_NAME,
                    )
                    .with_match(hit.identifier)
                    .with_confidence(hit.confidence),
                );
            }
        }
    }
}
