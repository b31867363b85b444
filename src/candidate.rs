//! The result record shared by every extraction strategy, and a counter for
//! folding candidates into per-skill totals.

use crate::document::{Document, DocumentType};
use crate::error::Result;
use polars::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;

/// A possible occurrence of a skill in some document.
///
/// Immutable once built: fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSkill {
    skill_name: String,
    matched_skill_identifier: Option<String>,
    context: String,
    start_index: usize,
    confidence: Option<f64>,
    document_id: String,
    document_type: DocumentType,
    #[serde(serialize_with = "serialize_source_id")]
    source_object: Arc<Document>,
    skill_extractor_name: String,
}

fn serialize_source_id<S: Serializer>(doc: &Arc<Document>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&doc.id)
}

impl CandidateSkill {
    /// `start_index` is a byte offset into the text the extractor scanned.
    pub fn new(
        skill_name: impl Into<String>,
        context: impl Into<String>,
        start_index: usize,
        source_object: &Arc<Document>,
        skill_extractor_name: &str,
    ) -> Self {
        let skill_name = skill_name.into();
        debug_assert!(!skill_name.is_empty(), "candidate skill names are never empty");
        Self {
            skill_name,
            matched_skill_identifier: None,
            context: context.into(),
            start_index,
            confidence: None,
            document_id: source_object.id.clone(),
            document_type: source_object.document_type.clone(),
            source_object: Arc::clone(source_object),
            skill_extractor_name: skill_extractor_name.to_string(),
        }
    }

    pub fn with_match(mut self, identifier: impl Into<String>) -> Self {
        self.matched_skill_identifier = Some(identifier.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn skill_name(&self) -> &str {
        &self.skill_name
    }

    pub fn matched_skill_identifier(&self) -> Option<&str> {
        self.matched_skill_identifier.as_deref()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn document_type(&self) -> &DocumentType {
        &self.document_type
    }

    pub fn source_object(&self) -> &Arc<Document> {
        &self.source_object
    }

    pub fn skill_extractor_name(&self) -> &str {
        &self.skill_extractor_name
    }
}

/// Occurrence counts keyed by skill name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillCounts {
    counts: HashMap<String, usize>,
}

impl SkillCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, skill_name: &str) {
        *self.counts.entry(skill_name.to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &SkillCounts) {
        for (name, count) in &other.counts {
            *self.counts.entry(name.clone()).or_insert(0) += count;
        }
    }

    pub fn get(&self, skill_name: &str) -> usize {
        self.counts.get(skill_name).copied().unwrap_or(0)
    }

    /// Number of distinct skill names.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all occurrences.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// The `n` most frequent names, count descending then name ascending.
    pub fn most_common(&self, n: usize) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    /// Tabulate as a two-column frame (`skill name`, `count`), most common first.
    pub fn into_frame(self) -> Result<DataFrame> {
        let entries = self.most_common(self.counts.len());
        let names: Vec<String> = entries.iter().map(|(name, _)| name.clone()).collect();
        let counts: Vec<u64> = entries.iter().map(|(_, count)| *count as u64).collect();

        Ok(DataFrame::new(vec![
            Series::new("skill name", names),
            Series::new("count", counts),
        ])?)
    }
}

impl<'a> FromIterator<&'a CandidateSkill> for SkillCounts {
    fn from_iter<I: IntoIterator<Item = &'a CandidateSkill>>(iter: I) -> Self {
        let mut counts = SkillCounts::new();
        for candidate in iter {
            counts.add(candidate.skill_name());
        }
        counts
    }
}

impl FromIterator<CandidateSkill> for SkillCounts {
    fn from_iter<I: IntoIterator<Item = CandidateSkill>>(iter: I) -> Self {
        let mut counts = SkillCounts::new();
        for candidate in iter {
            counts.add(candidate.skill_name());
        }
        counts
    }
}
