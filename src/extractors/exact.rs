//! Exact (case-insensitive) competency name matching.
//!
//! All names are compiled into one alternation ordered longest first, so at
//! any position the longest competency name wins and matches never overlap.
//! Each candidate's context is the sentence containing the match.

use super::{sentence_at, sentence_spans, CandidateSkills, SkillExtractor};
use crate::candidate::CandidateSkill;
use crate::config::ExtractionConfig;
use crate::document::Document;
use crate::error::{Result, SkillError};
use crate::ontology::{Competency, CompetencyOntology, Occupation};
use dashmap::DashMap;
use itertools::Itertools;
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::sync::Arc;

pub const EXACT_MATCH_NAME: &str = "exact_match";
pub const OCCUPATION_SCOPED_NAME: &str = "occupation_scoped_exact_match";

const REGEX_SIZE_LIMIT: usize = 256 * (1 << 20);

/// Compiled lookup from competency names to identifiers.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    pattern: Option<Regex>,
    /// Normalized name -> competency identifier
    identifiers: HashMap<String, String>,
}

/// Lowercase and collapse whitespace.
pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace().map(str::to_lowercase).join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl NameMatcher {
    /// Build from competencies. When several competencies share a name, the
    /// lexicographically smallest identifier is used.
    pub fn new<'c, I>(competencies: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'c Competency>,
    {
        let mut identifiers: HashMap<String, String> = HashMap::new();
        for competency in competencies {
            let key = normalize_name(&competency.name);
            if key.is_empty() {
                continue;
            }
            identifiers
                .entry(key)
                .and_modify(|id| {
                    if competency.identifier < *id {
                        *id = competency.identifier.clone();
                    }
                })
                .or_insert_with(|| competency.identifier.clone());
        }

        if identifiers.is_empty() {
            return Ok(Self { pattern: None, identifiers });
        }

        let alternatives = identifiers
            .keys()
            .sorted_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)))
            .map(|name| {
                let body = name.split(' ').map(|word| regex::escape(word)).join(r"\s+");
                let lead = if name.starts_with(is_word_char) { r"\b" } else { "" };
                let tail = if name.ends_with(is_word_char) { r"\b" } else { "" };
                format!("{}{}{}", lead, body, tail)
            })
            .join("|");

        let pattern = RegexBuilder::new(&format!("(?:{})", alternatives))
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .dfa_size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| SkillError::Config(format!("Failed to compile competency names: {}", e)))?;

        Ok(Self {
            pattern: Some(pattern),
            identifiers,
        })
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Next match at or after byte `from`: (matched range, competency identifier).
    pub fn find_at(&self, text: &str, from: usize) -> Option<(Range<usize>, &str)> {
        let pattern = self.pattern.as_ref()?;
        let mut from = from;
        while from <= text.len() {
            let m = pattern.find_at(text, from)?;
            if let Some(id) = self.identifiers.get(&normalize_name(m.as_str())) {
                return Some((m.range(), id.as_str()));
            }
            // Case folding disagreed with `to_lowercase`; skip past this match
            from = m.end().max(m.start() + 1);
        }
        None
    }

    /// All non-overlapping matches in `text`, left to right.
    pub fn find_iter<'m, 't>(&'m self, text: &'t str) -> impl Iterator<Item = (Range<usize>, &'m str)> + 't
    where
        'm: 't,
    {
        let mut from = 0;
        std::iter::from_fn(move || {
            let (range, id) = self.find_at(text, from)?;
            from = range.end;
            Some((range, id))
        })
    }
}

/// Emits one candidate per name match, in ascending start order.
struct NameMatches {
    matcher: Arc<NameMatcher>,
    document: Arc<Document>,
    text: String,
    sentences: Vec<Range<usize>>,
    cursor: usize,
    extractor_name: &'static str,
}

impl NameMatches {
    fn new(matcher: Arc<NameMatcher>, document: &Arc<Document>, text: String, extractor_name: &'static str) -> Self {
        let sentences = sentence_spans(&text);
        Self {
            matcher,
            document: Arc::clone(document),
            text,
            sentences,
            cursor: 0,
            extractor_name,
        }
    }
}

impl Iterator for NameMatches {
    type Item = CandidateSkill;

    fn next(&mut self) -> Option<CandidateSkill> {
        let (range, identifier) = self.matcher.find_at(&self.text, self.cursor)?;
        self.cursor = range.end;

        let candidate = CandidateSkill::new(
            &self.text[range.clone()],
            sentence_at(&self.text, &self.sentences, range.start),
            range.start,
            &self.document,
            self.extractor_name,
        )
        .with_match(identifier);
        Some(candidate)
    }
}

/// Exact matching against a fixed set of competencies.
#[derive(Debug, Clone)]
pub struct ExactMatchSkillExtractor {
    matcher: Arc<NameMatcher>,
    text_fields: Vec<String>,
}

impl ExactMatchSkillExtractor {
    pub fn new<'c, I>(competencies: I, config: &ExtractionConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'c Competency>,
    {
        config.validate()?;
        let matcher = NameMatcher::new(competencies)?;
        tracing::debug!("Created exact match extractor with {} competency names", matcher.len());
        Ok(Self {
            matcher: Arc::new(matcher),
            text_fields: config.text_fields.clone(),
        })
    }

    pub fn from_ontology(ontology: &CompetencyOntology, config: &ExtractionConfig) -> Result<Self> {
        Self::new(ontology.competencies(), config)
    }
}

impl SkillExtractor for ExactMatchSkillExtractor {
    fn name(&self) -> &str {
        EXACT_MATCH_NAME
    }

    fn candidate_skills<'a>(&'a self, document: &Arc<Document>) -> Result<CandidateSkills<'a>> {
        let text = document.text(&self.text_fields)?;
        Ok(Box::new(NameMatches::new(
            Arc::clone(&self.matcher),
            document,
            text,
            EXACT_MATCH_NAME,
        )))
    }
}

/// Exact matching restricted to the competencies of the document's occupation.
///
/// The occupation tag is read from the configured occupation field and
/// resolved with [`CompetencyOntology::occupations_with_code`]. A missing or
/// unresolvable tag yields no candidates rather than an error. Matchers are
/// compiled once per resolved occupation set and shared by every clone.
#[derive(Debug, Clone)]
pub struct OccupationScopedExactMatchSkillExtractor {
    ontology: Arc<CompetencyOntology>,
    occupation_field: String,
    text_fields: Vec<String>,
    /// Resolved occupation identifiers -> matcher over their competencies
    matchers: Arc<DashMap<Vec<String>, Arc<NameMatcher>>>,
}

impl OccupationScopedExactMatchSkillExtractor {
    pub fn new(ontology: Arc<CompetencyOntology>, config: &ExtractionConfig) -> Result<Self> {
        config.validate()?;
        if config.occupation_field.trim().is_empty() {
            return Err(SkillError::Config("occupation_field must not be empty".to_string()));
        }
        Ok(Self {
            ontology,
            occupation_field: config.occupation_field.clone(),
            text_fields: config.text_fields.clone(),
            matchers: Arc::new(DashMap::new()),
        })
    }

    /// Competencies connected to the occupation(s) the tag resolves to.
    pub fn scoped_competencies(&self, tag: &str) -> Vec<&Competency> {
        self.competencies_of(&self.ontology.occupations_with_code(tag))
    }

    /// Number of distinct occupation sets a matcher has been compiled for.
    pub fn cached_matchers(&self) -> usize {
        self.matchers.len()
    }

    fn competencies_of(&self, occupations: &[&Occupation]) -> Vec<&Competency> {
        let mut seen = BTreeSet::new();
        occupations
            .iter()
            .flat_map(|occupation| self.ontology.competencies_for_occupation(&occupation.identifier))
            .filter(|competency| seen.insert(competency.identifier.as_str()))
            .collect()
    }

    /// Matcher for a tag, compiled on first use. `None` when the tag resolves
    /// to no occupation.
    fn matcher_for(&self, tag: &str) -> Result<Option<Arc<NameMatcher>>> {
        let occupations = self.ontology.occupations_with_code(tag);
        if occupations.is_empty() {
            return Ok(None);
        }

        let key: Vec<String> = occupations.iter().map(|o| o.identifier.clone()).collect();
        if let Some(matcher) = self.matchers.get(&key) {
            return Ok(Some(Arc::clone(matcher.value())));
        }

        let matcher = Arc::new(NameMatcher::new(self.competencies_of(&occupations))?);
        tracing::debug!(
            "Compiled scoped matcher for {:?} with {} competency names",
            key,
            matcher.len()
        );
        self.matchers.insert(key, Arc::clone(&matcher));
        Ok(Some(matcher))
    }
}

impl SkillExtractor for OccupationScopedExactMatchSkillExtractor {
    fn name(&self) -> &str {
        OCCUPATION_SCOPED_NAME
    }

    fn candidate_skills<'a>(&'a self, document: &Arc<Document>) -> Result<CandidateSkills<'a>> {
        let Some(tag) = document.field_str(&self.occupation_field) else {
            tracing::debug!("Document {} has no occupation tag", document.id);
            return Ok(Box::new(std::iter::empty()));
        };

        let matcher = match self.matcher_for(tag)? {
            Some(matcher) if !matcher.is_empty() => matcher,
            _ => {
                tracing::debug!("Occupation tag {:?} of document {} did not resolve", tag, document.id);
                return Ok(Box::new(std::iter::empty()));
            }
        };

        let text = document.text(&self.text_fields)?;
        Ok(Box::new(NameMatches::new(matcher, document, text, OCCUPATION_SCOPED_NAME)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competencies() -> Vec<Competency> {
        vec![
            Competency::new("c1", "Python"),
            Competency::new("c2", "Python Programming"),
            Competency::new("c3", "C++"),
            Competency::new("c4", "Programming"),
        ]
    }

    #[test]
    fn test_longest_match_wins() {
        let competencies = competencies();
        let matcher = NameMatcher::new(&competencies).unwrap();
        let text = "strong python programming and Python";

        let found: Vec<(&str, &str)> = matcher
            .find_iter(text)
            .map(|(range, id)| (&text[range], id))
            .collect();
        assert_eq!(found, vec![("python programming", "c2"), ("Python", "c1")]);
    }

    #[test]
    fn test_word_boundaries() {
        let competencies = competencies();
        let matcher = NameMatcher::new(&competencies).unwrap();

        assert!(matcher.find_at("Pythonic code", 0).is_none());
        let (range, id) = matcher.find_at("Knows C++, Java", 0).unwrap();
        assert_eq!((range, id), (6..9, "c3"));
    }

    #[test]
    fn test_whitespace_inside_names_is_flexible() {
        let competencies = competencies();
        let matcher = NameMatcher::new(&competencies).unwrap();
        let (range, id) = matcher.find_at("Python\n  Programming", 0).unwrap();
        assert_eq!(range, 0..20);
        assert_eq!(id, "c2");
    }

    #[test]
    fn test_shared_names_resolve_to_smallest_identifier() {
        let competencies = vec![
            Competency::new("2.C.4.a", "Mathematics").with_category("Knowledge"),
            Competency::new("2.A.1.e", "Mathematics").with_category("Skills"),
        ];
        let matcher = NameMatcher::new(&competencies).unwrap();
        assert_eq!(matcher.len(), 1);
        assert_eq!(matcher.find_at("mathematics", 0).unwrap().1, "2.A.1.e");
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = NameMatcher::new(std::iter::empty()).unwrap();
        assert!(matcher.is_empty());
        assert!(matcher.find_at("anything", 0).is_none());
    }

    #[test]
    fn test_scoped_matchers_are_compiled_once_per_occupation() {
        let mut builder = CompetencyOntology::builder();
        builder
            .add_competency(Competency::new("c1", "Welding"))
            .add_competency(Competency::new("c2", "Python"))
            .add_occupation(Occupation::new("o1", "Welders", "51-4121.06"))
            .add_occupation(Occupation::new("o2", "Software Developers", "15-1252.00"))
            .add_edge("o1", "c1", Default::default())
            .add_edge("o2", "c2", Default::default());
        let config = ExtractionConfig {
            text_fields: vec!["description".to_string()],
            ..ExtractionConfig::default()
        };
        let extractor = OccupationScopedExactMatchSkillExtractor::new(Arc::new(builder.build().unwrap()), &config).unwrap();

        let posting = |id: &str, tag: &str| {
            let mut document = Document::from_text(id, "description", "Welding and Python");
            document
                .fields
                .insert("onet_soc_code".to_string(), serde_json::Value::String(tag.to_string()));
            Arc::new(document)
        };

        let mut welding = Vec::new();
        for (id, tag) in [("a", "51-4121.06"), ("b", "51-4121.06"), ("c", "51-4121")] {
            let ids: Vec<String> = extractor
                .candidate_skills(&posting(id, tag))
                .unwrap()
                .filter_map(|c| c.matched_skill_identifier().map(str::to_string))
                .collect();
            welding.push(ids);
        }
        assert!(welding.iter().all(|ids| ids == &vec!["c1".to_string()]));
        assert_eq!(extractor.cached_matchers(), 1);

        let python: Vec<_> = extractor.candidate_skills(&posting("d", "15-1252.00")).unwrap().collect();
        assert_eq!(python[0].matched_skill_identifier(), Some("c2"));
        assert_eq!(extractor.cached_matchers(), 2);

        assert_eq!(extractor.candidate_skills(&posting("e", "99-0000.00")).unwrap().count(), 0);
        assert_eq!(extractor.cached_matchers(), 2);
    }

    #[test]
    fn test_exact_extractor_context_and_offsets() {
        let config = ExtractionConfig {
            text_fields: vec!["description".to_string()],
            ..ExtractionConfig::default()
        };
        let competencies = competencies();
        let extractor = ExactMatchSkillExtractor::new(&competencies, &config).unwrap();
        let text = "We need strong Python Programming and Python. Bonus: C++!";
        let document = Arc::new(Document::from_text("d1", "description", text));

        let candidates: Vec<_> = extractor.candidate_skills(&document).unwrap().collect();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].skill_name(), "Python Programming");
        assert_eq!(candidates[0].start_index(), 15);
        assert_eq!(candidates[0].context(), "We need strong Python Programming and Python");
        assert_eq!(candidates[2].context(), "Bonus: C++");
        assert!(candidates.iter().all(|c| c.confidence().is_none()));
        assert!(candidates.iter().all(|c| c.skill_extractor_name() == EXACT_MATCH_NAME));
    }
}
