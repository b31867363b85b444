//! Skill extraction from unstructured text against a competency ontology.
//!
//! Documents (job postings and similar records) are scanned by one of several
//! [`SkillExtractor`](extractors::SkillExtractor) strategies. Each yields
//! [`CandidateSkill`] records carrying the matched span, its context and,
//! for ontology-backed strategies, the matched competency identifier.

pub mod aggregate;
pub mod candidate;
pub mod config;
pub mod document;
pub mod error;
pub mod extractors;
pub mod ontology;

pub use aggregate::{candidates_frame, collection_skill_counts, extract_concurrently, write_csv, CollectionCounts, DocumentResult};
pub use candidate::{CandidateSkill, SkillCounts};
pub use config::ExtractionConfig;
pub use document::{read_json_lines, Document, DocumentBatch, DocumentType};
pub use error::{Result, SkillError};
pub use extractors::{
    ExactMatchSkillExtractor, FuzzyMatchSkillExtractor, NounPhraseEndingExtractor,
    OccupationScopedExactMatchSkillExtractor, SectionExtractSkillExtractor, SkillExtractor,
};
pub use ontology::{Competency, CompetencyOntology, EdgeMetadata, EdgeRef, Occupation};
