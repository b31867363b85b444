//! Extraction configuration
//!
//! Defaults describe the common job-posting schema. A JSON file can replace
//! any subset of the fields, and `SKILLMATCH_*` environment variables are
//! applied on top of whichever base was chosen.

use crate::error::{Result, SkillError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BULLET_CHARS: &[char] = &[
    '-', '*', '+', '•', '●', '◦', '‣', '·', '–', '—', '>', '■', '□', '▪', '○',
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fields joined (in order, newline separated) into the text an extractor scans
    pub text_fields: Vec<String>,

    pub id_field: String,

    /// Field holding the job title, used for tabulation only
    pub title_field: String,

    /// Field holding the occupation classification code (e.g. O*NET-SOC)
    pub occupation_field: String,

    /// Only consider lines that start with a bullet marker
    pub only_bulleted_lines: bool,

    pub bullet_chars: Vec<char>,

    /// Largest edit distance the fuzzy matcher accepts
    pub max_edit_distance: usize,

    /// Smallest confidence (0.0-1.0) the fuzzy matcher emits
    pub min_confidence: f64,

    /// Longest token window the fuzzy matcher compares against competency names
    pub max_ngram_tokens: usize,

    /// Number of documents processed at once by the concurrent entry point
    pub concurrency: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            text_fields: vec![
                "description".to_string(),
                "experienceRequirements".to_string(),
                "qualifications".to_string(),
                "skills".to_string(),
            ],
            id_field: "id".to_string(),
            title_field: "title".to_string(),
            occupation_field: "onet_soc_code".to_string(),
            only_bulleted_lines: true,
            bullet_chars: DEFAULT_BULLET_CHARS.to_vec(),
            max_edit_distance: 4,
            min_confidence: 0.88,
            max_ngram_tokens: 5,
            concurrency: 4,
        }
    }
}

impl ExtractionConfig {
    /// Load a configuration file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SkillError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            SkillError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `SKILLMATCH_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(fields) = lookup("SKILLMATCH_TEXT_FIELDS") {
            self.text_fields = fields
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
        if let Some(field) = lookup("SKILLMATCH_OCCUPATION_FIELD") {
            self.occupation_field = field.trim().to_string();
        }
        if let Some(flag) = lookup("SKILLMATCH_ONLY_BULLETED_LINES") {
            self.only_bulleted_lines = parse_env("SKILLMATCH_ONLY_BULLETED_LINES", &flag)?;
        }
        if let Some(distance) = lookup("SKILLMATCH_MAX_EDIT_DISTANCE") {
            self.max_edit_distance = parse_env("SKILLMATCH_MAX_EDIT_DISTANCE", &distance)?;
        }
        if let Some(confidence) = lookup("SKILLMATCH_MIN_CONFIDENCE") {
            self.min_confidence = parse_env("SKILLMATCH_MIN_CONFIDENCE", &confidence)?;
        }
        if let Some(workers) = lookup("SKILLMATCH_CONCURRENCY") {
            self.concurrency = parse_env("SKILLMATCH_CONCURRENCY", &workers)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.text_fields.is_empty() {
            return Err(SkillError::Config("text_fields must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SkillError::Config(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.max_ngram_tokens == 0 {
            return Err(SkillError::Config("max_ngram_tokens must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(SkillError::Config("concurrency must be at least 1".to_string()));
        }
        if self.only_bulleted_lines && self.bullet_chars.is_empty() {
            return Err(SkillError::Config(
                "bullet_chars must not be empty when only_bulleted_lines is set".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SkillError::Config(format!("Invalid value for {}: {:?}", key, value)))
}
