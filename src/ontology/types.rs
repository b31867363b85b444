use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A named skill or ability concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Competency {
    pub identifier: String,
    pub name: String,
    /// Unordered category tags (e.g. "Abilities", "Knowledge", "O*NET T2")
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub description: String,
}

impl Competency {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            categories: BTreeSet::new(),
            description: String::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }
}

/// A job role identified by a hierarchical classification code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occupation {
    pub identifier: String,
    pub name: String,
    /// Classification code; a truncated prefix denotes a broader group
    pub code: String,
}

impl Occupation {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            code: code.into(),
        }
    }

    pub fn major_group(&self) -> &str {
        major_group(&self.code)
    }
}

/// Leading two-digit group of an O*NET-SOC style code ("29-1171.00" -> "29").
pub fn major_group(code: &str) -> &str {
    let end = code
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(code.len());
    &code[..end.min(2)]
}

/// Edge-level metadata such as importance or the source of the association.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeMetadata(pub BTreeMap<String, String>);

impl EdgeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn importance(&self) -> Option<f64> {
        self.get("importance").and_then(|v| v.trim().parse().ok())
    }

    pub fn source(&self) -> Option<&str> {
        self.get("source")
    }
}

/// Edge record stored in the ontology arena: indexes, not live references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EdgeRecord {
    pub occupation: usize,
    pub competency: usize,
    pub metadata: EdgeMetadata,
}

/// Borrowed view of one edge, handed to filter predicates.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRef<'a> {
    pub occupation: &'a Occupation,
    pub competency: &'a Competency,
    pub metadata: &'a EdgeMetadata,
}
