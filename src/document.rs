//! Document records consumed by the extractors.
//!
//! Records arrive already transformed into a common schema; this module only
//! exposes their fields by name and composes the text an extractor scans.

use crate::error::{Result, SkillError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    JobPosting,
    Profile,
    CourseDescription,
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentType::JobPosting => write!(f, "job_posting"),
            DocumentType::Profile => write!(f, "profile"),
            DocumentType::CourseDescription => write!(f, "course_description"),
            DocumentType::Other(other) => write!(f, "{}", other),
        }
    }
}

/// A single source record. Shared behind `Arc` so candidates can point back
/// at it without copying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub document_type: DocumentType,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, document_type: DocumentType, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            document_type,
            fields,
        }
    }

    /// Build a document from a raw JSON object, reading its id from `id_field`.
    pub fn from_json(value: Value, id_field: &str, document_type: DocumentType) -> Result<Self> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(SkillError::InvalidDocument(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let id = match fields.get(id_field) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(SkillError::InvalidDocument(format!(
                    "record has no usable '{}' field",
                    id_field
                )))
            }
        };

        Ok(Self::new(id, document_type, fields))
    }

    /// Convenience constructor for a document with a single text field.
    pub fn from_text(id: impl Into<String>, field: &str, text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(field.to_string(), Value::String(text.into()));
        Self::new(id, DocumentType::JobPosting, fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String value of a field, if present and non-empty.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Join the configured text fields, in order, with newlines.
    ///
    /// Absent or null fields are skipped. A present but empty string still
    /// counts as present, so an empty body scans to no candidates rather
    /// than an error. If none of the fields is present the document cannot
    /// be scanned and `MissingField` is returned.
    pub fn text(&self, fields: &[String]) -> Result<String> {
        let parts: Vec<String> = fields
            .iter()
            .filter_map(|name| self.fields.get(name).and_then(render_text))
            .collect();

        if parts.is_empty() {
            return Err(SkillError::MissingField {
                document_id: self.id.clone(),
                fields: fields.to_vec(),
            });
        }

        Ok(parts.join("\n"))
    }
}

fn render_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let lines: Vec<String> = items.iter().filter_map(render_text).collect();
            Some(lines.join("\n"))
        }
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Documents read from a JSON-lines corpus, plus the lines that were skipped.
#[derive(Debug, Default)]
pub struct DocumentBatch {
    pub documents: Vec<Arc<Document>>,
    /// (1-based line number, error) for every unusable line
    pub failures: Vec<(usize, SkillError)>,
}

/// Read a JSON-lines corpus into shared documents. Blank lines are skipped.
///
/// A line that is not valid JSON or has no usable id is logged and recorded
/// in `failures`; the remaining lines are still read. Only I/O errors fail
/// the whole call.
pub fn read_json_lines(
    path: impl AsRef<Path>,
    id_field: &str,
    document_type: DocumentType,
) -> Result<DocumentBatch> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut batch = DocumentBatch::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<Value>(&line)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                Document::from_json(value, id_field, document_type.clone()).map_err(|e| match e {
                    SkillError::InvalidDocument(detail) => detail,
                    other => other.to_string(),
                })
            });

        match parsed {
            Ok(document) => batch.documents.push(Arc::new(document)),
            Err(detail) => {
                tracing::warn!("Skipping {}:{}: {}", path.display(), line_no, detail);
                batch.failures.push((
                    line_no,
                    SkillError::InvalidDocument(format!("{}:{}: {}", path.display(), line_no, detail)),
                ));
            }
        }
    }

    tracing::debug!(
        "Loaded {} documents from {} ({} lines skipped)",
        batch.documents.len(),
        path.display(),
        batch.failures.len()
    );
    Ok(batch)
}
