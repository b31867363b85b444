use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document {document_id} is missing required field(s): {}", fields.join(", "))]
    MissingField {
        document_id: String,
        fields: Vec<String>,
    },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Ontology error: {0}")]
    Ontology(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(String),

    #[error("Worker error: {0}")]
    Task(String),
}

impl SkillError {
    /// True for errors caused by a single malformed document rather than by
    /// configuration or the environment.
    pub fn is_document_error(&self) -> bool {
        matches!(self, SkillError::MissingField { .. } | SkillError::InvalidDocument(_))
    }
}

impl From<polars::prelude::PolarsError> for SkillError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        SkillError::Polars(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkillError>;
