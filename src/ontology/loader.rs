//! Ontology sources: a single JSON document, or a directory of CSV tables
//! shaped like the O*NET release files.

use super::graph::CompetencyOntology;
use super::types::{Competency, EdgeMetadata, Occupation};
use crate::error::{Result, SkillError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct OntologyFile {
    #[serde(default)]
    competencies: Vec<Competency>,
    #[serde(default)]
    occupations: Vec<Occupation>,
    #[serde(default)]
    edges: Vec<EdgeEntry>,
}

#[derive(Debug, Deserialize)]
struct EdgeEntry {
    occupation: String,
    competency: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CompetencyRow {
    identifier: String,
    name: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct EdgeRow {
    occupation: String,
    competency: String,
    #[serde(default)]
    importance: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

/// Load an ontology from a JSON file with `competencies`, `occupations` and
/// `edges` arrays.
pub fn load_json(path: impl AsRef<Path>) -> Result<CompetencyOntology> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let file: OntologyFile = serde_json::from_str(&content)
        .map_err(|e| SkillError::Ontology(format!("Failed to parse {}: {}", path.display(), e)))?;

    let mut builder = CompetencyOntology::builder();
    for competency in file.competencies {
        builder.add_competency(competency);
    }
    for occupation in file.occupations {
        builder.add_occupation(occupation);
    }
    for edge in file.edges {
        builder.add_edge(edge.occupation, edge.competency, EdgeMetadata(edge.metadata));
    }

    let ontology = builder.build()?;
    tracing::info!("Loaded ontology from {}: {}", path.display(), ontology.summary());
    Ok(ontology)
}

/// Load an ontology from `competencies.csv`, `occupations.csv` and
/// `edges.csv` inside `dir`. Categories are `;`-separated.
pub fn load_csv_dir(dir: impl AsRef<Path>) -> Result<CompetencyOntology> {
    let dir = dir.as_ref();
    let mut builder = CompetencyOntology::builder();

    for row in read_rows::<CompetencyRow>(dir.join("competencies.csv"))? {
        let mut competency = Competency::new(row.identifier, row.name).with_description(row.description);
        for category in row.categories.split(';').map(str::trim).filter(|c| !c.is_empty()) {
            competency = competency.with_category(category);
        }
        builder.add_competency(competency);
    }

    for occupation in read_rows::<Occupation>(dir.join("occupations.csv"))? {
        builder.add_occupation(occupation);
    }

    for row in read_rows::<EdgeRow>(dir.join("edges.csv"))? {
        let mut metadata = EdgeMetadata::new();
        if let Some(importance) = row.importance.filter(|v| !v.trim().is_empty()) {
            metadata = metadata.with("importance", importance);
        }
        if let Some(source) = row.source.filter(|v| !v.trim().is_empty()) {
            metadata = metadata.with("source", source);
        }
        builder.add_edge(row.occupation, row.competency, metadata);
    }

    let ontology = builder.build()?;
    tracing::info!("Loaded ontology from {}: {}", dir.display(), ontology.summary());
    Ok(ontology)
}

/// Load from either a JSON file or a CSV directory.
pub fn load(path: impl AsRef<Path>) -> Result<CompetencyOntology> {
    let path = path.as_ref();
    if path.is_dir() {
        load_csv_dir(path)
    } else {
        load_json(path)
    }
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: PathBuf) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|e| SkillError::Ontology(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        let row: T = record.map_err(|e| {
            // Header is line 1
            SkillError::Ontology(format!("{} row {}: {}", path.display(), i + 2, e))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ontology.json");
        std::fs::write(
            &path,
            r#"{
                "competencies": [
                    {"identifier": "2.A.1.a", "name": "Reading Comprehension", "categories": ["Skills"]},
                    {"identifier": "2.C.4.a", "name": "Mathematics"}
                ],
                "occupations": [{"identifier": "15-2011.00", "name": "Actuaries", "code": "15-2011.00"}],
                "edges": [{"occupation": "15-2011.00", "competency": "2.C.4.a", "metadata": {"importance": "4.9"}}]
            }"#,
        )
        .unwrap();

        let ontology = load(&path).unwrap();
        assert_eq!(ontology.summary().competencies, 2);
        let edge = ontology.edges().next().unwrap();
        assert_eq!(edge.competency.name, "Mathematics");
        assert_eq!(edge.metadata.importance(), Some(4.9));
    }

    #[test]
    fn test_load_csv_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("competencies.csv"),
            "identifier,name,categories,description\n\
             1.A.1.a.1,Oral Comprehension,Abilities;O*NET T2,Listen and understand\n\
             2.B.1.a,Social Perceptiveness,Skills,\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("occupations.csv"),
            "identifier,name,code\n29-1171.00,Nurse Practitioners,29-1171.00\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("edges.csv"),
            "occupation,competency,importance,source\n29-1171.00,1.A.1.a.1,4.25,onet\n",
        )
        .unwrap();

        let ontology = load(dir.path()).unwrap();
        let oral = ontology.competency("1.A.1.a.1").unwrap();
        assert!(oral.in_category("O*NET T2"));
        assert_eq!(oral.description, "Listen and understand");
        assert_eq!(ontology.summary().edges, 1);
        assert_eq!(ontology.edges().next().unwrap().metadata.source(), Some("onet"));
    }

    #[test]
    fn test_malformed_edge_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ontology.json");
        std::fs::write(
            &path,
            r#"{"competencies": [], "occupations": [], "edges": [{"occupation": "x", "competency": "y"}]}"#,
        )
        .unwrap();

        assert!(matches!(load_json(&path), Err(SkillError::Ontology(_))));
    }
}
