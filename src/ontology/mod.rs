//! # Competency Ontology
//!
//! Reference vocabulary of competencies and the occupations that use them.
//!
//! - **Nodes**: `Competency` (identifier, name, category tags, description) and
//!   `Occupation` (identifier, name, hierarchical classification code)
//! - **Edges**: plain (occupation, competency, metadata) records
//! - **Filtering**: `filter_by` derives a new ontology from an edge predicate
//! - **Loading**: JSON documents or O*NET-style CSV directories
//!
//! ```rust,no_run
//! use skillmatch::ontology::{self, CompetencyOntology};
//!
//! let onet: CompetencyOntology = ontology::load("data/onet.json").unwrap();
//! onet.print_summary_stats();
//!
//! let nurse_practitioners = onet.filter_by(|edge| edge.occupation.name.contains("Nurse Practitioners"));
//! let knowledge: Vec<_> = nurse_practitioners
//!     .competencies()
//!     .filter(|c| c.in_category("Knowledge"))
//!     .collect();
//! ```

pub mod types;
pub mod graph;
pub mod loader;

pub use graph::{CompetencyOntology, OntologyBuilder, OntologySummary};
pub use loader::{load, load_csv_dir, load_json};
pub use types::{major_group, Competency, EdgeMetadata, EdgeRef, Occupation};
